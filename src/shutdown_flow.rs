//! Two-phase shutdown: drain the renderer (bounded), then close the store
//! and leave the process. Every quit trigger funnels through here; the
//! exit state machine makes sure only one drain is ever in flight.

use std::time::Duration;

use tauri::{AppHandle, Manager};
use tokio::sync::oneshot;

use crate::{
    app_types::{AppLifecycleState, AppState},
    bridge_events, exit_state::ExitPhase, MAIN_WINDOW_LABEL, SHUTDOWN_DRAIN_TIMEOUT,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DrainOutcome {
    /// Renderer acknowledged, possibly reporting an error that is logged
    /// but never blocks shutdown.
    Acked(Option<String>),
    /// The renderer side went away without acknowledging; nothing left to
    /// wait for.
    ChannelClosed,
    /// The deadline elapsed; shutdown proceeds anyway so the OS never has
    /// to force-kill us.
    TimedOut,
}

pub(crate) async fn await_renderer_drain(
    ack: oneshot::Receiver<Option<String>>,
    deadline: Duration,
) -> DrainOutcome {
    match tokio::time::timeout(deadline, ack).await {
        Ok(Ok(error)) => DrainOutcome::Acked(error),
        Ok(Err(_)) => DrainOutcome::ChannelClosed,
        Err(_) => DrainOutcome::TimedOut,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AfterShutdown {
    Exit,
    Restart,
}

/// Runs the whole shutdown protocol. Safe to call from any trigger; extra
/// invocations while one is running return immediately.
pub(crate) async fn run_shutdown(app_handle: AppHandle, after: AfterShutdown) {
    let state = app_handle.state::<AppState>();

    let owns_drain = state
        .exit_state
        .lock()
        .map(|mut machine| machine.begin_drain())
        .unwrap_or(false);
    if !owns_drain {
        return;
    }
    state.mark_quitting();
    state.advance_lifecycle(AppLifecycleState::ShuttingDown);

    // Phase 1: drain the renderer, if there is one to drain.
    let has_main_window = app_handle.get_webview_window(MAIN_WINDOW_LABEL).is_some();
    if has_main_window && state.is_renderer_ready() && !state.is_renderer_drained() {
        let (ack_tx, ack_rx) = oneshot::channel();
        if let Ok(mut pending) = state.shutdown_ack.lock() {
            *pending = Some(ack_tx);
        }
        bridge_events::emit_prepare_for_shutdown(&app_handle);

        match await_renderer_drain(ack_rx, SHUTDOWN_DRAIN_TIMEOUT).await {
            DrainOutcome::Acked(None) => log::info!("renderer finished pending work"),
            DrainOutcome::Acked(Some(error)) => {
                log::warn!("renderer reported an error while draining: {error}");
            }
            DrainOutcome::ChannelClosed => {
                log::info!("renderer went away before acknowledging shutdown");
            }
            DrainOutcome::TimedOut => {
                log::warn!(
                    "renderer did not acknowledge shutdown within {}s; proceeding",
                    SHUTDOWN_DRAIN_TIMEOUT.as_secs()
                );
            }
        }
        // A late ack after the timeout must not find a live sender.
        if let Ok(mut pending) = state.shutdown_ack.lock() {
            pending.take();
        }
    } else {
        log::info!("skipping renderer drain: no renderer to wait for");
    }
    if let Ok(mut machine) = state.exit_state.lock() {
        machine.complete_drain();
    }

    // Phase 2: close the store exactly once, then leave.
    if let Some(store) = state.take_store() {
        store.close().await;
        log::info!("store closed");
    }
    if let Ok(mut machine) = state.exit_state.lock() {
        machine.mark_store_closed();
    }
    state.advance_lifecycle(AppLifecycleState::Terminated);

    if let Ok(mut machine) = state.exit_state.lock() {
        machine.mark_exited();
    }
    match after {
        AfterShutdown::Exit => app_handle.exit(0),
        AfterShutdown::Restart => {
            log::info!("relaunching after shutdown");
            app_handle.restart();
        }
    }
}

/// True once phase 2 has finished; `RunEvent::ExitRequested` uses this to
/// decide whether to let the process die or to start the handshake first.
pub(crate) fn shutdown_finished(state: &AppState) -> bool {
    state
        .exit_state
        .lock()
        .map(|machine| machine.phase() >= ExitPhase::StoreClosed)
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Instant};

    #[tokio::test(start_paused = true)]
    async fn ack_before_the_deadline_finishes_immediately() {
        let (tx, rx) = oneshot::channel();

        let drain = tokio::spawn(await_renderer_drain(rx, SHUTDOWN_DRAIN_TIMEOUT));
        advance(Duration::from_secs(2)).await;
        tx.send(None).expect("receiver alive");

        assert_eq!(drain.await.unwrap(), DrainOutcome::Acked(None));
    }

    #[tokio::test(start_paused = true)]
    async fn ack_with_error_still_completes_the_drain() {
        let (tx, rx) = oneshot::channel();
        tx.send(Some("flush failed".to_string())).expect("receiver alive");

        assert_eq!(
            await_renderer_drain(rx, SHUTDOWN_DRAIN_TIMEOUT).await,
            DrainOutcome::Acked(Some("flush failed".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ack_times_out_exactly_at_the_bound() {
        let (_tx, rx) = oneshot::channel::<Option<String>>();

        let started = Instant::now();
        let outcome = await_renderer_drain(rx, SHUTDOWN_DRAIN_TIMEOUT).await;

        assert_eq!(outcome, DrainOutcome::TimedOut);
        assert_eq!(started.elapsed(), SHUTDOWN_DRAIN_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_renderer_does_not_stall_shutdown() {
        let (tx, rx) = oneshot::channel::<Option<String>>();
        drop(tx);

        let started = Instant::now();
        let outcome = await_renderer_drain(rx, SHUTDOWN_DRAIN_TIMEOUT).await;

        assert_eq!(outcome, DrainOutcome::ChannelClosed);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
