//! The loading-window race: store initialization vs. a fixed delay. The
//! timer only decides whether a loading window appears; it never cancels
//! or signals the initialization itself.

use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadingDecision {
    /// Init settled inside the grace period; never construct the window.
    InitSettledFirst,
    /// The delay elapsed first; show a loading window until init settles.
    ShowLoading,
}

pub(crate) async fn loading_race(
    init_settled: &mut watch::Receiver<bool>,
    delay: Duration,
) -> LoadingDecision {
    tokio::select! {
        // If both are ready on the same poll, prefer the settled init:
        // there is nothing left to wait for, so no window.
        biased;
        result = init_settled.wait_for(|settled| *settled) => {
            // A dropped sender means init settled by failing before it
            // could report; either way there is no init left to cover.
            let _ = result;
            LoadingDecision::InitSettledFirst
        }
        _ = tokio::time::sleep(delay) => LoadingDecision::ShowLoading,
    }
}

/// Waits until initialization settles, however it settles. Used by the
/// loading-window task so the window is destroyed exactly when init
/// completes, never before.
pub(crate) async fn await_init_settled(init_settled: &mut watch::Receiver<bool>) {
    let _ = init_settled.wait_for(|settled| *settled).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LOADING_WINDOW_DELAY;
    use tokio::time::{advance, Instant};

    #[tokio::test(start_paused = true)]
    async fn fast_init_never_shows_loading() {
        let (tx, mut rx) = watch::channel(false);

        let race = tokio::spawn(async move { loading_race(&mut rx, LOADING_WINDOW_DELAY).await });
        advance(Duration::from_millis(1000)).await;
        tx.send(true).expect("receiver alive");

        assert_eq!(race.await.unwrap(), LoadingDecision::InitSettledFirst);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_init_shows_loading_at_the_deadline() {
        let (_tx, mut rx) = watch::channel(false);

        let started = Instant::now();
        let decision = loading_race(&mut rx, LOADING_WINDOW_DELAY).await;

        assert_eq!(decision, LoadingDecision::ShowLoading);
        assert_eq!(started.elapsed(), LOADING_WINDOW_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_window_waits_for_init_to_settle() {
        let (tx, mut rx) = watch::channel(false);

        let waiter = tokio::spawn(async move {
            let started = Instant::now();
            await_init_settled(&mut rx).await;
            started.elapsed()
        });

        advance(Duration::from_secs(9)).await;
        tx.send(true).expect("receiver alive");

        assert_eq!(waiter.await.unwrap(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_init_reporter_counts_as_settled() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        assert_eq!(
            loading_race(&mut rx, LOADING_WINDOW_DELAY).await,
            LoadingDecision::InitSettledFirst
        );
    }
}
