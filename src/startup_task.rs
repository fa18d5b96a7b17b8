//! Startup orchestration: provision the key, initialize the encrypted
//! store, build the main window concurrently, race initialization against
//! the loading-window delay, then either reveal the app or enter the
//! fatal-error flow.

use tauri::{AppHandle, Manager};
use tokio::sync::watch;

use crate::{
    app_types::{AppLifecycleState, AppState},
    db_error_flow, deep_link, encryption_key, main_window, runtime_paths, startup_cleanup,
    startup_loading::{self, LoadingDecision},
    store_gateway::StoreHandle,
    tray_setup, window_actions,
    window_registry::{self, WindowKind},
    LOADING_WINDOW_DELAY,
};

pub(crate) fn spawn_startup_task(app_handle: AppHandle) {
    tauri::async_runtime::spawn(async move {
        run_startup(app_handle).await;
    });
}

async fn run_startup(app_handle: AppHandle) {
    let state = app_handle.state::<AppState>();
    state.advance_lifecycle(AppLifecycleState::Initializing);

    let profile_dir = state.profile_dir().to_path_buf();
    let key = match encryption_key::get_or_create_key(&runtime_paths::config_path(&profile_dir)) {
        Ok(key) => key,
        Err(error) => {
            db_error_flow::handle_fatal_store_error(
                app_handle,
                crate::store_gateway::StoreError::Sql(format!(
                    "cannot provision encryption key: {error}"
                )),
            )
            .await;
            return;
        }
    };

    // Store init and main-window construction run concurrently; neither
    // blocks the other. The window stays hidden until init settles.
    let (settled_tx, settled_rx) = watch::channel(false);
    let init_task = {
        let db_path = runtime_paths::db_path(&profile_dir);
        tauri::async_runtime::spawn(async move {
            let result = StoreHandle::initialize(db_path, key).await;
            let _ = settled_tx.send(true);
            result
        })
    };

    if let Err(error) = main_window::create_main_window(&app_handle) {
        log::error!("failed to build main window: {error}");
    }

    spawn_loading_window_task(app_handle.clone(), settled_rx);

    let init_result = match init_task.await {
        Ok(result) => result,
        Err(join_error) => {
            log::error!("store init task failed: {join_error}");
            db_error_flow::handle_fatal_store_error(
                app_handle,
                crate::store_gateway::StoreError::WorkerGone,
            )
            .await;
            return;
        }
    };

    let store = match init_result {
        Ok(store) => store,
        Err(error) => {
            db_error_flow::handle_fatal_store_error(app_handle, error).await;
            return;
        }
    };

    // If corruption was reported in the same phase init succeeded,
    // corruption wins.
    if let Some(corruption) = store.corruption_now() {
        store.close().await;
        db_error_flow::handle_fatal_store_error(app_handle, corruption).await;
        return;
    }

    startup_cleanup::run_post_init_maintenance(&store, &profile_dir).await;

    install_corruption_watcher(&app_handle, &store);
    if let Ok(mut guard) = state.store.lock() {
        *guard = Some(store);
    }

    if !state.advance_lifecycle(AppLifecycleState::Ready) {
        // A shutdown raced us; leave the window hidden.
        log::warn!("startup finished after lifecycle already moved past Ready");
        return;
    }
    log::info!("store initialized, revealing main window");

    window_actions::show_main_window(&app_handle);
    if let Err(error) = tray_setup::setup_tray(&app_handle) {
        log::warn!("failed to initialize tray: {error}");
    }

    flush_pending_deep_links(&app_handle);
}

/// Shows a loading window only if init outlives the grace delay, and
/// destroys it exactly when init settles, never before.
fn spawn_loading_window_task(app_handle: AppHandle, mut settled_rx: watch::Receiver<bool>) {
    tauri::async_runtime::spawn(async move {
        match startup_loading::loading_race(&mut settled_rx, LOADING_WINDOW_DELAY).await {
            LoadingDecision::InitSettledFirst => {}
            LoadingDecision::ShowLoading => {
                if let Err(error) = window_registry::show_or_create(&app_handle, WindowKind::Loading)
                {
                    log::warn!("failed to show loading window: {error}");
                }
                startup_loading::await_init_settled(&mut settled_rx).await;
                window_registry::destroy_window(&app_handle, WindowKind::Loading);
            }
        }
    });
}

/// The corruption watcher resolves at most once, and only ever for real
/// corruption. It feeds the same terminal handler as an init failure.
fn install_corruption_watcher(app_handle: &AppHandle, store: &StoreHandle) {
    let app_handle = app_handle.clone();
    let store = store.clone();
    tauri::async_runtime::spawn(async move {
        let error = store.when_corrupted().await;
        db_error_flow::handle_fatal_store_error(app_handle, error).await;
    });
}

/// Deep links that arrived via argv or a second instance before the app
/// was Ready are routed now, in arrival order.
pub(crate) fn flush_pending_deep_links(app_handle: &AppHandle) {
    let state = app_handle.state::<AppState>();
    let pending = match state.pending_deep_links.lock() {
        Ok(mut queue) => std::mem::take(&mut *queue),
        Err(_) => Vec::new(),
    };
    for raw in pending {
        deep_link::route(app_handle, &raw);
    }
}

/// Queues a link until Ready, or routes it immediately once the app is up.
pub(crate) fn route_or_queue_deep_link(app_handle: &AppHandle, raw: String) {
    let state = app_handle.state::<AppState>();
    for link in queue_or_reclaim(&state, raw) {
        deep_link::route(app_handle, &link);
    }
}

/// Returns the links that should be routed right now; an empty result
/// means the link was queued for the startup flush. Readiness is
/// re-checked after the push: Ready can flip between the check and the
/// push (second-instance callbacks run off the startup task), and a link
/// queued after the only flush would otherwise be stranded.
fn queue_or_reclaim(state: &AppState, raw: String) -> Vec<String> {
    let drain_queue = |state: &AppState, raw: String| {
        let mut links = match state.pending_deep_links.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        };
        links.push(raw);
        links
    };

    if state.is_ready() {
        return drain_queue(state, raw);
    }
    match state.pending_deep_links.lock() {
        Ok(mut queue) => queue.push(raw),
        Err(_) => return Vec::new(),
    }
    if state.is_ready() {
        match state.pending_deep_links.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::queue_or_reclaim;
    use crate::app_types::{AppLifecycleState, AppState};

    fn state() -> AppState {
        AppState::new(PathBuf::from("/tmp/courier-test-profile"))
    }

    #[test]
    fn links_queue_until_ready() {
        let state = state();
        assert!(queue_or_reclaim(&state, "courier://join/#a".to_string()).is_empty());
        assert_eq!(
            state.pending_deep_links.lock().unwrap().as_slice(),
            ["courier://join/#a".to_string()]
        );
    }

    #[test]
    fn ready_routes_immediately_in_arrival_order() {
        let state = state();
        assert!(queue_or_reclaim(&state, "courier://join/#a".to_string()).is_empty());

        state.advance_lifecycle(AppLifecycleState::Initializing);
        state.advance_lifecycle(AppLifecycleState::Ready);

        // A link arriving once Ready also reclaims anything still queued,
        // so nothing can sit behind a flush that already ran.
        assert_eq!(
            queue_or_reclaim(&state, "courier://join/#b".to_string()),
            vec!["courier://join/#a".to_string(), "courier://join/#b".to_string()]
        );
        assert!(state.pending_deep_links.lock().unwrap().is_empty());
    }
}
