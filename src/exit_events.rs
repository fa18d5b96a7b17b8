use tauri::{AppHandle, Manager, RunEvent};

use crate::{
    app_types::AppState,
    shutdown_flow::{self, AfterShutdown},
};

/// `ExitRequested` fires for every quit intent (last window closed, OS
/// quit, `exit()` calls). Until the store has been closed the exit is
/// held back and the shutdown protocol runs instead.
pub(crate) fn handle_exit_requested(app_handle: &AppHandle, api: &tauri::ExitRequestApi) {
    let state = app_handle.state::<AppState>();
    if shutdown_flow::shutdown_finished(&state) {
        return;
    }

    api.prevent_exit();
    let app_handle = app_handle.clone();
    tauri::async_runtime::spawn(async move {
        shutdown_flow::run_shutdown(app_handle, AfterShutdown::Exit).await;
    });
}

pub(crate) fn handle_exit_event(_app_handle: &AppHandle) {
    log::info!("desktop process exiting");
}

/// Routes any `RunEvent` this shell cares about; everything else is the
/// host runtime's business.
pub(crate) fn handle_run_event(app_handle: &AppHandle, event: &RunEvent) {
    match event {
        RunEvent::ExitRequested { api, .. } => handle_exit_requested(app_handle, api),
        RunEvent::Exit => handle_exit_event(app_handle),
        _ => {}
    }
}
