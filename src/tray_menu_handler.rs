use tauri::{AppHandle, Manager};

use crate::{
    app_types::AppState,
    shutdown_flow::{self, AfterShutdown},
    tray_actions, window_actions,
};

pub(crate) fn handle_tray_menu_event(app_handle: &AppHandle, menu_id: &str) {
    match tray_actions::action_from_menu_id(menu_id) {
        Some(tray_actions::TrayMenuAction::ToggleWindow) => {
            window_actions::toggle_main_window(app_handle)
        }
        Some(tray_actions::TrayMenuAction::Quit) => {
            let state = app_handle.state::<AppState>();
            state.mark_quitting();
            log::info!("tray quit requested, starting shutdown");
            let app_handle = app_handle.clone();
            tauri::async_runtime::spawn(async move {
                shutdown_flow::run_shutdown(app_handle, AfterShutdown::Exit).await;
            });
        }
        None => {
            log::warn!("ignoring unknown tray menu id '{menu_id}'");
        }
    }
}
