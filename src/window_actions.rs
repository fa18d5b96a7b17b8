use tauri::{AppHandle, Manager};

use crate::{main_window, tray_setup, MAIN_WINDOW_LABEL};

pub(crate) fn show_main_window(app_handle: &AppHandle) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        log::warn!("show_main_window skipped: main window not found");
        return;
    };
    if let Err(error) = window.show().and_then(|()| window.set_focus()) {
        log::warn!("failed to show main window: {error}");
    }
    tray_setup::update_toggle_label(app_handle, Some(true));
}

pub(crate) fn hide_main_window(app_handle: &AppHandle) {
    main_window::hide_main_window_smoothly(app_handle);
    tray_setup::update_toggle_label(app_handle, Some(false));
}

pub(crate) fn toggle_main_window(app_handle: &AppHandle) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        log::warn!("toggle_main_window skipped: main window not found");
        return;
    };

    match window.is_visible() {
        Ok(true) => hide_main_window(app_handle),
        Ok(false) => show_main_window(app_handle),
        Err(error) => log::warn!("failed to read main window visibility: {error}"),
    }
}
