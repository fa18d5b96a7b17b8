use tauri::{
    menu::{Menu, MenuItem, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager,
};

use crate::{tray_actions, tray_menu_handler, window_actions, MAIN_WINDOW_LABEL};

const TRAY_ID: &str = "courier-tray";

const TRAY_HIDE_LABEL: &str = "Hide Courier";
const TRAY_SHOW_LABEL: &str = "Show Courier";
const TRAY_QUIT_LABEL: &str = "Quit";

#[derive(Clone)]
pub(crate) struct TrayMenuState {
    pub(crate) toggle_item: MenuItem<tauri::Wry>,
}

pub(crate) fn setup_tray(app_handle: &AppHandle) -> Result<(), String> {
    let main_window_visible = app_handle
        .get_webview_window(MAIN_WINDOW_LABEL)
        .and_then(|window| window.is_visible().ok())
        .unwrap_or(true);
    let toggle_label = if main_window_visible {
        TRAY_HIDE_LABEL
    } else {
        TRAY_SHOW_LABEL
    };

    let toggle_item = MenuItem::with_id(
        app_handle,
        tray_actions::TRAY_MENU_TOGGLE_WINDOW,
        toggle_label,
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create tray toggle menu item: {error}"))?;
    let quit_item = MenuItem::with_id(
        app_handle,
        tray_actions::TRAY_MENU_QUIT,
        TRAY_QUIT_LABEL,
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create tray quit menu item: {error}"))?;
    let separator = PredefinedMenuItem::separator(app_handle)
        .map_err(|error| format!("Failed to create tray separator menu item: {error}"))?;

    let menu = Menu::with_items(app_handle, &[&toggle_item, &separator, &quit_item])
        .map_err(|error| format!("Failed to build tray menu: {error}"))?;

    if !app_handle.manage(TrayMenuState {
        toggle_item: toggle_item.clone(),
    }) {
        log::warn!("tray menu state already exists, skipping manage");
    }

    let tray_builder = TrayIconBuilder::with_id(TRAY_ID)
        .menu(&menu)
        .tooltip("Courier")
        .show_menu_on_left_click(false)
        .on_menu_event(|app_handle, event| {
            tray_menu_handler::handle_tray_menu_event(app_handle, event.id().as_ref())
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                window_actions::toggle_main_window(tray.app_handle());
            }
        });

    let tray_builder = match app_handle.default_window_icon() {
        Some(icon) => tray_builder.icon(icon.clone()),
        None => tray_builder,
    };

    #[cfg(target_os = "macos")]
    let tray_builder = tray_builder.icon_as_template(true);

    tray_builder
        .build(app_handle)
        .map_err(|error| format!("Failed to create tray icon: {error}"))?;

    Ok(())
}

pub(crate) fn update_toggle_label(app_handle: &AppHandle, visible_override: Option<bool>) {
    let Some(tray_state) = app_handle.try_state::<TrayMenuState>() else {
        return;
    };

    let effective_visible = visible_override.unwrap_or_else(|| {
        app_handle
            .get_webview_window(MAIN_WINDOW_LABEL)
            .and_then(|window| window.is_visible().ok())
            .unwrap_or(true)
    });
    let toggle_label = if effective_visible {
        TRAY_HIDE_LABEL
    } else {
        TRAY_SHOW_LABEL
    };

    if let Err(error) = tray_state.toggle_item.set_text(toggle_label) {
        log::warn!("failed to update tray toggle label: {error}");
    }
}
