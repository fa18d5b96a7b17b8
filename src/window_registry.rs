//! One guarded factory per window kind. Every kind is a singleton: showing
//! a kind that already exists surfaces the live instance instead of
//! constructing a second one. That is a correctness invariant (duplicate
//! IPC events must not yield duplicate windows), not an optimization.

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};

use crate::{main_window, window_actions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowKind {
    Main,
    Settings,
    About,
    DebugLog,
    Permissions,
    ScreenShareController,
    StickerCreator,
    Loading,
}

impl WindowKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            WindowKind::Main => crate::MAIN_WINDOW_LABEL,
            WindowKind::Settings => "settings",
            WindowKind::About => "about",
            WindowKind::DebugLog => "debug-log",
            WindowKind::Permissions => "permissions",
            WindowKind::ScreenShareController => "screen-share-controller",
            WindowKind::StickerCreator => "sticker-creator",
            WindowKind::Loading => crate::LOADING_WINDOW_LABEL,
        }
    }

    fn title(self) -> &'static str {
        match self {
            WindowKind::Main => crate::MAIN_WINDOW_TITLE,
            WindowKind::Settings => "Courier Settings",
            WindowKind::About => "About Courier",
            WindowKind::DebugLog => "Debug Log",
            WindowKind::Permissions => "Permissions",
            WindowKind::ScreenShareController => "Screen Sharing",
            WindowKind::StickerCreator => "Sticker Creator",
            WindowKind::Loading => "Courier",
        }
    }

    fn size(self) -> (f64, f64) {
        match self {
            WindowKind::Main => (
                crate::DEFAULT_WINDOW_WIDTH as f64,
                crate::DEFAULT_WINDOW_HEIGHT as f64,
            ),
            WindowKind::Settings => (700.0, 700.0),
            WindowKind::About => (500.0, 400.0),
            WindowKind::DebugLog => (700.0, 500.0),
            WindowKind::Permissions => (400.0, 150.0),
            WindowKind::ScreenShareController => (480.0, 80.0),
            WindowKind::StickerCreator => (800.0, 650.0),
            WindowKind::Loading => (300.0, 280.0),
        }
    }

    fn resizable(self) -> bool {
        !matches!(
            self,
            WindowKind::Permissions | WindowKind::ScreenShareController | WindowKind::Loading
        )
    }

    /// Kinds the renderer may ask for by name. The loading window is owned
    /// by the startup orchestrator and cannot be requested.
    pub(crate) fn from_request(raw: &str) -> Option<Self> {
        match raw {
            "settings" => Some(WindowKind::Settings),
            "about" => Some(WindowKind::About),
            "debug-log" => Some(WindowKind::DebugLog),
            "permissions" => Some(WindowKind::Permissions),
            "screen-share-controller" => Some(WindowKind::ScreenShareController),
            "sticker-creator" => Some(WindowKind::StickerCreator),
            _ => None,
        }
    }
}

/// Surfaces the singleton instance of `kind`, creating it on first use.
pub(crate) fn show_or_create(app_handle: &AppHandle, kind: WindowKind) -> Result<(), String> {
    if let Some(existing) = app_handle.get_webview_window(kind.label()) {
        existing
            .show()
            .and_then(|()| existing.set_focus())
            .map_err(|error| format!("Failed to surface {} window: {error}", kind.label()))?;
        return Ok(());
    }

    match kind {
        WindowKind::Main => {
            main_window::create_main_window(app_handle)?;
            window_actions::show_main_window(app_handle);
            Ok(())
        }
        aux => create_aux_window(app_handle, aux),
    }
}

fn create_aux_window(app_handle: &AppHandle, kind: WindowKind) -> Result<(), String> {
    let (width, height) = kind.size();
    WebviewWindowBuilder::new(app_handle, kind.label(), WebviewUrl::App("index.html".into()))
        .title(kind.title())
        .inner_size(width, height)
        .resizable(kind.resizable())
        .center()
        .build()
        .map_err(|error| format!("Failed to create {} window: {error}", kind.label()))?;
    Ok(())
}

pub(crate) fn destroy_window(app_handle: &AppHandle, kind: WindowKind) {
    if let Some(window) = app_handle.get_webview_window(kind.label()) {
        if let Err(error) = window.destroy() {
            log::warn!("failed to destroy {} window: {error}", kind.label());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [WindowKind; 8] = [
        WindowKind::Main,
        WindowKind::Settings,
        WindowKind::About,
        WindowKind::DebugLog,
        WindowKind::Permissions,
        WindowKind::ScreenShareController,
        WindowKind::StickerCreator,
        WindowKind::Loading,
    ];

    #[test]
    fn labels_are_unique_per_kind() {
        for (i, a) in ALL_KINDS.iter().enumerate() {
            for b in &ALL_KINDS[i + 1..] {
                assert_ne!(a.label(), b.label());
            }
        }
    }

    #[test]
    fn renderer_requests_cover_exactly_the_requestable_kinds() {
        for kind in ALL_KINDS {
            let requested = WindowKind::from_request(kind.label());
            match kind {
                WindowKind::Main | WindowKind::Loading => assert_eq!(requested, None),
                other => assert_eq!(requested, Some(other)),
            }
        }
        assert_eq!(WindowKind::from_request("popup-factory"), None);
    }
}
