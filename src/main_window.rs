//! Main-window construction and bookkeeping: geometry restore with the
//! visibility guard, debounced geometry persistence, immediate
//! window-stats notifications, and navigation interception.

use std::sync::atomic::Ordering;

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

use crate::{
    app_types::{AppState, WindowStats},
    bridge_events, deep_link, runtime_paths, user_config,
    window_config::{self, DisplayBounds, Placement, WindowConfig},
    GEOMETRY_PERSIST_DEBOUNCE, MAIN_WINDOW_LABEL, MAIN_WINDOW_TITLE, MIN_WINDOW_HEIGHT,
    MIN_WINDOW_WIDTH,
};

fn connected_displays(app_handle: &AppHandle) -> Vec<DisplayBounds> {
    let monitors = match app_handle.available_monitors() {
        Ok(monitors) => monitors,
        Err(error) => {
            log::warn!("failed to enumerate displays: {error}");
            return Vec::new();
        }
    };
    monitors
        .iter()
        .map(|monitor| {
            let scale = monitor.scale_factor();
            let position = monitor.position().to_logical::<i32>(scale);
            let size = monitor.size().to_logical::<u32>(scale);
            DisplayBounds {
                x: position.x,
                y: position.y,
                width: size.width,
                height: size.height,
            }
        })
        .collect()
}

/// Builds the main window hidden. It stays hidden until the store has
/// initialized; the startup orchestrator reveals it.
pub(crate) fn create_main_window(app_handle: &AppHandle) -> Result<WebviewWindow, String> {
    let state = app_handle.state::<AppState>();
    let config_path = runtime_paths::config_path(state.profile_dir());
    let stored = user_config::get_window_config(&config_path).unwrap_or_default();
    let (width, height) = window_config::clamp_size(stored.width, stored.height);

    let url_router = app_handle.clone();
    let mut builder = WebviewWindowBuilder::new(
        app_handle,
        MAIN_WINDOW_LABEL,
        WebviewUrl::App("index.html".into()),
    )
    .title(MAIN_WINDOW_TITLE)
    .visible(false)
    .inner_size(width as f64, height as f64)
    .min_inner_size(MIN_WINDOW_WIDTH as f64, MIN_WINDOW_HEIGHT as f64)
    .on_navigation(move |url| handle_navigation(&url_router, url));

    // A position stranded outside every connected display is discarded so
    // the window cannot become permanently unreachable.
    match window_config::resolve_placement(&stored, &connected_displays(app_handle)) {
        Placement::Restored { x, y } => {
            builder = builder.position(x as f64, y as f64);
        }
        Placement::Centered => {
            builder = builder.center();
        }
    }

    let window = builder
        .build()
        .map_err(|error| format!("Failed to create main window: {error}"))?;

    if stored.maximized {
        let _ = window.maximize();
    }
    if stored.fullscreen {
        let _ = window.set_fullscreen(true);
    }

    Ok(window)
}

/// External links open in the OS browser; Courier links go through the
/// deep-link router; only the bundled app pages may load in the webview.
fn handle_navigation(app_handle: &AppHandle, url: &url::Url) -> bool {
    match url.scheme() {
        "tauri" => true,
        scheme if scheme == crate::DEEP_LINK_SCHEME || scheme == crate::CAPTCHA_SCHEME => {
            deep_link::route(app_handle, url.as_str());
            false
        }
        "http" | "https" => {
            let host = url.host_str().unwrap_or_default();
            if host == "tauri.localhost" || host == "localhost" || host == "127.0.0.1" {
                return true;
            }
            open_external(app_handle, url.as_str());
            false
        }
        other => {
            log::info!("blocked navigation to unsupported scheme '{other}'");
            false
        }
    }
}

pub(crate) fn open_external(app_handle: &AppHandle, url: &str) {
    use tauri_plugin_opener::OpenerExt;
    if let Err(error) = app_handle.opener().open_url(url, None::<&str>) {
        log::warn!("failed to open external url: {error}");
    }
}

/// Captures current geometry and persists it. Called through the debounce
/// below, or directly when the window is about to go away.
pub(crate) fn persist_current_geometry(app_handle: &AppHandle) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        return;
    };
    let Ok(scale) = window.scale_factor() else {
        return;
    };

    let maximized = window.is_maximized().unwrap_or(false);
    let fullscreen = window.is_fullscreen().unwrap_or(false);

    let state = app_handle.state::<AppState>();
    let config_path = runtime_paths::config_path(state.profile_dir());
    let previous = user_config::get_window_config(&config_path).unwrap_or_default();

    // While maximized or fullscreen the reported bounds describe the
    // display, not the window; keep the last free-floating geometry.
    let config = if maximized || fullscreen {
        WindowConfig {
            maximized,
            fullscreen,
            ..previous
        }
    } else {
        let size = match window.inner_size() {
            Ok(size) => size.to_logical::<u32>(scale),
            Err(_) => return,
        };
        let position = window
            .outer_position()
            .ok()
            .map(|position| position.to_logical::<i32>(scale));
        WindowConfig {
            x: position.map(|p| p.x),
            y: position.map(|p| p.y),
            width: size.width,
            height: size.height,
            maximized: false,
            fullscreen: false,
        }
    };

    if let Err(error) = user_config::set_window_config(&config_path, &config) {
        log::warn!("failed to persist window geometry: {error}");
    }
}

/// Debounced geometry persistence: resize/move streams settle for
/// `GEOMETRY_PERSIST_DEBOUNCE` before anything touches disk, so transient
/// drag states are never persisted.
pub(crate) fn schedule_geometry_persist(app_handle: &AppHandle) {
    let state = app_handle.state::<AppState>();
    let epoch = state.geometry_epoch.fetch_add(1, Ordering::SeqCst) + 1;

    let app_handle = app_handle.clone();
    tauri::async_runtime::spawn(async move {
        tokio::time::sleep(GEOMETRY_PERSIST_DEBOUNCE).await;
        let state = app_handle.state::<AppState>();
        if state.geometry_epoch.load(Ordering::SeqCst) == epoch {
            persist_current_geometry(&app_handle);
        }
    });
}

/// Maximize/fullscreen/focus changes reach the renderer immediately, not
/// through the geometry debounce, so window chrome can react in time.
pub(crate) fn notify_window_stats(app_handle: &AppHandle) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        return;
    };
    let stats = WindowStats {
        maximized: window.is_maximized().unwrap_or(false),
        fullscreen: window.is_fullscreen().unwrap_or(false),
        focused: window.is_focused().unwrap_or(false),
    };

    let state = app_handle.state::<AppState>();
    let changed = match state.last_window_stats.lock() {
        Ok(mut last) => {
            if last.as_ref() == Some(&stats) {
                false
            } else {
                *last = Some(stats);
                true
            }
        }
        Err(_) => true,
    };
    if changed {
        bridge_events::emit_window_stats_changed(app_handle, stats);
    }
}

/// Hides the main window, leaving full-screen first so the compositor does
/// not flash a black frame. Only the visual hide is deferred; callers have
/// already made their lifecycle decision by the time this runs.
pub(crate) fn hide_main_window_smoothly(app_handle: &AppHandle) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        return;
    };

    if window.is_fullscreen().unwrap_or(false) {
        if let Err(error) = window.set_fullscreen(false) {
            log::warn!("failed to leave fullscreen before hiding: {error}");
        }
        let app_handle = app_handle.clone();
        tauri::async_runtime::spawn(async move {
            // No leave-fullscreen event is surfaced by the windowing layer;
            // poll briefly for the exit animation instead.
            for _ in 0..20 {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
                    return;
                };
                if !window.is_fullscreen().unwrap_or(false) {
                    break;
                }
            }
            if let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) {
                let _ = window.hide();
            }
        });
    } else if let Err(error) = window.hide() {
        log::warn!("failed to hide main window: {error}");
    }
}
