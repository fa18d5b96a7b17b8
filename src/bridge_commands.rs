//! Renderer→main command surface. Names and payload shapes are part of
//! the renderer compatibility contract.

use std::path::Path;

use serde_json::Value;
use tauri::{AppHandle, Manager};
use url::Url;

use crate::{
    app_types::AppState, bridge_events, main_window, runtime_paths, startup_task, user_config,
    window_registry::WindowKind,
};

fn parse_openable_url(raw_url: &str) -> Result<Url, String> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return Err("Missing external URL.".to_string());
    }

    let parsed = Url::parse(trimmed).map_err(|error| format!("Invalid URL: {error}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(format!(
            "Unsupported URL scheme '{scheme}', only http/https are allowed."
        )),
    }
}

fn parse_theme(raw: &str) -> Result<&'static str, String> {
    match raw {
        "light" => Ok("light"),
        "dark" => Ok("dark"),
        "system" => Ok("system"),
        other => Err(format!("Unknown theme '{other}'.")),
    }
}

/// The renderer's store connection came up; from here on it can be asked
/// to flush pending work before shutdown.
#[tauri::command]
pub(crate) fn bridge_database_ready(app_handle: AppHandle) {
    let state = app_handle.state::<AppState>();
    state.mark_renderer_ready();
}

/// Acknowledgment of `prepare-for-shutdown`. An error payload is recorded
/// but never blocks shutdown.
#[tauri::command]
pub(crate) fn bridge_renderer_shutdown_complete(app_handle: AppHandle, error: Option<String>) {
    let state = app_handle.state::<AppState>();
    state.mark_renderer_drained();
    let pending = state
        .shutdown_ack
        .lock()
        .ok()
        .and_then(|mut guard| guard.take());
    match pending {
        Some(ack) => {
            let _ = ack.send(error);
        }
        None => {
            if let Some(error) = error {
                log::warn!("renderer drained outside a shutdown handshake with error: {error}");
            }
        }
    }
}

#[tauri::command]
pub(crate) fn bridge_show_window(app_handle: AppHandle, kind: String) -> Result<(), String> {
    let state = app_handle.state::<AppState>();
    if !state.is_ready() {
        return Err("Application is not ready yet.".to_string());
    }
    let kind = WindowKind::from_request(&kind)
        .ok_or_else(|| format!("Unknown window kind '{kind}'."))?;
    crate::window_registry::show_or_create(&app_handle, kind)
}

/// Opaque pass-through to the store. Gated on Ready so no call can ever
/// race initialization.
#[tauri::command]
pub(crate) async fn bridge_store_call(
    app_handle: AppHandle,
    op: String,
    args: Vec<Value>,
) -> Result<Value, String> {
    let store = {
        let state = app_handle.state::<AppState>();
        if !state.is_ready() {
            return Err("Store is not ready.".to_string());
        }
        state.store.lock().ok().and_then(|guard| (*guard).clone())
    };
    match store {
        Some(store) => store
            .call(&op, args)
            .await
            .map_err(|error| error.to_string()),
        None => Err("Store is not available.".to_string()),
    }
}

/// Theme is a fast-path setting: cached in the local config so the next
/// launch can apply it before the store is up, mirrored into the store
/// once Ready.
#[tauri::command]
pub(crate) async fn bridge_set_theme(app_handle: AppHandle, theme: String) -> Result<(), String> {
    let theme = parse_theme(&theme)?;

    let state = app_handle.state::<AppState>();
    let config_path = runtime_paths::config_path(state.profile_dir());
    user_config::set_string(&config_path, user_config::THEME_FIELD, theme)?;
    bridge_events::emit_theme_changed(&app_handle, theme);

    let store = state.store.lock().ok().and_then(|guard| (*guard).clone());
    if let Some(store) = store.filter(|_| state.is_ready()) {
        if let Err(error) = store
            .call("setItem", vec!["theme-setting".into(), theme.into()])
            .await
        {
            log::warn!("failed to mirror theme into the store: {error}");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CachedSettings {
    theme: Option<String>,
    spellcheck: Option<bool>,
}

fn read_cached_settings(config_path: &Path) -> Result<CachedSettings, String> {
    Ok(CachedSettings {
        theme: user_config::get_string(config_path, user_config::THEME_FIELD)?,
        spellcheck: user_config::get_bool(config_path, user_config::SPELLCHECK_FIELD)?,
    })
}

/// Settings the renderer needs before the store is up, served from the
/// local config cache. Missing fields mean "use the default".
#[tauri::command]
pub(crate) fn bridge_get_cached_settings(app_handle: AppHandle) -> Result<CachedSettings, String> {
    let state = app_handle.state::<AppState>();
    let config_path = runtime_paths::config_path(state.profile_dir());
    read_cached_settings(&config_path)
}

/// Spellcheck mirrors the theme handling: local config first so the
/// cached value survives a store wipe, store second.
#[tauri::command]
pub(crate) async fn bridge_set_spellcheck(
    app_handle: AppHandle,
    enabled: bool,
) -> Result<(), String> {
    let state = app_handle.state::<AppState>();
    let config_path = runtime_paths::config_path(state.profile_dir());
    user_config::update_config(&config_path, |fields| {
        fields.insert(user_config::SPELLCHECK_FIELD.to_string(), enabled.into());
    })?;

    let store = state.store.lock().ok().and_then(|guard| (*guard).clone());
    if let Some(store) = store.filter(|_| state.is_ready()) {
        if let Err(error) = store
            .call("setItem", vec!["spell-check".into(), enabled.into()])
            .await
        {
            log::warn!("failed to mirror spellcheck into the store: {error}");
        }
    }
    Ok(())
}

/// A full drain-and-close shutdown that relaunches instead of exiting,
/// for settings that only take effect on a fresh process.
#[tauri::command]
pub(crate) fn bridge_restart(app_handle: AppHandle) {
    tauri::async_runtime::spawn(async move {
        crate::shutdown_flow::run_shutdown(app_handle, crate::shutdown_flow::AfterShutdown::Restart)
            .await;
    });
}

#[tauri::command]
pub(crate) fn bridge_open_external_url(app_handle: AppHandle, url: String) -> Result<(), String> {
    let parsed = parse_openable_url(&url)?;
    main_window::open_external(&app_handle, parsed.as_ref());
    Ok(())
}

/// Links can also reach the main process from the renderer side (e.g. a
/// clicked message link the webview intercepted).
#[tauri::command]
pub(crate) fn bridge_handle_deep_link(app_handle: AppHandle, url: String) {
    startup_task::route_or_queue_deep_link(&app_handle, url);
}

#[cfg(test)]
mod tests {
    use super::{parse_openable_url, parse_theme, read_cached_settings, CachedSettings};
    use crate::user_config;

    #[test]
    fn cached_settings_round_trip_through_the_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");

        // Nothing written yet: both settings default.
        assert_eq!(
            read_cached_settings(&path).unwrap(),
            CachedSettings {
                theme: None,
                spellcheck: None,
            }
        );

        user_config::set_string(&path, user_config::THEME_FIELD, "dark").unwrap();
        user_config::update_config(&path, |fields| {
            fields.insert(user_config::SPELLCHECK_FIELD.to_string(), true.into());
        })
        .unwrap();

        assert_eq!(
            read_cached_settings(&path).unwrap(),
            CachedSettings {
                theme: Some("dark".to_string()),
                spellcheck: Some(true),
            }
        );
    }

    #[test]
    fn openable_urls_are_limited_to_http_and_https() {
        assert!(parse_openable_url("https://example.com/a").is_ok());
        assert!(parse_openable_url("http://example.com").is_ok());
        assert!(parse_openable_url("file:///etc/passwd").is_err());
        assert!(parse_openable_url("javascript:alert(1)").is_err());
        assert!(parse_openable_url("   ").is_err());
        assert!(parse_openable_url("not a url").is_err());
    }

    #[test]
    fn themes_are_a_closed_set() {
        assert_eq!(parse_theme("light"), Ok("light"));
        assert_eq!(parse_theme("dark"), Ok("dark"));
        assert_eq!(parse_theme("system"), Ok("system"));
        assert!(parse_theme("solarized").is_err());
    }
}
