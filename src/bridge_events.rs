//! Main→renderer notification surface. Event names and payload shapes are
//! a compatibility contract with the renderer; keep them stable.

use serde_json::Value;
use tauri::{AppHandle, Emitter, Manager};

use crate::{app_types::WindowStats, MAIN_WINDOW_LABEL};

pub(crate) const PREPARE_FOR_SHUTDOWN_EVENT: &str = "prepare-for-shutdown";
pub(crate) const THEME_CHANGED_EVENT: &str = "theme-changed";
pub(crate) const WINDOW_STATS_CHANGED_EVENT: &str = "window-stats-changed";
pub(crate) const ZOOM_FACTOR_CHANGED_EVENT: &str = "zoom-factor-changed";
pub(crate) const DEEP_LINK_EVENT: &str = "deep-link";
pub(crate) const CHALLENGE_RESPONSE_EVENT: &str = "challenge-response";
pub(crate) const UNKNOWN_DEEP_LINK_EVENT: &str = "unknown-deep-link";

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct DeepLinkPayload {
    command: String,
    payload: Value,
}

fn emit_to_main<P: serde::Serialize + Clone>(app_handle: &AppHandle, event: &str, payload: P) {
    if app_handle.get_webview_window(MAIN_WINDOW_LABEL).is_none() {
        log::debug!("skipping '{event}': no main window");
        return;
    }
    if let Err(error) = app_handle.emit_to(MAIN_WINDOW_LABEL, event, payload) {
        log::warn!("failed to emit '{event}' to renderer: {error}");
    }
}

pub(crate) fn emit_prepare_for_shutdown(app_handle: &AppHandle) {
    emit_to_main(app_handle, PREPARE_FOR_SHUTDOWN_EVENT, ());
}

pub(crate) fn emit_theme_changed(app_handle: &AppHandle, theme: &str) {
    emit_to_main(app_handle, THEME_CHANGED_EVENT, theme.to_string());
}

pub(crate) fn emit_window_stats_changed(app_handle: &AppHandle, stats: WindowStats) {
    emit_to_main(app_handle, WINDOW_STATS_CHANGED_EVENT, stats);
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ZoomFactorPayload {
    zoom_factor: f64,
}

pub(crate) fn emit_zoom_factor_changed(app_handle: &AppHandle, zoom_factor: f64) {
    emit_to_main(app_handle, ZOOM_FACTOR_CHANGED_EVENT, ZoomFactorPayload { zoom_factor });
}

pub(crate) fn emit_deep_link(app_handle: &AppHandle, command: &str, payload: Value) {
    emit_to_main(
        app_handle,
        DEEP_LINK_EVENT,
        DeepLinkPayload {
            command: command.to_string(),
            payload,
        },
    );
}

pub(crate) fn emit_challenge_response(app_handle: &AppHandle, token: &str) {
    emit_to_main(app_handle, CHALLENGE_RESPONSE_EVENT, token.to_string());
}

pub(crate) fn emit_unknown_deep_link(app_handle: &AppHandle) {
    emit_to_main(app_handle, UNKNOWN_DEEP_LINK_EVENT, ());
}
