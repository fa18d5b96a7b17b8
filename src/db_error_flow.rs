//! Terminal handling for the fatal-at-boundary error class: store
//! initialization failure and the runtime corruption signal. Two distinct
//! triggers, one handler; both end with the process relaunching fresh or
//! exiting non-zero. No partial-recovery state is ever observable.

use tauri::{AppHandle, Manager};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};

use crate::{
    app_types::{AppLifecycleState, AppState, AtomicFlagGuard},
    encryption_key, runtime_paths, store_gateway, MAIN_WINDOW_LABEL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FatalChoice {
    DeleteAndRestart,
    CopyErrorAndQuit,
}

/// Strips profile paths out of an error message before it can reach the
/// clipboard; everything else in store errors is non-sensitive.
fn redact_error(message: &str, profile_dir: &str) -> String {
    let mut redacted = message.replace(profile_dir, "[profile]");
    if let Some(home) = dirs::home_dir() {
        redacted = redacted.replace(&home.to_string_lossy().to_string(), "[home]");
    }
    redacted
}

pub(crate) async fn handle_fatal_store_error(
    app_handle: AppHandle,
    error: store_gateway::StoreError,
) {
    let state = app_handle.state::<AppState>();
    // The init failure and the corruption watcher can race; whoever gets
    // here first owns the terminal flow.
    let Some(_guard) = AtomicFlagGuard::try_set(&state.fatal_flow_active) else {
        return;
    };

    log::error!("fatal store error: {error}");
    // Jump straight to Terminated so "activate" and IPC can never revive
    // or re-create windows behind the dialog.
    state.advance_lifecycle(AppLifecycleState::Terminated);

    if let Some(store) = state.take_store() {
        store.close().await;
    }
    if let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) {
        if let Err(close_error) = window.destroy() {
            log::warn!("failed to close main window: {close_error}");
        }
    }
    // The store is closed and no drain will ever run. Without this the
    // exit or relaunch below raises an exit request that the run-event
    // handler would intercept and divert into the shutdown handshake,
    // clobbering the exit code and the relaunch.
    mark_terminal_failure(&state);

    let choice = prompt_fatal_choice(&app_handle, &error);
    match choice {
        FatalChoice::DeleteAndRestart => {
            let profile_dir = state.profile_dir().to_path_buf();
            if let Err(erase_error) =
                store_gateway::erase_store_files(&runtime_paths::db_path(&profile_dir))
            {
                log::error!("failed to erase store: {erase_error}");
            }
            if let Err(key_error) = encryption_key::delete_key(&runtime_paths::config_path(&profile_dir))
            {
                log::error!("failed to erase encryption key: {key_error}");
            }
            log::info!("store erased, relaunching");
            app_handle.restart();
        }
        FatalChoice::CopyErrorAndQuit => {
            copy_error_to_clipboard(&app_handle, &error);
            app_handle.exit(1);
        }
    }
}

/// Records the terminal failure in shared state: lifecycle pinned at
/// `Terminated`, exit machine at `Exited`, so `shutdown_finished` holds
/// and exit requests pass straight through.
fn mark_terminal_failure(state: &AppState) {
    state.advance_lifecycle(AppLifecycleState::Terminated);
    if let Ok(mut machine) = state.exit_state.lock() {
        machine.mark_failed_exit();
    }
}

fn prompt_fatal_choice(app_handle: &AppHandle, error: &store_gateway::StoreError) -> FatalChoice {
    let delete_and_restart = app_handle
        .dialog()
        .message(format!(
            "Courier cannot open its message database.\n\n{error}\n\n\
             You can delete the database and restart with an empty one, or \
             copy the error and quit to report the problem. Deleting the \
             database removes all local messages."
        ))
        .title("Database Error")
        .kind(MessageDialogKind::Error)
        .buttons(MessageDialogButtons::OkCancelCustom(
            "Delete and restart".to_string(),
            "Copy error and quit".to_string(),
        ))
        .blocking_show();

    if delete_and_restart {
        FatalChoice::DeleteAndRestart
    } else {
        FatalChoice::CopyErrorAndQuit
    }
}

fn copy_error_to_clipboard(app_handle: &AppHandle, error: &store_gateway::StoreError) {
    use tauri_plugin_clipboard_manager::ClipboardExt;

    let state = app_handle.state::<AppState>();
    let redacted = redact_error(
        &error.to_string(),
        &state.profile_dir().to_string_lossy(),
    );
    if let Err(clipboard_error) = app_handle.clipboard().write_text(redacted) {
        log::warn!("failed to copy error to clipboard: {clipboard_error}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{mark_terminal_failure, redact_error};
    use crate::{app_types::AppState, shutdown_flow};

    #[test]
    fn terminal_failure_lets_the_exit_request_through() {
        let state = AppState::new(PathBuf::from("/tmp/courier-test-profile"));
        assert!(!shutdown_flow::shutdown_finished(&state));

        mark_terminal_failure(&state);

        // An exit raised by the fatal flow must not be prevented and
        // diverted into a drain handshake.
        assert!(shutdown_flow::shutdown_finished(&state));
        assert!(!state
            .exit_state
            .lock()
            .map(|mut machine| machine.begin_drain())
            .unwrap_or(true));
    }

    #[test]
    fn profile_paths_are_redacted() {
        let redacted = redact_error(
            "unable to open /home/u/.config/Courier/sql/db.sqlite",
            "/home/u/.config/Courier",
        );
        assert_eq!(redacted, "unable to open [profile]/sql/db.sqlite");
    }

    #[test]
    fn messages_without_paths_pass_through() {
        assert_eq!(
            redact_error("database is corrupted: malformed page", "/p"),
            "database is corrupted: malformed page"
        );
    }
}
