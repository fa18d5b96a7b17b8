use tauri::{Manager, WindowEvent};

use crate::{
    app_types::AppState, bridge_events, deep_link, exit_events, main_window, runtime_paths,
    startup_task, window_actions, MAIN_WINDOW_LABEL,
};

pub(crate) fn run() {
    let profile_dir = runtime_paths::default_profile_dir();

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app_handle, argv, _cwd| {
            // A second launch surfaces the running instance and forwards
            // any deep link it carried.
            window_actions::show_main_window(app_handle);
            if let Some(raw) = deep_link::deep_link_from_argv(&argv) {
                startup_task::route_or_queue_deep_link(app_handle, raw);
            }
        }))
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .plugin(tauri_plugin_opener::init())
        .manage(AppState::new(profile_dir))
        .invoke_handler(tauri::generate_handler![
            crate::bridge_commands::bridge_database_ready,
            crate::bridge_commands::bridge_renderer_shutdown_complete,
            crate::bridge_commands::bridge_show_window,
            crate::bridge_commands::bridge_store_call,
            crate::bridge_commands::bridge_get_cached_settings,
            crate::bridge_commands::bridge_set_theme,
            crate::bridge_commands::bridge_set_spellcheck,
            crate::bridge_commands::bridge_restart,
            crate::bridge_commands::bridge_open_external_url,
            crate::bridge_commands::bridge_handle_deep_link,
        ])
        .on_window_event(|window, event| {
            if window.label() != MAIN_WINDOW_LABEL {
                return;
            }
            let app_handle = window.app_handle();

            match event {
                WindowEvent::CloseRequested { api, .. } => {
                    let state = app_handle.state::<AppState>();
                    if state.is_quitting() {
                        // An explicit quit is in flight; let the shutdown
                        // coordinator own the window.
                        return;
                    }
                    // Tray-resident policy: plain close hides, it does not
                    // terminate.
                    api.prevent_close();
                    main_window::persist_current_geometry(app_handle);
                    window_actions::hide_main_window(app_handle);
                }
                WindowEvent::Resized(_) | WindowEvent::Moved(_) => {
                    main_window::schedule_geometry_persist(app_handle);
                    main_window::notify_window_stats(app_handle);
                }
                WindowEvent::Focused(_) => {
                    main_window::notify_window_stats(app_handle);
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    bridge_events::emit_zoom_factor_changed(app_handle, *scale_factor);
                }
                _ => {}
            }
        })
        .setup(|app| {
            app.handle().plugin(
                tauri_plugin_log::Builder::default()
                    .level(log::LevelFilter::Info)
                    .build(),
            )?;

            let app_handle = app.handle().clone();
            log::info!("desktop process starting");

            // Deep links handed to the very first launch wait in the queue
            // until startup flips to Ready.
            let argv: Vec<String> = std::env::args().collect();
            if let Some(raw) = deep_link::deep_link_from_argv(&argv) {
                startup_task::route_or_queue_deep_link(&app_handle, raw);
            }

            startup_task::spawn_startup_task(app_handle);
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| exit_events::handle_run_event(app_handle, &event));
}
