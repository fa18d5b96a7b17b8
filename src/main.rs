#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_runtime;
mod app_types;
mod bridge_commands;
mod bridge_events;
mod db_error_flow;
mod deep_link;
mod encryption_key;
mod exit_events;
mod exit_state;
mod main_window;
mod runtime_paths;
mod shutdown_flow;
mod startup_cleanup;
mod startup_loading;
mod startup_task;
mod store_gateway;
mod tray_actions;
mod tray_menu_handler;
mod tray_setup;
mod user_config;
mod window_actions;
mod window_config;
mod window_registry;

pub(crate) use app_constants::*;

fn main() {
    app_runtime::run();
}
