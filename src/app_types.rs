use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
};

use tokio::sync::oneshot;

use crate::{exit_state::ExitStateMachine, store_gateway::StoreHandle};

/// Coarse application lifecycle, owned by the startup orchestrator and the
/// shutdown coordinator. IPC handlers read it to gate behavior; nobody else
/// writes it. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub(crate) enum AppLifecycleState {
    #[default]
    NotReady,
    Initializing,
    Ready,
    ShuttingDown,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WindowStats {
    pub(crate) maximized: bool,
    pub(crate) fullscreen: bool,
    pub(crate) focused: bool,
}

pub(crate) struct AppState {
    lifecycle: Mutex<AppLifecycleState>,
    pub(crate) store: Mutex<Option<StoreHandle>>,
    pub(crate) exit_state: Mutex<ExitStateMachine>,
    pub(crate) shutdown_ack: Mutex<Option<oneshot::Sender<Option<String>>>>,
    pub(crate) pending_deep_links: Mutex<Vec<String>>,
    pub(crate) last_window_stats: Mutex<Option<WindowStats>>,
    pub(crate) geometry_epoch: AtomicU64,
    pub(crate) fatal_flow_active: AtomicBool,
    is_quitting: AtomicBool,
    renderer_ready: AtomicBool,
    renderer_drained: AtomicBool,
    profile_dir: PathBuf,
}

impl AppState {
    pub(crate) fn new(profile_dir: PathBuf) -> Self {
        Self {
            lifecycle: Mutex::new(AppLifecycleState::NotReady),
            store: Mutex::new(None),
            exit_state: Mutex::new(ExitStateMachine::default()),
            shutdown_ack: Mutex::new(None),
            pending_deep_links: Mutex::new(Vec::new()),
            last_window_stats: Mutex::new(None),
            geometry_epoch: AtomicU64::new(0),
            fatal_flow_active: AtomicBool::new(false),
            is_quitting: AtomicBool::new(false),
            renderer_ready: AtomicBool::new(false),
            renderer_drained: AtomicBool::new(false),
            profile_dir,
        }
    }

    pub(crate) fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    pub(crate) fn lifecycle(&self) -> AppLifecycleState {
        self.lifecycle
            .lock()
            .map(|guard| *guard)
            .unwrap_or(AppLifecycleState::Terminated)
    }

    /// Moves the lifecycle forward. Backward or repeated transitions are
    /// rejected, which is what collapses racing triggers (e.g. corruption
    /// firing while a shutdown is already underway) into a single path.
    pub(crate) fn advance_lifecycle(&self, to: AppLifecycleState) -> bool {
        match self.lifecycle.lock() {
            Ok(mut guard) => {
                if to <= *guard {
                    return false;
                }
                *guard = to;
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.lifecycle() == AppLifecycleState::Ready
    }

    pub(crate) fn mark_quitting(&self) {
        self.is_quitting.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_quitting(&self) -> bool {
        self.is_quitting.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_renderer_ready(&self) {
        self.renderer_ready.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_renderer_ready(&self) -> bool {
        self.renderer_ready.load(Ordering::Relaxed)
    }

    /// Set when the renderer reports it has nothing left to flush, whether
    /// that happens during a drain or proactively before one starts.
    pub(crate) fn mark_renderer_drained(&self) {
        self.renderer_drained.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_renderer_drained(&self) -> bool {
        self.renderer_drained.load(Ordering::Relaxed)
    }

    pub(crate) fn take_store(&self) -> Option<StoreHandle> {
        self.store.lock().ok().and_then(|mut guard| guard.take())
    }
}

/// RAII guard over a busy flag; clears the flag on drop. Keeps the
/// fatal-error flow from being entered twice when an init failure and the
/// corruption watcher race each other.
pub(crate) struct AtomicFlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> AtomicFlagGuard<'a> {
    pub(crate) fn try_set(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { flag })
    }
}

impl Drop for AtomicFlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::{AppLifecycleState, AppState, AtomicFlagGuard};

    fn state() -> AppState {
        AppState::new(PathBuf::from("/tmp/courier-test-profile"))
    }

    #[test]
    fn lifecycle_advances_forward_only() {
        let state = state();
        assert_eq!(state.lifecycle(), AppLifecycleState::NotReady);
        assert!(state.advance_lifecycle(AppLifecycleState::Initializing));
        assert!(state.advance_lifecycle(AppLifecycleState::Ready));
        assert!(!state.advance_lifecycle(AppLifecycleState::Initializing));
        assert!(!state.advance_lifecycle(AppLifecycleState::Ready));
        assert_eq!(state.lifecycle(), AppLifecycleState::Ready);
    }

    #[test]
    fn lifecycle_can_jump_straight_to_terminated() {
        let state = state();
        assert!(state.advance_lifecycle(AppLifecycleState::Initializing));
        assert!(state.advance_lifecycle(AppLifecycleState::Terminated));
        assert!(!state.advance_lifecycle(AppLifecycleState::ShuttingDown));
    }

    #[test]
    fn quitting_flag_is_sticky() {
        let state = state();
        assert!(!state.is_quitting());
        state.mark_quitting();
        assert!(state.is_quitting());
    }

    #[test]
    fn atomic_flag_guard_rejects_double_entry_until_drop() {
        let flag = AtomicBool::new(false);

        let guard = AtomicFlagGuard::try_set(&flag).expect("first set should succeed");
        assert!(flag.load(Ordering::Relaxed));
        assert!(AtomicFlagGuard::try_set(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::Relaxed));
        assert!(AtomicFlagGuard::try_set(&flag).is_some());
    }
}
