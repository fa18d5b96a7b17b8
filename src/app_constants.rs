use std::time::Duration;

pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const LOADING_WINDOW_LABEL: &str = "loading";

pub(crate) const MAIN_WINDOW_TITLE: &str = "Courier";

/// How long store initialization may run before a loading window is shown.
pub(crate) const LOADING_WINDOW_DELAY: Duration = Duration::from_millis(3000);

/// Upper bound on the renderer flushing pending work before shutdown
/// proceeds anyway. Some platforms force-kill processes that stall their
/// quit sequence, so this must stay well under any OS grace window policy
/// an admin could configure.
pub(crate) const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Quiet period after the last resize/move before geometry is persisted.
pub(crate) const GEOMETRY_PERSIST_DEBOUNCE: Duration = Duration::from_millis(500);

pub(crate) const MIN_WINDOW_WIDTH: u32 = 680;
pub(crate) const MIN_WINDOW_HEIGHT: u32 = 550;
pub(crate) const DEFAULT_WINDOW_WIDTH: u32 = 800;
pub(crate) const DEFAULT_WINDOW_HEIGHT: u32 = 610;

/// Minimum number of pixels of a restored window that must be visible on
/// some connected display, otherwise the stored position is discarded.
pub(crate) const MIN_VISIBLE_MARGIN: i32 = 100;

pub(crate) const DEEP_LINK_SCHEME: &str = "courier";
pub(crate) const CAPTCHA_SCHEME: &str = "couriercaptcha";
pub(crate) const DEEP_LINK_HTTPS_HOST: &str = "go.courier.chat";

pub(crate) const PROFILE_DIR_ENV: &str = "COURIER_PROFILE_DIR";
