//! Persisted main-window geometry and the rules for restoring it safely
//! after displays have changed.

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, MIN_VISIBLE_MARGIN, MIN_WINDOW_HEIGHT,
    MIN_WINDOW_WIDTH,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WindowConfig {
    pub(crate) x: Option<i32>,
    pub(crate) y: Option<i32>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    #[serde(default)]
    pub(crate) maximized: bool,
    #[serde(default)]
    pub(crate) fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            maximized: false,
            fullscreen: false,
        }
    }
}

/// Logical bounds of one connected display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DisplayBounds {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    Restored { x: i32, y: i32 },
    Centered,
}

pub(crate) fn clamp_size(width: u32, height: u32) -> (u32, u32) {
    (width.max(MIN_WINDOW_WIDTH), height.max(MIN_WINDOW_HEIGHT))
}

/// A stored position is honored only if at least one display would show a
/// usable slice of the window: `MIN_VISIBLE_MARGIN` pixels horizontally,
/// the title bar not above the display top, and not within the bottom
/// margin. Guards against windows stranded on a disconnected monitor.
fn position_visible_on(x: i32, y: i32, width: u32, display: &DisplayBounds) -> bool {
    let display_right = display.x + display.width as i32;
    let display_bottom = display.y + display.height as i32;

    let horizontally_visible =
        x + width as i32 >= display.x + MIN_VISIBLE_MARGIN && x <= display_right - MIN_VISIBLE_MARGIN;
    let vertically_visible = y >= display.y && y <= display_bottom - MIN_VISIBLE_MARGIN;

    horizontally_visible && vertically_visible
}

pub(crate) fn resolve_placement(config: &WindowConfig, displays: &[DisplayBounds]) -> Placement {
    let (Some(x), Some(y)) = (config.x, config.y) else {
        return Placement::Centered;
    };
    if displays
        .iter()
        .any(|display| position_visible_on(x, y, config.width, display))
    {
        Placement::Restored { x, y }
    } else {
        Placement::Centered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: DisplayBounds = DisplayBounds {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };

    fn config_at(x: i32, y: i32) -> WindowConfig {
        WindowConfig {
            x: Some(x),
            y: Some(y),
            width: 800,
            height: 610,
            maximized: false,
            fullscreen: false,
        }
    }

    #[test]
    fn clamp_size_enforces_minimums() {
        assert_eq!(clamp_size(100, 5000), (MIN_WINDOW_WIDTH, 5000));
        assert_eq!(clamp_size(1024, 200), (1024, MIN_WINDOW_HEIGHT));
        assert_eq!(clamp_size(1024, 768), (1024, 768));
    }

    #[test]
    fn missing_position_falls_back_to_centered() {
        let config = WindowConfig::default();
        assert_eq!(resolve_placement(&config, &[PRIMARY]), Placement::Centered);
    }

    #[test]
    fn on_screen_position_is_honored_verbatim() {
        let config = config_at(120, 80);
        assert_eq!(
            resolve_placement(&config, &[PRIMARY]),
            Placement::Restored { x: 120, y: 80 }
        );
    }

    #[test]
    fn fully_off_screen_position_is_discarded() {
        // Stranded on a display to the right that no longer exists.
        let config = config_at(2500, 80);
        assert_eq!(resolve_placement(&config, &[PRIMARY]), Placement::Centered);
    }

    #[test]
    fn barely_visible_position_satisfies_the_margin_rule() {
        // 100 px of the window peeking in from the left edge.
        let config = config_at(-700, 80);
        assert_eq!(
            resolve_placement(&config, &[PRIMARY]),
            Placement::Restored { x: -700, y: 80 }
        );
        // One pixel less and it is discarded.
        let config = config_at(-701, 80);
        assert_eq!(resolve_placement(&config, &[PRIMARY]), Placement::Centered);
    }

    #[test]
    fn title_bar_above_the_display_is_discarded() {
        let config = config_at(120, -1);
        assert_eq!(resolve_placement(&config, &[PRIMARY]), Placement::Centered);
    }

    #[test]
    fn bottom_margin_keeps_the_title_bar_reachable() {
        let config = config_at(120, 980);
        assert_eq!(
            resolve_placement(&config, &[PRIMARY]),
            Placement::Restored { x: 120, y: 980 }
        );
        let config = config_at(120, 981);
        assert_eq!(resolve_placement(&config, &[PRIMARY]), Placement::Centered);
    }

    #[test]
    fn secondary_display_can_rescue_a_position() {
        let secondary = DisplayBounds {
            x: 1920,
            y: 0,
            width: 1920,
            height: 1080,
        };
        let config = config_at(2500, 80);
        assert_eq!(resolve_placement(&config, &[PRIMARY]), Placement::Centered);
        assert_eq!(
            resolve_placement(&config, &[PRIMARY, secondary]),
            Placement::Restored { x: 2500, y: 80 }
        );
    }
}
