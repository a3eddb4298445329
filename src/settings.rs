use crate::spring::Spring;
use std::time::Duration;

/// Engine-level tuning knobs.
///
/// These are plain values with sensible defaults; the embedding GUI is
/// expected to construct one and hand it to the editor state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// How long a smooth scroll takes to settle, in seconds.
    pub scroll_animation_length: f32,
    /// Scroll displacement budget, in multiples of the window's inner
    /// height. Scrolls farther than this start mid-flight instead of
    /// sweeping the whole distance.
    pub far_scroll_lines: u32,
    /// Settle time for window-move animation, in seconds. Positions
    /// currently snap; the knob is kept so the springs can be re-enabled
    /// without an interface change.
    pub position_animation_length: f32,
    /// Residual scroll displacement treated as at-rest.
    pub scroll_snap_threshold: f32,
    /// How long the attach handshake may wait for the backend's response.
    pub attach_deadline: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scroll_animation_length: 0.3,
            far_scroll_lines: 1,
            position_animation_length: 0.15,
            scroll_snap_threshold: Spring::SNAP_THRESHOLD,
            attach_deadline: Duration::from_secs(5),
        }
    }
}
