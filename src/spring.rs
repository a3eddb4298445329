//! Critically damped springs driving smooth-scroll and UI transitions.
//!
//! The spring decays toward zero without ever overshooting, which keeps
//! scrolled content from bouncing past its resting position. Motion is
//! tuned so that it visually completes within the configured length.

/// A one-dimensional critically damped spring.
///
/// `position` is the remaining displacement from the target (which is
/// always zero); `velocity` is carried between updates so that a new
/// displacement arriving mid-flight blends into the ongoing motion.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Spring {
    pub position: f32,
    pub velocity: f32,
}

impl Spring {
    /// Residual displacement below which motion snaps to rest.
    ///
    /// A larger residual would keep the extra animation row visible and
    /// bleed into the margin cells next to the scroll region.
    pub const SNAP_THRESHOLD: f32 = 0.01;

    pub fn new(position: f32) -> Self {
        Self {
            position,
            velocity: 0.0,
        }
    }

    /// Stops any ongoing motion.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.velocity = 0.0;
    }

    /// Advances the spring by `dt` seconds, tuned to settle within
    /// `length` seconds. Returns whether the spring is still moving.
    ///
    /// When `length` is not longer than a single frame, or the remaining
    /// displacement falls under `snap`, position and velocity are snapped
    /// to exactly zero.
    pub fn update(&mut self, dt: f32, length: f32, snap: f32) -> bool {
        if length <= dt || self.position.abs() < snap {
            self.reset();
            return false;
        }

        let omega = 4.0 / length;
        let a = self.position;
        let b = self.position * omega + self.velocity;
        let c = (-omega * dt).exp();

        self.position = (a + b * dt) * c;
        self.velocity = c * (-a * omega - b * dt * omega + b);

        true
    }
}
