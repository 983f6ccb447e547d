//! The single mutable value carried across frames.

use std::time::Instant;

/// Degrees of rotation added per millisecond of wall-clock time.
pub const SPIN_RATE_DEG_PER_MS: f32 = 0.03;

/// Rotation angle plus the previous frame's timestamp.
///
/// Mutated only by [`advance`](SceneState::advance); the renderer reads the
/// angle indirectly through the model-view matrix it derives. The angle is
/// unbounded: only its sine and cosine matter downstream.
#[derive(Debug, Clone, Copy)]
pub struct SceneState {
    angle_deg: f32,
    last_frame: Option<Instant>,
}

impl SceneState {
    pub fn new(initial_angle_deg: f32) -> Self {
        Self {
            angle_deg: initial_angle_deg,
            last_frame: None,
        }
    }

    pub fn angle_deg(&self) -> f32 {
        self.angle_deg
    }

    /// Advances the rotation by the elapsed time since the previous call.
    ///
    /// The very first call only records the timestamp and leaves the angle
    /// unchanged.
    pub fn advance(&mut self, now: Instant) {
        if let Some(previous) = self.last_frame {
            let elapsed_ms = now.duration_since(previous).as_secs_f32() * 1000.0;
            self.angle_deg += SPIN_RATE_DEG_PER_MS * elapsed_ms;
        }
        self.last_frame = Some(now);
    }
}
