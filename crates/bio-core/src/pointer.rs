//! Pointer tracking: normalized target, eased follower and idle drift.

use crate::constants::{
    DRIFT_AMP_X, DRIFT_AMP_Y, DRIFT_FREQ_X, DRIFT_FREQ_Y, IDLE_THRESHOLD_SECS,
    POINTER_FOLLOW_MAX, POINTER_FOLLOW_RATE,
};
use crate::tier::Viewport;
use glam::Vec2;

#[derive(Clone, Debug)]
pub struct PointerState {
    /// Raw target in [-1, 1], written by input events or idle drift.
    pub target: Vec2,
    /// Eased follower of `target`, read by the simulation.
    pub smoothed: Vec2,
    pub active: bool,
    pub idle_seconds: f32,
    pub idle_threshold: f32,
    half_viewport: Vec2,
}

impl PointerState {
    pub fn new(viewport: &Viewport) -> Self {
        let mut s = Self {
            target: Vec2::ZERO,
            smoothed: Vec2::ZERO,
            active: false,
            idle_seconds: 0.0,
            idle_threshold: IDLE_THRESHOLD_SECS,
            half_viewport: Vec2::ZERO,
        };
        s.set_viewport(viewport);
        s
    }

    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.half_viewport = Vec2::new(viewport.width / 2.0, viewport.height / 2.0);
    }

    #[inline]
    pub fn half_viewport(&self) -> Vec2 {
        self.half_viewport
    }

    /// Map client pixel coordinates to [-1, 1] with screen-down as sim-up.
    pub fn normalize(&self, x: f32, y: f32) -> Vec2 {
        let h = self.half_viewport;
        let nx = if h.x > 0.0 { (x - h.x) / h.x } else { 0.0 };
        let ny = if h.y > 0.0 { -(y - h.y) / h.y } else { 0.0 };
        Vec2::new(nx, ny)
    }

    pub fn on_move(&mut self, x: f32, y: f32) {
        self.active = true;
        self.idle_seconds = 0.0;
        self.target = self.normalize(x, y);
    }

    /// Pointer left the page; drift takes over on the next tick.
    pub fn on_leave(&mut self) {
        self.active = false;
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.active || self.idle_seconds > self.idle_threshold
    }

    /// Advance the idle clock. `elapsed_ms` is session time in milliseconds.
    pub fn on_idle_tick(&mut self, dt: f32, elapsed_ms: f64) {
        self.idle_seconds += dt;
        if self.is_idle() {
            self.target = drift(elapsed_ms);
        }
    }

    pub fn smooth(&mut self, dt: f32) {
        let k = (dt * POINTER_FOLLOW_RATE).min(POINTER_FOLLOW_MAX);
        self.smoothed += (self.target - self.smoothed) * k;
    }

    #[inline]
    pub fn current(&self) -> Vec2 {
        self.smoothed
    }
}

/// Synthetic Lissajous drift used while the pointer is idle.
pub fn drift(elapsed_ms: f64) -> Vec2 {
    Vec2::new(
        (elapsed_ms * DRIFT_FREQ_X).sin() as f32 * DRIFT_AMP_X,
        (elapsed_ms * DRIFT_FREQ_Y).cos() as f32 * DRIFT_AMP_Y,
    )
}
