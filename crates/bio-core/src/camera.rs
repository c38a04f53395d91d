//! Camera state shared with the renderers.
//!
//! These types avoid platform APIs so both frontends can build view and
//! projection matrices from the same rig.

use crate::constants::{
    CAMERA_FOLLOW_MAX, CAMERA_FOLLOW_RATE, CAMERA_FOVY_DEG, CAMERA_PARALLAX, CAMERA_Z,
    CAMERA_ZFAR, CAMERA_ZNEAR,
};
use glam::{Mat4, Vec2, Vec3};

/// Simple right-handed camera description with perspective projection.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, CAMERA_Z),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect,
            fovy_radians: CAMERA_FOVY_DEG.to_radians(),
            znear: CAMERA_ZNEAR,
            zfar: CAMERA_ZFAR,
        }
    }

    /// Compute the clip-space projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }
    /// Compute the view matrix that transforms world to view space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ease the eye towards the pointer-derived offset and keep looking at the
    /// scene origin.
    pub fn follow(&mut self, pointer: Vec2, dt: f32) {
        let goal = Vec2::new(-pointer.x * CAMERA_PARALLAX, pointer.y * CAMERA_PARALLAX);
        let k = (dt * CAMERA_FOLLOW_RATE).min(CAMERA_FOLLOW_MAX);
        self.eye.x += (goal.x - self.eye.x) * k;
        self.eye.y += (goal.y - self.eye.y) * k;
        self.target = Vec3::ZERO;
    }
}
