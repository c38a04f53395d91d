//! Seams between the platform-free supervisor and a concrete frontend.

use crate::camera::Camera;
use crate::field::ParticleLayer;
use crate::sprite::Sprite;
use crate::tier::{QualityTier, Viewport};

/// Monotonic key identifying one session attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    #[inline]
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Handed to the host when a draw target must be built for a new generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitTicket {
    pub generation: Generation,
    pub tier: QualityTier,
    pub viewport: Viewport,
}

/// Index of a layer's GPU-side resources inside a draw target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerSlot(pub usize);

/// A layer whose resources were accepted by the draw target.
#[derive(Clone, Debug)]
pub struct MountedLayer {
    pub slot: LayerSlot,
    pub layer: ParticleLayer,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum DrawError {
    #[error("graphics context lost")]
    ContextLost,
    #[error("resource creation failed: {0}")]
    Resource(String),
    #[error("surface error: {0}")]
    Surface(String),
}

/// The draw surface plus the GPU resources of one session.
pub trait DrawTarget {
    fn load_sprite(&mut self, sprite: &Sprite) -> Result<(), DrawError>;
    fn add_layer(&mut self, layer: &ParticleLayer) -> Result<LayerSlot, DrawError>;
    /// `viewport` already carries the tier's pixel-ratio cap.
    fn resize(&mut self, viewport: Viewport);
    fn draw(&mut self, camera: &Camera, layers: &[MountedLayer]) -> Result<(), DrawError>;
    /// Free GPU resources and detach the surface from its container.
    fn release(&mut self);
}

/// Platform services the supervisor drives.
pub trait Host {
    type Target: DrawTarget;

    fn viewport(&self) -> Viewport;
    fn is_visible(&self) -> bool;
    /// Start building a draw target; the result comes back through
    /// `Supervisor::complete_init` with the same generation.
    fn begin_build(&mut self, ticket: InitTicket);
    fn attach_listeners(&mut self);
    fn detach_listeners(&mut self);
    fn request_frame(&mut self);
    fn cancel_frame(&mut self);
    fn signal_ready(&mut self);
}
