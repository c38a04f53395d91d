pub mod camera;
pub mod constants;
pub mod field;
pub mod host;
pub mod pointer;
pub mod session;
pub mod simulation;
pub mod sprite;
pub mod supervisor;
pub mod tier;
pub mod watchdog;

pub use camera::*;
pub use constants::*;
pub use field::*;
pub use host::*;
pub use pointer::*;
pub use session::*;
pub use simulation::*;
pub use sprite::*;
pub use supervisor::*;
pub use tier::*;
pub use watchdog::*;

// Shaders bundled as string constants
pub static PARTICLES_WGSL: &str = include_str!("../shaders/particles.wgsl");
