use crate::camera::Camera;
use crate::field::ParticleField;
use crate::host::{DrawError, DrawTarget, Generation, MountedLayer};
use crate::pointer::PointerState;
use crate::simulation::step_layers;
use crate::tier::{QualityTier, Viewport};

/// Everything alive for one generation: draw target, layers, pointer and
/// camera. Owned exclusively by the supervisor.
pub struct Session<T: DrawTarget> {
    generation: Generation,
    tier: QualityTier,
    target: T,
    layers: Vec<MountedLayer>,
    pub pointer: PointerState,
    pub camera: Camera,
    frame_count: u64,
    pub visible: bool,
    started_ms: f64,
    last_frame_ms: Option<f64>,
    pub(crate) ready_signaled: bool,
}

impl<T: DrawTarget> Session<T> {
    pub fn new(
        generation: Generation,
        tier: QualityTier,
        mut target: T,
        field: ParticleField,
        viewport: Viewport,
        visible: bool,
        now_ms: f64,
    ) -> Self {
        target.resize(viewport.capped(tier.settings().max_pixel_ratio));
        if let Err(e) = target.load_sprite(&field.sprite) {
            log::warn!("[session] {} sprite unavailable, drawing plain points: {}", generation, e);
        }
        let mut layers = Vec::with_capacity(field.layers.len());
        for layer in field.layers {
            match target.add_layer(&layer) {
                Ok(slot) => layers.push(MountedLayer { slot, layer }),
                Err(e) => log::error!("[session] {} {:?} layer omitted: {}", generation, layer.kind, e),
            }
        }
        Self {
            generation,
            tier,
            target,
            layers,
            pointer: PointerState::new(&viewport),
            camera: Camera::new(viewport.aspect()),
            frame_count: 0,
            visible,
            started_ms: now_ms,
            last_frame_ms: None,
            ready_signaled: false,
        }
    }

    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[inline]
    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn layers(&self) -> &[MountedLayer] {
        &self.layers
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Next frame starts from a zero delta instead of catching up.
    pub fn reset_clock(&mut self) {
        self.last_frame_ms = None;
    }

    /// Simulation half of a frame: pointer, layers, camera. Returns dt.
    pub fn advance(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_frame_ms {
            Some(last) => ((now_ms - last) / 1000.0).max(0.0) as f32,
            None => 0.0,
        };
        self.last_frame_ms = Some(now_ms);
        let elapsed_ms = (now_ms - self.started_ms).max(0.0);

        self.pointer.on_idle_tick(dt, elapsed_ms);
        self.pointer.smooth(dt);
        let pointer = self.pointer.current();
        let t_sec = (elapsed_ms / 1000.0) as f32;
        step_layers(self.layers.iter_mut().map(|m| &mut m.layer), t_sec, pointer);
        self.camera.follow(pointer, dt);
        dt
    }

    /// Draw half of a frame. The counter advances even when the draw fails so
    /// the watchdog only sees a stall when frames stop arriving.
    pub fn render(&mut self) -> Result<(), DrawError> {
        self.frame_count += 1;
        self.target.draw(&self.camera, &self.layers)
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.pointer.set_viewport(&viewport);
        self.camera.aspect = viewport.aspect();
        self.target
            .resize(viewport.capped(self.tier.settings().max_pixel_ratio));
    }

    pub fn release(mut self) {
        self.target.release();
    }
}
