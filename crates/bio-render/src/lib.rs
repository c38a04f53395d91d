//! wgpu draw target for the particle field.
//!
//! Every layer is drawn as instanced screen-aligned quads sampling the shared
//! sprite texture, with additive blending and an optional MSAA resolve.

mod helpers;

use bio_core::{
    Camera, DrawError, DrawTarget, LayerSlot, MountedLayer, ParticleLayer, QualityTier, Sprite,
    Viewport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use helpers::ADDITIVE;

/// Two triangles covering a unit quad centred on the particle.
pub const QUAD_CORNERS: [[f32; 2]; 6] = [
    [-0.5, -0.5],
    [0.5, -0.5],
    [0.5, 0.5],
    [-0.5, -0.5],
    [0.5, 0.5],
    [-0.5, 0.5],
];

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub _pad: [f32; 2],
}

impl Globals {
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            viewport: [width.max(1) as f32, height.max(1) as f32],
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LayerParams {
    pub point_size: f32,
    pub opacity: f32,
    pub _pad: [f32; 2],
}

impl LayerParams {
    pub fn of(layer: &ParticleLayer) -> Self {
        Self {
            point_size: layer.point_size,
            opacity: layer.opacity,
            _pad: [0.0; 2],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererOptions {
    /// 1 disables multisampling.
    pub sample_count: u32,
    /// Composite over the page instead of clearing to an opaque colour.
    pub transparent: bool,
    pub clear_color: wgpu::Color,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            sample_count: 4,
            transparent: true,
            clear_color: wgpu::Color::TRANSPARENT,
        }
    }
}

impl RendererOptions {
    pub fn for_tier(tier: QualityTier) -> Self {
        Self {
            sample_count: if tier.settings().antialias { 4 } else { 1 },
            ..Self::default()
        }
    }
}

/// Highest of `requested` and its lower powers of two that `supported`
/// accepts, or 1.
pub fn pick_sample_count(requested: u32, supported: impl Fn(u32) -> bool) -> u32 {
    let mut n = requested.max(1).next_power_of_two();
    while n > 1 {
        if supported(n) {
            return n;
        }
        n /= 2;
    }
    1
}

struct LayerGpu {
    positions: wgpu::Buffer,
    colors: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    count: u32,
}

pub struct ParticleRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    quad_vb: wgpu::Buffer,
    globals_buffer: wgpu::Buffer,
    globals_bgl: wgpu::BindGroupLayout,
    globals_bg: wgpu::BindGroup,
    layer_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    sprite_view: wgpu::TextureView,
    layers: Vec<LayerGpu>,
    msaa: Option<(wgpu::Texture, wgpu::TextureView)>,
    sample_count: u32,
    clear_color: wgpu::Color,
    lost: Arc<AtomicBool>,
    released: bool,
}

impl ParticleRenderer {
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        viewport: Viewport,
        options: RendererOptions,
    ) -> anyhow::Result<Self> {
        let (width, height) = viewport.physical_size();

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(target)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("no compatible graphics adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                    label: Some("particle_device"),
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;

        let lost = Arc::new(AtomicBool::new(false));
        {
            let lost = lost.clone();
            device.set_device_lost_callback(move |reason, message| {
                // destroy() from release() also lands here
                if !matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                    log::warn!("[render] device lost ({:?}): {}", reason, message);
                    lost.store(true, Ordering::SeqCst);
                }
            });
        }
        device.on_uncaptured_error(Box::new(|e| log::error!("[render] wgpu error: {}", e)));

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Rgba8Unorm
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let alpha_mode = if options.transparent
            && caps
                .alpha_modes
                .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            caps.alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let format_flags = adapter.get_texture_format_features(format).flags;
        let sample_count = pick_sample_count(options.sample_count, |n| {
            format_flags.sample_count_supported(n)
        });
        if sample_count != options.sample_count {
            log::warn!(
                "[render] {}x MSAA unsupported for {:?}, using {}x",
                options.sample_count,
                format,
                sample_count
            );
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("particles_shader"),
            source: wgpu::ShaderSource::Wgsl(bio_core::PARTICLES_WGSL.into()),
        });
        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let layer_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("layer_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("particle_pl"),
            bind_group_layouts: &[&globals_bgl, &layer_bgl],
            push_constant_ranges: &[],
        });
        let pipeline =
            helpers::make_particle_pipeline(&device, &pipeline_layout, &shader, format, sample_count);

        let quad_vb = helpers::instance_buffer(&device, "quad_vb", bytemuck::cast_slice(&QUAD_CORNERS));
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        // plain opaque points until a real sprite is loaded
        let (_fallback, sprite_view) =
            helpers::create_sprite_texture(&device, &queue, 1, &[255, 255, 255, 255]);
        let globals_bg =
            Self::globals_bind_group(&device, &globals_bgl, &globals_buffer, &sprite_view, &sampler);
        let msaa = (sample_count > 1).then(|| {
            helpers::create_color_texture(&device, "msaa_color", width, height, format, sample_count)
        });

        log::info!(
            "[render] surface {}x{} {:?} alpha={:?} msaa={}x",
            width,
            height,
            format,
            alpha_mode,
            sample_count
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            quad_vb,
            globals_buffer,
            globals_bgl,
            globals_bg,
            layer_bgl,
            sampler,
            sprite_view,
            layers: Vec::new(),
            msaa,
            sample_count,
            clear_color: if options.transparent {
                wgpu::Color::TRANSPARENT
            } else {
                options.clear_color
            },
            lost,
            released: false,
        })
    }

    fn globals_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        globals: &wgpu::Buffer,
        sprite: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bg"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(sprite),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    #[inline]
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl DrawTarget for ParticleRenderer {
    fn load_sprite(&mut self, sprite: &Sprite) -> Result<(), DrawError> {
        let expected = (sprite.size as usize).pow(2) * 4;
        if sprite.size == 0 || sprite.pixels.len() != expected {
            return Err(DrawError::Resource(format!(
                "sprite is {} bytes, expected {}",
                sprite.pixels.len(),
                expected
            )));
        }
        let (_tex, view) =
            helpers::create_sprite_texture(&self.device, &self.queue, sprite.size, &sprite.pixels);
        self.globals_bg = Self::globals_bind_group(
            &self.device,
            &self.globals_bgl,
            &self.globals_buffer,
            &view,
            &self.sampler,
        );
        self.sprite_view = view;
        Ok(())
    }

    fn add_layer(&mut self, layer: &ParticleLayer) -> Result<LayerSlot, DrawError> {
        if self.released || self.is_lost() {
            return Err(DrawError::ContextLost);
        }
        let count = u32::try_from(layer.count)
            .map_err(|_| DrawError::Resource(format!("{} particles in one layer", layer.count)))?;
        let positions = helpers::instance_buffer(
            &self.device,
            "layer_positions",
            bytemuck::cast_slice(&layer.current_positions),
        );
        let colors =
            helpers::instance_buffer(&self.device, "layer_colors", bytemuck::cast_slice(&layer.colors));
        let params = helpers::uniform_buffer(&self.device, "layer_params", &LayerParams::of(layer));
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("layer_bg"),
            layout: &self.layer_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params.as_entire_binding(),
            }],
        });
        self.layers.push(LayerGpu {
            positions,
            colors,
            bind_group,
            count,
        });
        Ok(LayerSlot(self.layers.len() - 1))
    }

    fn resize(&mut self, viewport: Viewport) {
        let (width, height) = viewport.physical_size();
        if self.released || (width == self.config.width && height == self.config.height) {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        if self.sample_count > 1 {
            self.msaa = Some(helpers::create_color_texture(
                &self.device,
                "msaa_color",
                width,
                height,
                self.config.format,
                self.sample_count,
            ));
        }
    }

    fn draw(&mut self, camera: &Camera, layers: &[MountedLayer]) -> Result<(), DrawError> {
        if self.released || self.is_lost() {
            return Err(DrawError::ContextLost);
        }
        let globals = Globals::new(camera, self.config.width, self.config.height);
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        for mounted in layers {
            if let Some(gpu) = self.layers.get(mounted.slot.0) {
                if gpu.count > 0 {
                    self.queue.write_buffer(
                        &gpu.positions,
                        0,
                        bytemuck::cast_slice(&mounted.layer.current_positions),
                    );
                }
            }
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // skip this frame; the next one uses the fresh configuration
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("[render] surface timeout, frame skipped");
                return Ok(());
            }
            Err(e) => return Err(DrawError::Surface(e.to_string())),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (color_view, resolve_target) = match &self.msaa {
            Some((_, msaa_view)) => (msaa_view, Some(&view)),
            None => (&view, None),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("particle_encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("particle_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: if resolve_target.is_some() {
                            wgpu::StoreOp::Discard
                        } else {
                            wgpu::StoreOp::Store
                        },
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.globals_bg, &[]);
            rpass.set_vertex_buffer(0, self.quad_vb.slice(..));
            for mounted in layers {
                let Some(gpu) = self.layers.get(mounted.slot.0) else {
                    continue;
                };
                if gpu.count == 0 {
                    continue;
                }
                rpass.set_bind_group(1, &gpu.bind_group, &[]);
                rpass.set_vertex_buffer(1, gpu.positions.slice(..));
                rpass.set_vertex_buffer(2, gpu.colors.slice(..));
                rpass.draw(0..QUAD_CORNERS.len() as u32, 0..gpu.count);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();

        if self.is_lost() {
            return Err(DrawError::ContextLost);
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.layers.clear();
        self.msaa = None;
        self.device.destroy();
        log::info!("[render] released");
    }
}
