use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    dpi::PhysicalPosition,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use bio_core::{
    Host, InitTicket, Supervisor, SupervisorConfig, Viewport, WATCHDOG_INTERVAL_MS,
};
use bio_render::{ParticleRenderer, RendererOptions};

/// Desktop stand-in for the page: one window, redraws as frames, occlusion
/// as visibility.
struct NativeHost {
    window: Arc<Window>,
    pending: Option<InitTicket>,
    listening: bool,
    frame_requested: bool,
    visible: bool,
}

impl NativeHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            pending: None,
            listening: false,
            frame_requested: false,
            visible: true,
        }
    }

    fn to_logical(&self, position: PhysicalPosition<f64>) -> (f32, f32) {
        let logical = position.to_logical::<f32>(self.window.scale_factor());
        (logical.x, logical.y)
    }
}

impl Host for NativeHost {
    type Target = ParticleRenderer;

    fn viewport(&self) -> Viewport {
        let scale = self.window.scale_factor();
        let logical = self.window.inner_size().to_logical::<f32>(scale);
        Viewport::new(logical.width, logical.height, scale as f32)
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    // Built synchronously between events; see `build_pending`.
    fn begin_build(&mut self, ticket: InitTicket) {
        self.pending = Some(ticket);
    }

    fn attach_listeners(&mut self) {
        self.listening = true;
    }

    fn detach_listeners(&mut self) {
        self.listening = false;
    }

    fn request_frame(&mut self) {
        self.frame_requested = true;
        self.window.request_redraw();
    }

    fn cancel_frame(&mut self) {
        self.frame_requested = false;
    }

    fn signal_ready(&mut self) {
        log::info!("first frame presented");
    }
}

fn options_for(ticket: &InitTicket) -> RendererOptions {
    RendererOptions {
        transparent: false,
        clear_color: wgpu::Color {
            r: 0.04,
            g: 0.02,
            b: 0.08,
            a: 1.0,
        },
        ..RendererOptions::for_tier(ticket.tier)
    }
}

fn build_pending(sup: &mut Supervisor<NativeHost>, now_ms: f64) {
    let Some(ticket) = sup.host_mut().pending.take() else {
        return;
    };
    let window = sup.host().window.clone();
    let viewport = ticket
        .viewport
        .capped(ticket.tier.settings().max_pixel_ratio);
    let result = pollster::block_on(ParticleRenderer::new(
        window,
        viewport,
        options_for(&ticket),
    ));
    if let Err(e) = sup.complete_init(ticket.generation, result, now_ms) {
        log::error!("{}", e);
    }
}

fn window_builder() -> WindowBuilder {
    // Hidden windows never get a redraw on some platforms, and the first
    // frame only runs on redraw.
    WindowBuilder::new()
        .with_title("bio-backdrop (native)")
        .with_visible(true)
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        window_builder().build(&event_loop)?,
    );

    let epoch = Instant::now();
    let now_ms = move || epoch.elapsed().as_secs_f64() * 1000.0;
    let watchdog_every = Duration::from_millis(WATCHDOG_INTERVAL_MS as u64);
    let mut next_watchdog = Instant::now() + watchdog_every;

    let mut sup = Supervisor::new(NativeHost::new(window), SupervisorConfig::default());
    let generation = sup.mount()?;
    log::info!("building {}", generation);
    build_pending(&mut sup, now_ms());

    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    sup.teardown();
                    elwt.exit();
                }
                WindowEvent::RedrawRequested => {
                    if sup.host().frame_requested {
                        sup.host_mut().frame_requested = false;
                        sup.on_frame(now_ms());
                    }
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    let viewport = sup.host().viewport();
                    sup.on_resize(viewport);
                }
                WindowEvent::Occluded(occluded) => {
                    sup.host_mut().visible = !occluded;
                    sup.on_visibility_change(!occluded, now_ms());
                }
                WindowEvent::CursorMoved { position, .. } if sup.host().listening => {
                    let (x, y) = sup.host().to_logical(position);
                    sup.on_pointer_move(x, y);
                }
                WindowEvent::Touch(touch) if sup.host().listening => {
                    let (x, y) = sup.host().to_logical(touch.location);
                    sup.on_pointer_move(x, y);
                }
                WindowEvent::CursorLeft { .. } if sup.host().listening => {
                    sup.on_pointer_leave();
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key,
                            state: ElementState::Pressed,
                            repeat: false,
                            ..
                        },
                    ..
                } => match logical_key.as_ref() {
                    Key::Character("r") | Key::Character("R") => {
                        let generation = sup.reset();
                        log::info!("manual reset to {}", generation);
                    }
                    Key::Named(NamedKey::Escape) => {
                        sup.teardown();
                        elwt.exit();
                    }
                    _ => {}
                },
                _ => {}
            },
            Event::AboutToWait => {
                build_pending(&mut sup, now_ms());
                if Instant::now() >= next_watchdog {
                    sup.on_watchdog(now_ms());
                    next_watchdog = Instant::now() + watchdog_every;
                }
                elwt.set_control_flow(ControlFlow::WaitUntil(next_watchdog));
            }
            _ => {}
        }
    })?;
    Ok(())
}
