//! DOM implementation of the supervisor's host and draw-target seams.

use crate::events::ListenerRegistry;
use crate::frame::FrameScheduler;
use crate::input::ListenOn;
use crate::{dom, input, with_shell, Shell};
use anyhow::Context;
use bio_core::{
    Camera, DrawError, DrawTarget, Host, InitTicket, LayerSlot, MountedLayer, ParticleLayer,
    Sprite, Viewport, WATCHDOG_INTERVAL_MS,
};
use bio_render::{ParticleRenderer, RendererOptions};
use std::cell::RefCell;
use std::rc::Weak;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

/// A generation's canvas and the renderer drawing into it.
pub(crate) struct CanvasTarget {
    canvas: web::HtmlCanvasElement,
    renderer: ParticleRenderer,
}

impl CanvasTarget {
    async fn build(canvas: web::HtmlCanvasElement, ticket: InitTicket) -> anyhow::Result<Self> {
        let viewport = ticket
            .viewport
            .capped(ticket.tier.settings().max_pixel_ratio);
        let built = ParticleRenderer::new(
            wgpu::SurfaceTarget::Canvas(canvas.clone()),
            viewport,
            RendererOptions::for_tier(ticket.tier),
        )
        .await
        .with_context(|| format!("WebGPU unavailable for {}", ticket.generation));
        match built {
            Ok(renderer) => Ok(Self { canvas, renderer }),
            Err(e) => {
                canvas.remove();
                Err(e)
            }
        }
    }
}

impl DrawTarget for CanvasTarget {
    fn load_sprite(&mut self, sprite: &Sprite) -> Result<(), DrawError> {
        self.renderer.load_sprite(sprite)
    }

    fn add_layer(&mut self, layer: &ParticleLayer) -> Result<LayerSlot, DrawError> {
        self.renderer.add_layer(layer)
    }

    fn resize(&mut self, viewport: Viewport) {
        dom::size_canvas(&self.canvas, viewport);
        self.renderer.resize(viewport);
    }

    fn draw(&mut self, camera: &Camera, layers: &[MountedLayer]) -> Result<(), DrawError> {
        self.renderer.draw(camera, layers)
    }

    fn release(&mut self) {
        self.renderer.release();
        self.canvas.remove();
    }
}

pub(crate) struct WebHost {
    shell: Weak<RefCell<Shell>>,
    window: web::Window,
    document: web::Document,
    container: web::HtmlElement,
    listeners: ListenerRegistry,
    frames: FrameScheduler,
}

impl WebHost {
    pub fn new(
        shell: Weak<RefCell<Shell>>,
        window: web::Window,
        document: web::Document,
        container: web::HtmlElement,
    ) -> Self {
        Self {
            frames: FrameScheduler::new(window.clone(), shell.clone()),
            shell,
            window,
            document,
            container,
            listeners: ListenerRegistry::default(),
        }
    }

    pub fn container(&self) -> &web::HtmlElement {
        &self.container
    }

    fn event_target(&self, kind: &str) -> anyhow::Result<web::EventTarget> {
        Ok(match input::listen_on(kind) {
            ListenOn::Window => self.window.clone().into(),
            ListenOn::Document => self.document.clone().into(),
            ListenOn::Root => self
                .document
                .document_element()
                .ok_or_else(|| anyhow::anyhow!("document has no root element"))?
                .into(),
        })
    }

    fn register_all(&mut self) -> anyhow::Result<()> {
        let shell = self.shell.clone();
        let target = self.event_target("mousemove")?;
        self.listeners.listen(&target, "mousemove", move |ev| {
            if let Some(ev) = ev.dyn_ref::<web::MouseEvent>() {
                let (x, y) = (ev.client_x() as f32, ev.client_y() as f32);
                with_shell(&shell, |s| s.supervisor.on_pointer_move(x, y));
            }
        })?;

        for kind in ["touchstart", "touchmove"] {
            let shell = self.shell.clone();
            let target = self.event_target(kind)?;
            self.listeners.listen(&target, kind, move |ev| {
                let Some(ev) = ev.dyn_ref::<web::TouchEvent>() else {
                    return;
                };
                let touches = ev.touches();
                let points = (0..touches.length())
                    .filter_map(|i| touches.get(i))
                    .map(|t| (t.client_x(), t.client_y()));
                if let Some((x, y)) = input::first_touch(points) {
                    with_shell(&shell, |s| s.supervisor.on_pointer_move(x, y));
                }
            })?;
        }

        let shell = self.shell.clone();
        let target = self.event_target("mouseleave")?;
        self.listeners.listen(&target, "mouseleave", move |_| {
            with_shell(&shell, |s| s.supervisor.on_pointer_leave());
        })?;

        let shell = self.shell.clone();
        let window = self.window.clone();
        let target = self.event_target("resize")?;
        self.listeners.listen(&target, "resize", move |_| {
            let viewport = dom::read_viewport(&window);
            with_shell(&shell, |s| s.supervisor.on_resize(viewport));
        })?;

        let shell = self.shell.clone();
        let document = self.document.clone();
        let target = self.event_target("visibilitychange")?;
        self.listeners
            .listen(&target, "visibilitychange", move |_| {
                let visible = dom::is_visible(&document);
                with_shell(&shell, |s| {
                    let now = s.now_ms();
                    s.supervisor.on_visibility_change(visible, now);
                });
            })?;

        let shell = self.shell.clone();
        self.listeners
            .every(&self.window, WATCHDOG_INTERVAL_MS as i32, move || {
                with_shell(&shell, |s| {
                    let now = s.now_ms();
                    s.supervisor.on_watchdog(now);
                });
            })?;
        Ok(())
    }
}

impl Host for WebHost {
    type Target = CanvasTarget;

    fn viewport(&self) -> Viewport {
        dom::read_viewport(&self.window)
    }

    fn is_visible(&self) -> bool {
        dom::is_visible(&self.document)
    }

    fn begin_build(&mut self, ticket: InitTicket) {
        let capped = ticket
            .viewport
            .capped(ticket.tier.settings().max_pixel_ratio);
        let canvas = dom::create_canvas(&self.document, &self.container, capped);
        let shell = self.shell.clone();
        spawn_local(async move {
            let result = match canvas {
                Ok(canvas) => CanvasTarget::build(canvas, ticket).await,
                Err(e) => Err(e),
            };
            let Some(shell) = shell.upgrade() else {
                if let Ok(mut target) = result {
                    target.release();
                }
                return;
            };
            let Ok(mut s) = shell.try_borrow_mut() else {
                log::error!("[host] shell busy, dropping build for {}", ticket.generation);
                if let Ok(mut target) = result {
                    target.release();
                }
                return;
            };
            let now = s.now_ms();
            if let Err(e) = s.supervisor.complete_init(ticket.generation, result, now) {
                log::warn!("[host] {}", e);
            }
        });
    }

    fn attach_listeners(&mut self) {
        if let Err(e) = self.register_all() {
            log::error!("[host] listener registration incomplete: {:#}", e);
        }
        log::info!("[host] {} listeners attached", self.listeners.len());
    }

    fn detach_listeners(&mut self) {
        let n = self.listeners.len();
        self.listeners.clear();
        log::info!("[host] {} listeners removed", n);
    }

    fn request_frame(&mut self) {
        self.frames.request();
    }

    fn cancel_frame(&mut self) {
        self.frames.cancel();
    }

    fn signal_ready(&mut self) {
        dom::set_ready(&self.container, true);
    }
}
