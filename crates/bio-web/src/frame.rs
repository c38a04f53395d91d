use crate::{with_shell, Shell};
use std::cell::RefCell;
use std::rc::Weak;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

/// One reusable `requestAnimationFrame` callback plus the pending handle.
pub(crate) struct FrameScheduler {
    window: web::Window,
    tick: Closure<dyn FnMut()>,
    handle: Option<i32>,
}

impl FrameScheduler {
    pub fn new(window: web::Window, shell: Weak<RefCell<Shell>>) -> Self {
        let tick = Closure::wrap(Box::new(move || {
            with_shell(&shell, |s| {
                let now = s.now_ms();
                s.supervisor.on_frame(now);
            });
        }) as Box<dyn FnMut()>);
        Self {
            window,
            tick,
            handle: None,
        }
    }

    pub fn request(&mut self) {
        match self
            .window
            .request_animation_frame(self.tick.as_ref().unchecked_ref())
        {
            Ok(handle) => self.handle = Some(handle),
            Err(e) => log::error!("[frame] requestAnimationFrame failed: {:?}", e),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.window.cancel_animation_frame(handle);
        }
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
