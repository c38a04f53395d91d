//! Per-generation listener registry.
//!
//! Every closure a generation hands to the browser is kept here so teardown
//! can remove it again.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::input;

enum Registration {
    Event {
        target: web::EventTarget,
        kind: &'static str,
        closure: Closure<dyn FnMut(web::Event)>,
    },
    Interval {
        window: web::Window,
        handle: i32,
        _closure: Closure<dyn FnMut()>,
    },
}

impl Registration {
    fn remove(self) {
        match self {
            Registration::Event {
                target,
                kind,
                closure,
            } => {
                let f: &js_sys::Function = closure.as_ref().unchecked_ref();
                if let Err(e) = target.remove_event_listener_with_callback(kind, f) {
                    log::warn!("[events] failed to remove {} listener: {:?}", kind, e);
                }
            }
            Registration::Interval { window, handle, .. } => {
                window.clear_interval_with_handle(handle);
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Vec<Registration>,
}

impl ListenerRegistry {
    pub fn listen(
        &mut self,
        target: &web::EventTarget,
        kind: &'static str,
        handler: impl FnMut(web::Event) + 'static,
    ) -> anyhow::Result<()> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web::Event)>);
        let options = web::AddEventListenerOptions::new();
        options.set_passive(input::is_passive(kind));
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(|e| anyhow::anyhow!(format!("add {} listener: {:?}", kind, e)))?;
        self.entries.push(Registration::Event {
            target: target.clone(),
            kind,
            closure,
        });
        Ok(())
    }

    pub fn every(
        &mut self,
        window: &web::Window,
        interval_ms: i32,
        handler: impl FnMut() + 'static,
    ) -> anyhow::Result<()> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut()>);
        let handle = window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                interval_ms,
            )
            .map_err(|e| anyhow::anyhow!(format!("setInterval: {:?}", e)))?;
        self.entries.push(Registration::Interval {
            window: window.clone(),
            handle,
            _closure: closure,
        });
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        for entry in self.entries.drain(..) {
            entry.remove();
        }
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
