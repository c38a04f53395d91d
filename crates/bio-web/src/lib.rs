#![cfg(target_arch = "wasm32")]
//! Browser entry point: mounts the particle background behind the page.

mod dom;
mod events;
mod frame;
mod host;
mod input;

use bio_core::{Supervisor, SupervisorConfig};
use host::WebHost;
use instant::Instant;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;

pub(crate) struct Shell {
    pub(crate) supervisor: Supervisor<WebHost>,
    epoch: Instant,
}

impl Shell {
    /// Milliseconds since mount; the single time base for frames, the
    /// watchdog and visibility changes.
    pub(crate) fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

thread_local! {
    static SHELL: RefCell<Option<Rc<RefCell<Shell>>>> = const { RefCell::new(None) };
}

/// Run `f` against the live shell. Skips (returns `None`) when the shell is
/// gone or already borrowed further up the stack.
pub(crate) fn with_shell<R>(
    shell: &Weak<RefCell<Shell>>,
    f: impl FnOnce(&mut Shell) -> R,
) -> Option<R> {
    let shell = shell.upgrade()?;
    let mut guard = match shell.try_borrow_mut() {
        Ok(g) => g,
        Err(_) => {
            log::debug!("[shell] busy, event skipped");
            return None;
        }
    };
    Some(f(&mut guard))
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("bio-web starting");

    if let Err(e) = mount() {
        // the page keeps working without a background
        log::error!("mount error: {:#}", e);
    }
    Ok(())
}

fn mount() -> anyhow::Result<()> {
    if SHELL.with(|s| s.borrow().is_some()) {
        log::warn!("[shell] already mounted; ignoring");
        return Ok(());
    }
    let (window, document) =
        dom::window_document().ok_or_else(|| anyhow::anyhow!("no window/document"))?;
    let container = dom::ensure_container(&document)?;

    let shell = Rc::new_cyclic(|weak: &Weak<RefCell<Shell>>| {
        let host = WebHost::new(weak.clone(), window, document.clone(), container);
        RefCell::new(Shell {
            supervisor: Supervisor::new(host, SupervisorConfig::default()),
            epoch: Instant::now(),
        })
    });

    let weak = Rc::downgrade(&shell);
    dom::ensure_reset_button(&document, move || {
        with_shell(&weak, |s| {
            let generation = s.supervisor.reset();
            log::info!("[shell] manual reset to {}", generation);
        });
    })?;

    let generation = shell.borrow_mut().supervisor.mount()?;
    log::info!("[shell] mounted, building {}", generation);
    SHELL.with(|s| *s.borrow_mut() = Some(shell));
    Ok(())
}

/// Tear the background down and rebuild it under a new generation.
#[wasm_bindgen(js_name = resetBackground)]
pub fn reset_background() {
    SHELL.with(|s| {
        if let Some(shell) = s.borrow().as_ref() {
            with_shell(&Rc::downgrade(shell), |s| {
                s.supervisor.reset();
            });
        }
    });
}

/// Remove every listener, frame request and canvas. Safe to call repeatedly.
#[wasm_bindgen(js_name = unmountBackground)]
pub fn unmount_background() {
    let shell = SHELL.with(|s| s.borrow_mut().take());
    if let Some(shell) = shell {
        with_shell(&Rc::downgrade(&shell), |s| {
            s.supervisor.teardown();
            dom::set_ready(s.supervisor.host().container(), false);
        });
    }
}
