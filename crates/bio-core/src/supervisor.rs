//! Render loop supervision and session lifecycle.
//!
//! ```text
//! Uninitialized -> Initializing -> Running <-> Suspended -> TornDown
//!                       |                                     |
//!                       +---------(build failed)------------->+
//! TornDown -> Initializing   (reset, next generation)
//! ```
//!
//! The supervisor owns the host and the single live session. Platform events
//! are fed in through the `on_*` methods; platform effects go out through the
//! `Host` trait.

use crate::constants::IDLE_THRESHOLD_SECS;
use crate::field::ParticleField;
use crate::host::{DrawError, DrawTarget, Generation, Host, InitTicket};
use crate::session::Session;
use crate::tier::{detect, QualityTier, Viewport};
use crate::watchdog::{Verdict, Watchdog, WatchdogConfig};
use rand::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Initializing,
    Running,
    Suspended,
    TornDown,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SupervisorConfig {
    /// `None` disables stall detection.
    pub watchdog: Option<WatchdogConfig>,
    pub idle_threshold_secs: f32,
    /// Skip detection and use this tier.
    pub forced_tier: Option<QualityTier>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            watchdog: Some(WatchdogConfig::default()),
            idle_threshold_secs: IDLE_THRESHOLD_SECS,
            forced_tier: None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LifecycleError {
    #[error("initialization of {0} is still pending")]
    InitPending(Generation),
    #[error("session {0} is already mounted")]
    AlreadyMounted(Generation),
    #[error("build result for {stale} discarded, current generation is {current}")]
    StaleGeneration {
        stale: Generation,
        current: Generation,
    },
    #[error("build result for {0} discarded, no initialization pending")]
    NotInitializing(Generation),
    #[error("draw target build failed: {0}")]
    BuildFailed(String),
}

pub struct Supervisor<H: Host> {
    host: H,
    config: SupervisorConfig,
    state: LoopState,
    generation: Generation,
    pending: Option<InitTicket>,
    session: Option<Session<H::Target>>,
    frame_pending: bool,
    watchdog: Option<Watchdog>,
    restarts: u64,
    rng: StdRng,
}

impl<H: Host> Supervisor<H> {
    pub fn new(host: H, config: SupervisorConfig) -> Self {
        Self {
            host,
            config,
            state: LoopState::Uninitialized,
            generation: Generation::default(),
            pending: None,
            session: None,
            frame_pending: false,
            watchdog: None,
            restarts: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the entropy-seeded generator, e.g. for reproducible fields.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn session(&self) -> Option<&Session<H::Target>> {
        self.session.as_ref()
    }

    pub fn tier(&self) -> Option<QualityTier> {
        self.session
            .as_ref()
            .map(|s| s.tier())
            .or(self.pending.map(|t| t.tier))
    }

    pub fn frame_count(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.frame_count())
    }

    /// Number of watchdog-forced loop restarts.
    #[inline]
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    #[inline]
    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // ---------------- lifecycle ----------------

    pub fn mount(&mut self) -> Result<Generation, LifecycleError> {
        match self.state {
            LoopState::Initializing => Err(LifecycleError::InitPending(self.generation)),
            LoopState::Running | LoopState::Suspended => {
                Err(LifecycleError::AlreadyMounted(self.generation))
            }
            LoopState::Uninitialized | LoopState::TornDown => {
                self.begin_generation();
                Ok(self.generation)
            }
        }
    }

    /// Tear down the current generation completely, then start the next one.
    pub fn reset(&mut self) -> Generation {
        log::info!("[supervisor] reset requested at {}", self.generation);
        self.teardown();
        self.begin_generation();
        self.generation
    }

    fn begin_generation(&mut self) {
        self.generation = self.generation.next();
        let viewport = self.host.viewport();
        let tier = self.config.forced_tier.unwrap_or_else(|| detect(&viewport));
        log::info!(
            "[supervisor] initializing {} tier={:?} viewport={}x{}@{}",
            self.generation,
            tier,
            viewport.width,
            viewport.height,
            viewport.pixel_ratio
        );
        let ticket = InitTicket {
            generation: self.generation,
            tier,
            viewport,
        };
        self.pending = Some(ticket);
        self.state = LoopState::Initializing;
        self.host.begin_build(ticket);
    }

    /// Deliver the outcome of `Host::begin_build`. Results for any generation
    /// other than the pending one are released and rejected.
    pub fn complete_init(
        &mut self,
        generation: Generation,
        result: anyhow::Result<H::Target>,
        now_ms: f64,
    ) -> Result<(), LifecycleError> {
        let ticket = match self.pending {
            Some(t) if t.generation == generation => t,
            _ => {
                if let Ok(mut target) = result {
                    target.release();
                }
                log::warn!(
                    "[supervisor] discarding late build for {} (current {})",
                    generation,
                    self.generation
                );
                return Err(if generation != self.generation {
                    LifecycleError::StaleGeneration {
                        stale: generation,
                        current: self.generation,
                    }
                } else {
                    LifecycleError::NotInitializing(generation)
                });
            }
        };
        self.pending = None;

        let target = match result {
            Ok(t) => t,
            Err(e) => {
                log::error!("[supervisor] {} unavailable, running without background: {:#}", generation, e);
                self.state = LoopState::TornDown;
                return Err(LifecycleError::BuildFailed(format!("{:#}", e)));
            }
        };

        let field = ParticleField::build(ticket.tier, &mut self.rng);
        let visible = self.host.is_visible();
        let mut session = Session::new(
            generation,
            ticket.tier,
            target,
            field,
            self.host.viewport(),
            visible,
            now_ms,
        );
        session.pointer.idle_threshold = self.config.idle_threshold_secs;
        log::info!(
            "[supervisor] {} ready: {} layers, {} particles",
            generation,
            session.layers().len(),
            session.layers().iter().map(|m| m.layer.count).sum::<usize>()
        );
        self.session = Some(session);
        self.host.attach_listeners();
        self.watchdog = self.config.watchdog.map(|c| Watchdog::new(c, now_ms, 0));
        if visible {
            self.state = LoopState::Running;
            self.request_frame();
        } else {
            self.state = LoopState::Suspended;
        }
        Ok(())
    }

    /// Release everything owned by the current generation. Safe to repeat.
    pub fn teardown(&mut self) {
        match self.state {
            LoopState::TornDown => return,
            LoopState::Uninitialized => {}
            LoopState::Initializing => {
                self.pending = None;
            }
            LoopState::Running | LoopState::Suspended => {
                self.cancel_frame();
                self.host.detach_listeners();
                if let Some(session) = self.session.take() {
                    session.release();
                }
                self.watchdog = None;
            }
        }
        log::info!("[supervisor] {} torn down", self.generation);
        self.state = LoopState::TornDown;
    }

    // ---------------- frame loop ----------------

    fn request_frame(&mut self) {
        if !self.frame_pending {
            self.host.request_frame();
            self.frame_pending = true;
        }
    }

    fn cancel_frame(&mut self) {
        if self.frame_pending {
            self.host.cancel_frame();
            self.frame_pending = false;
        }
    }

    /// Frame callback. Exits without drawing unless a session is running.
    pub fn on_frame(&mut self, now_ms: f64) {
        self.frame_pending = false;
        if self.state != LoopState::Running {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.advance(now_ms);
        match session.render() {
            Ok(()) if !session.ready_signaled => {
                session.ready_signaled = true;
                self.host.signal_ready();
            }
            Ok(()) => {}
            Err(DrawError::ContextLost) => {
                self.on_context_lost();
                return;
            }
            Err(e) => log::warn!("[supervisor] draw failed: {}", e),
        }
        self.request_frame();
    }

    pub fn on_visibility_change(&mut self, visible: bool, now_ms: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.visible = visible;
        match (self.state, visible) {
            (LoopState::Running, false) => {
                log::info!("[supervisor] page hidden, suspending");
                self.cancel_frame();
                self.state = LoopState::Suspended;
            }
            (LoopState::Suspended, true) => {
                log::info!("[supervisor] page visible, resuming");
                session.reset_clock();
                let frame = session.frame_count();
                if let Some(w) = self.watchdog.as_mut() {
                    w.rearm(now_ms, frame);
                }
                self.state = LoopState::Running;
                self.request_frame();
            }
            _ => {}
        }
    }

    /// Graphics context gone: suspend, then rebuild from scratch.
    pub fn on_context_lost(&mut self) -> Option<Generation> {
        match self.state {
            LoopState::Running | LoopState::Suspended => {
                log::warn!("[supervisor] graphics context lost at {}, forcing reset", self.generation);
                self.cancel_frame();
                self.state = LoopState::Suspended;
                Some(self.reset())
            }
            _ => None,
        }
    }

    /// Periodic liveness check; call at least once per watchdog interval.
    pub fn on_watchdog(&mut self, now_ms: f64) {
        match self.state {
            LoopState::Running => {}
            LoopState::Suspended => {
                // visibility event may have been missed
                let page_visible = self.host.is_visible();
                if page_visible && self.session.as_ref().is_some_and(|s| !s.visible) {
                    self.on_visibility_change(true, now_ms);
                }
                return;
            }
            _ => return,
        }
        let (Some(session), Some(watchdog)) = (self.session.as_mut(), self.watchdog.as_mut()) else {
            return;
        };
        if watchdog.poll(now_ms, session.frame_count(), session.visible) == Verdict::Stalled {
            log::warn!(
                "[supervisor] animation frozen at frame {}, restarting loop",
                session.frame_count()
            );
            session.reset_clock();
            self.host.cancel_frame();
            self.frame_pending = false;
            self.restarts += 1;
            self.request_frame();
        }
    }

    // ---------------- input ----------------

    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        if let Some(s) = self.session.as_mut() {
            s.pointer.on_move(x, y);
        }
    }

    pub fn on_pointer_leave(&mut self) {
        if let Some(s) = self.session.as_mut() {
            s.pointer.on_leave();
        }
    }

    /// Updates projection and pointer normalization in place; no new session.
    pub fn on_resize(&mut self, viewport: Viewport) {
        if let Some(s) = self.session.as_mut() {
            s.resize(viewport);
        }
    }
}
