// Host-side tests for the render loop supervisor, driven through a recording
// host and a scriptable draw target.

use bio_core::*;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Default)]
struct TargetStats {
    draws: Cell<usize>,
    releases: Cell<usize>,
    resizes: RefCell<Vec<Viewport>>,
}

struct MockTarget {
    stats: Rc<TargetStats>,
    /// `add_layer` fails for these call indices.
    failing_layers: Vec<usize>,
    layers_added: usize,
    lose_context: Rc<Cell<bool>>,
    surface_broken: Rc<Cell<bool>>,
}

impl MockTarget {
    fn new() -> (Self, Rc<TargetStats>) {
        let stats = Rc::new(TargetStats::default());
        (
            Self {
                stats: stats.clone(),
                failing_layers: Vec::new(),
                layers_added: 0,
                lose_context: Rc::new(Cell::new(false)),
                surface_broken: Rc::new(Cell::new(false)),
            },
            stats,
        )
    }
}

impl DrawTarget for MockTarget {
    fn load_sprite(&mut self, _sprite: &Sprite) -> Result<(), DrawError> {
        Ok(())
    }

    fn add_layer(&mut self, _layer: &ParticleLayer) -> Result<LayerSlot, DrawError> {
        let index = self.layers_added;
        self.layers_added += 1;
        if self.failing_layers.contains(&index) {
            return Err(DrawError::Resource("buffer allocation".into()));
        }
        Ok(LayerSlot(index))
    }

    fn resize(&mut self, viewport: Viewport) {
        self.stats.resizes.borrow_mut().push(viewport);
    }

    fn draw(&mut self, _camera: &Camera, _layers: &[MountedLayer]) -> Result<(), DrawError> {
        if self.lose_context.get() {
            return Err(DrawError::ContextLost);
        }
        if self.surface_broken.get() {
            return Err(DrawError::Surface("outdated".into()));
        }
        self.stats.draws.set(self.stats.draws.get() + 1);
        Ok(())
    }

    fn release(&mut self) {
        self.stats.releases.set(self.stats.releases.get() + 1);
    }
}

struct MockHost {
    viewport: Viewport,
    visible: bool,
    builds: Vec<InitTicket>,
    listeners: usize,
    detach_calls: usize,
    frames_requested: usize,
    frames_cancelled: usize,
    ready_signals: usize,
}

impl MockHost {
    fn new() -> Self {
        Self {
            viewport: Viewport::new(1280.0, 720.0, 2.0),
            visible: true,
            builds: Vec::new(),
            listeners: 0,
            detach_calls: 0,
            frames_requested: 0,
            frames_cancelled: 0,
            ready_signals: 0,
        }
    }
}

impl Host for MockHost {
    type Target = MockTarget;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn begin_build(&mut self, ticket: InitTicket) {
        self.builds.push(ticket);
    }

    fn attach_listeners(&mut self) {
        self.listeners += 1;
    }

    fn detach_listeners(&mut self) {
        self.detach_calls += 1;
        self.listeners = self.listeners.saturating_sub(1);
    }

    fn request_frame(&mut self) {
        self.frames_requested += 1;
    }

    fn cancel_frame(&mut self) {
        self.frames_cancelled += 1;
    }

    fn signal_ready(&mut self) {
        self.ready_signals += 1;
    }
}

fn supervisor(config: SupervisorConfig) -> Supervisor<MockHost> {
    Supervisor::new(MockHost::new(), config).with_rng(StdRng::seed_from_u64(42))
}

/// Mount and complete the first generation; returns the target's stats.
fn running(sup: &mut Supervisor<MockHost>) -> Rc<TargetStats> {
    let generation = sup.mount().expect("mount");
    let (target, stats) = MockTarget::new();
    sup.complete_init(generation, Ok(target), 0.0).expect("init");
    stats
}

#[test]
fn mount_requests_a_build_with_detected_tier() {
    let mut sup = supervisor(SupervisorConfig::default());
    assert_eq!(sup.state(), LoopState::Uninitialized);
    let generation = sup.mount().expect("mount");
    assert_eq!(generation, Generation(1));
    assert_eq!(sup.state(), LoopState::Initializing);
    assert_eq!(sup.host().builds.len(), 1);
    assert_eq!(sup.host().builds[0].tier, QualityTier::High);
    assert_eq!(sup.tier(), Some(QualityTier::High));
}

#[test]
fn second_mount_while_initializing_is_rejected() {
    let mut sup = supervisor(SupervisorConfig::default());
    sup.mount().expect("mount");
    assert_eq!(sup.mount(), Err(LifecycleError::InitPending(Generation(1))));
    assert_eq!(sup.host().builds.len(), 1);
}

#[test]
fn mount_while_running_is_rejected() {
    let mut sup = supervisor(SupervisorConfig::default());
    running(&mut sup);
    assert_eq!(sup.mount(), Err(LifecycleError::AlreadyMounted(Generation(1))));
}

#[test]
fn completed_init_runs_and_signals_ready_once() {
    let mut sup = supervisor(SupervisorConfig::default());
    let stats = running(&mut sup);
    assert_eq!(sup.state(), LoopState::Running);
    assert_eq!(sup.host().listeners, 1);
    assert!(sup.is_frame_pending());
    assert_eq!(sup.session().map(|s| s.layers().len()), Some(3));
    assert_eq!(stats.resizes.borrow()[0].pixel_ratio, 2.0);

    for i in 1..=3 {
        sup.on_frame(i as f64 * 16.0);
    }
    assert_eq!(sup.frame_count(), 3);
    assert_eq!(stats.draws.get(), 3);
    assert_eq!(sup.host().ready_signals, 1);
    assert_eq!(sup.host().frames_requested, 4);
}

#[test]
fn failed_first_draw_does_not_signal_ready() {
    let mut sup = supervisor(SupervisorConfig::default());
    let generation = sup.mount().expect("mount");
    let (target, stats) = MockTarget::new();
    let broken = target.surface_broken.clone();
    broken.set(true);
    sup.complete_init(generation, Ok(target), 0.0).expect("init");

    sup.on_frame(16.0);
    assert_eq!(stats.draws.get(), 0);
    assert_eq!(sup.host().ready_signals, 0);
    assert_eq!(sup.state(), LoopState::Running);
    assert!(sup.is_frame_pending());

    broken.set(false);
    sup.on_frame(32.0);
    sup.on_frame(48.0);
    assert_eq!(stats.draws.get(), 2);
    assert_eq!(sup.host().ready_signals, 1);
}

#[test]
fn teardown_is_idempotent() {
    let mut sup = supervisor(SupervisorConfig::default());
    let stats = running(&mut sup);
    sup.on_frame(16.0);

    sup.teardown();
    sup.teardown();
    assert_eq!(sup.state(), LoopState::TornDown);
    assert_eq!(sup.host().listeners, 0);
    assert_eq!(sup.host().detach_calls, 1);
    assert_eq!(stats.releases.get(), 1);
    assert!(sup.session().is_none());
    assert!(!sup.is_frame_pending());
}

#[test]
fn frame_after_teardown_draws_nothing() {
    let mut sup = supervisor(SupervisorConfig::default());
    let stats = running(&mut sup);
    sup.teardown();
    let requested = sup.host().frames_requested;
    sup.on_frame(100.0);
    assert_eq!(stats.draws.get(), 0);
    assert_eq!(sup.host().frames_requested, requested);
}

#[test]
fn mount_after_teardown_starts_next_generation() {
    let mut sup = supervisor(SupervisorConfig::default());
    running(&mut sup);
    sup.teardown();
    assert_eq!(sup.mount(), Ok(Generation(2)));
}

#[test]
fn stalled_loop_is_restarted_exactly_once() {
    let mut sup = supervisor(SupervisorConfig::default());
    running(&mut sup);
    sup.on_frame(16.0);
    sup.on_frame(32.0);

    // counter moved since arming
    sup.on_watchdog(5_000.0);
    assert_eq!(sup.restarts(), 0);

    // frames stop arriving for a whole interval
    sup.on_watchdog(10_000.0);
    assert_eq!(sup.restarts(), 1);
    assert!(sup.is_frame_pending());

    sup.on_frame(10_016.0);
    sup.on_watchdog(15_000.0);
    assert_eq!(sup.restarts(), 1);
}

#[test]
fn stall_is_caught_on_an_early_interval_tick() {
    let mut sup = supervisor(SupervisorConfig::default());
    running(&mut sup);
    sup.on_frame(16.0);
    sup.on_watchdog(5_004.0);
    assert_eq!(sup.restarts(), 0);
    sup.on_watchdog(9_999.6);
    assert_eq!(sup.restarts(), 1);
}

#[test]
fn progressing_loop_is_left_alone() {
    let mut sup = supervisor(SupervisorConfig::default());
    running(&mut sup);
    let mut now = 0.0;
    for _ in 0..3 {
        for _ in 0..300 {
            now += 16.0;
            sup.on_frame(now);
        }
        sup.on_watchdog(now);
    }
    assert_eq!(sup.restarts(), 0);
}

#[test]
fn watchdog_checks_wait_for_interval() {
    let mut sup = supervisor(SupervisorConfig::default());
    running(&mut sup);
    sup.on_watchdog(1_000.0);
    sup.on_watchdog(4_000.0);
    assert_eq!(sup.restarts(), 0);
}

#[test]
fn disabled_watchdog_never_restarts() {
    let mut sup = supervisor(SupervisorConfig {
        watchdog: None,
        ..SupervisorConfig::default()
    });
    running(&mut sup);
    sup.on_watchdog(60_000.0);
    assert_eq!(sup.restarts(), 0);
}

#[test]
fn hidden_page_suspends_and_does_not_stall() {
    let mut sup = supervisor(SupervisorConfig::default());
    let stats = running(&mut sup);
    sup.on_frame(16.0);

    sup.host_mut().visible = false;
    sup.on_visibility_change(false, 20.0);
    assert_eq!(sup.state(), LoopState::Suspended);
    assert!(!sup.is_frame_pending());
    assert_eq!(sup.host().frames_cancelled, 1);

    sup.on_frame(40.0);
    assert_eq!(stats.draws.get(), 1);
    sup.on_watchdog(30_000.0);
    assert_eq!(sup.restarts(), 0);

    sup.host_mut().visible = true;
    sup.on_visibility_change(true, 31_000.0);
    assert_eq!(sup.state(), LoopState::Running);
    assert!(sup.is_frame_pending());
    sup.on_frame(31_016.0);
    assert_eq!(stats.draws.get(), 2);
    // watchdog was re-armed on resume
    sup.on_watchdog(32_000.0);
    assert_eq!(sup.restarts(), 0);
}

#[test]
fn init_on_hidden_page_starts_suspended() {
    let mut sup = supervisor(SupervisorConfig::default());
    sup.host_mut().visible = false;
    running(&mut sup);
    assert_eq!(sup.state(), LoopState::Suspended);
    assert!(!sup.is_frame_pending());
}

#[test]
fn watchdog_resumes_when_visibility_event_was_missed() {
    let mut sup = supervisor(SupervisorConfig::default());
    running(&mut sup);
    sup.on_visibility_change(false, 10.0);
    // page came back without an event
    sup.on_watchdog(6_000.0);
    assert_eq!(sup.state(), LoopState::Running);
    assert!(sup.is_frame_pending());
}

#[test]
fn stale_generation_results_are_released_and_ignored() {
    let mut sup = supervisor(SupervisorConfig::default());
    let first = sup.mount().expect("mount");
    let second = sup.reset();
    assert_eq!(second, Generation(2));

    let (current, _) = MockTarget::new();
    sup.complete_init(second, Ok(current), 0.0).expect("init");
    sup.on_frame(16.0);
    let snapshot: Vec<Vec<glam::Vec3>> = sup
        .session()
        .map(|s| s.layers().iter().map(|m| m.layer.current_positions.clone()).collect())
        .unwrap_or_default();

    let (late, late_stats) = MockTarget::new();
    let err = sup.complete_init(first, Ok(late), 20.0).unwrap_err();
    assert_eq!(
        err,
        LifecycleError::StaleGeneration {
            stale: first,
            current: second
        }
    );
    assert_eq!(late_stats.releases.get(), 1);
    assert_eq!(late_stats.draws.get(), 0);

    let session = sup.session().expect("session");
    assert_eq!(session.generation(), second);
    let after: Vec<Vec<glam::Vec3>> = session
        .layers()
        .iter()
        .map(|m| m.layer.current_positions.clone())
        .collect();
    assert_eq!(after, snapshot);
    assert_eq!(sup.host().listeners, 1);
}

#[test]
fn stale_result_before_current_completes_is_rejected() {
    let mut sup = supervisor(SupervisorConfig::default());
    let first = sup.mount().expect("mount");
    let second = sup.reset();
    let (late, late_stats) = MockTarget::new();
    assert!(sup.complete_init(first, Ok(late), 0.0).is_err());
    assert_eq!(late_stats.releases.get(), 1);
    assert_eq!(sup.state(), LoopState::Initializing);

    let (current, _) = MockTarget::new();
    sup.complete_init(second, Ok(current), 0.0).expect("init");
    assert_eq!(sup.state(), LoopState::Running);
}

#[test]
fn build_result_after_teardown_is_rejected() {
    let mut sup = supervisor(SupervisorConfig::default());
    let generation = sup.mount().expect("mount");
    sup.teardown();
    let (target, stats) = MockTarget::new();
    assert_eq!(
        sup.complete_init(generation, Ok(target), 0.0),
        Err(LifecycleError::NotInitializing(generation))
    );
    assert_eq!(stats.releases.get(), 1);
    assert_eq!(sup.host().listeners, 0);
}

#[test]
fn build_failure_leaves_page_without_background() {
    let mut sup = supervisor(SupervisorConfig::default());
    let generation = sup.mount().expect("mount");
    let err = sup
        .complete_init(generation, Err(anyhow::anyhow!("no adapter")), 0.0)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::BuildFailed(msg) if msg.contains("no adapter")));
    assert_eq!(sup.state(), LoopState::TornDown);
    assert_eq!(sup.host().listeners, 0);
    assert_eq!(sup.host().frames_requested, 0);
}

#[test]
fn failing_layer_is_omitted_from_the_session() {
    let mut sup = supervisor(SupervisorConfig::default());
    let generation = sup.mount().expect("mount");
    let (mut target, stats) = MockTarget::new();
    target.failing_layers = vec![1];
    sup.complete_init(generation, Ok(target), 0.0).expect("init");
    let kinds: Vec<LayerKind> = sup
        .session()
        .map(|s| s.layers().iter().map(|m| m.layer.kind).collect())
        .unwrap_or_default();
    assert_eq!(kinds, vec![LayerKind::Foreground, LayerKind::Background]);
    sup.on_frame(16.0);
    assert_eq!(stats.draws.get(), 1);
}

#[test]
fn context_loss_rebuilds_under_a_new_generation() {
    let mut sup = supervisor(SupervisorConfig::default());
    let generation = sup.mount().expect("mount");
    let (target, stats) = MockTarget::new();
    let lose = target.lose_context.clone();
    sup.complete_init(generation, Ok(target), 0.0).expect("init");
    sup.on_frame(16.0);

    lose.set(true);
    sup.on_frame(32.0);
    assert_eq!(sup.state(), LoopState::Initializing);
    assert_eq!(sup.generation(), Generation(2));
    assert_eq!(stats.releases.get(), 1);
    assert_eq!(sup.host().listeners, 0);
    assert_eq!(sup.host().builds.len(), 2);
    assert!(!sup.is_frame_pending());

    let (fresh, fresh_stats) = MockTarget::new();
    sup.complete_init(Generation(2), Ok(fresh), 40.0).expect("init");
    sup.on_frame(56.0);
    assert_eq!(fresh_stats.draws.get(), 1);
    assert_eq!(sup.host().listeners, 1);
    assert_eq!(sup.host().ready_signals, 2);
}

#[test]
fn context_loss_outside_a_session_is_ignored() {
    let mut sup = supervisor(SupervisorConfig::default());
    assert_eq!(sup.on_context_lost(), None);
    sup.mount().expect("mount");
    assert_eq!(sup.on_context_lost(), None);
    assert_eq!(sup.generation(), Generation(1));
}

#[test]
fn reset_tears_down_before_rebuilding() {
    let mut sup = supervisor(SupervisorConfig::default());
    let stats = running(&mut sup);
    let next = sup.reset();
    assert_eq!(next, Generation(2));
    assert_eq!(stats.releases.get(), 1);
    assert_eq!(sup.host().listeners, 0);
    assert_eq!(sup.state(), LoopState::Initializing);
    assert!(sup.session().is_none());
}

#[test]
fn resize_updates_pointer_mapping_in_place() {
    let mut sup = supervisor(SupervisorConfig::default());
    let stats = running(&mut sup);
    sup.on_resize(Viewport::new(800.0, 600.0, 3.0));
    sup.on_pointer_move(400.0, 300.0);
    let session = sup.session().expect("session");
    assert_eq!(session.generation(), Generation(1));
    assert_eq!(session.pointer.target, Vec2::ZERO);
    assert!((session.camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    // tier cap applied to the backing store
    let last = *stats.resizes.borrow().last().expect("resize");
    assert_eq!(last.pixel_ratio, 2.0);
}

#[test]
fn pointer_input_reaches_the_simulation() {
    let mut sup = supervisor(SupervisorConfig::default());
    running(&mut sup);
    sup.on_frame(0.0);
    sup.on_pointer_move(1280.0, 360.0);
    sup.on_frame(16.0);
    let session = sup.session().expect("session");
    assert!(session.pointer.active);
    assert!(session.pointer.current().x > 0.0);
    sup.on_pointer_leave();
    assert!(!sup.session().expect("session").pointer.active);
}

#[test]
fn forced_tier_overrides_detection() {
    let mut sup = supervisor(SupervisorConfig {
        forced_tier: Some(QualityTier::Low),
        ..SupervisorConfig::default()
    });
    running(&mut sup);
    assert_eq!(sup.tier(), Some(QualityTier::Low));
    let total: usize = sup
        .session()
        .map(|s| s.layers().iter().map(|m| m.layer.count).sum())
        .unwrap_or_default();
    assert_eq!(total, 300 + 150 + 105);
}
