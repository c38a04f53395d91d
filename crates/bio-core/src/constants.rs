// Shared tuning constants used by the core and both frontends.

// Capability detection (CSS pixel area thresholds)
pub const MEDIUM_AREA_THRESHOLD: f64 = 2_073_600.0; // ~1920x1080
pub const LOW_AREA_THRESHOLD: f64 = 3_686_400.0; // ~2560x1440

// Particle counts per tier: (foreground, back)
pub const HIGH_COUNTS: (usize, usize) = (800, 400);
pub const MEDIUM_COUNTS: (usize, usize) = (600, 300);
pub const LOW_COUNTS: (usize, usize) = (300, 150);
pub const BACKGROUND_COUNT_FACTOR: f32 = 0.7; // background layer = back * factor

// Field shape
pub const FIELD_RADIUS: f32 = 100.0;
pub const SPEED_MIN: f32 = 0.7;
pub const SPEED_MAX: f32 = 1.3;
pub const SCALE_MIN: f32 = 0.5;
pub const SCALE_MAX: f32 = 2.0;

// Sprite
pub const SPRITE_SIZE: u32 = 32;
pub const SPRITE_ALPHA_STOPS: [(f32, f32); 4] = [(0.0, 1.0), (0.2, 0.8), (0.5, 0.3), (1.0, 0.0)];

// Simulation
pub const DEPTH_DISTANCE_DIVISOR: f32 = 50.0;
pub const DEPTH_FACTOR_MAX: f32 = 2.0;
pub const POINTER_PARALLAX: f32 = 20.0;
pub const WAVE_DIST_FREQ_XY: f32 = 0.05;
pub const WAVE_DIST_FREQ_Z: f32 = 0.1;

// Pointer
pub const IDLE_THRESHOLD_SECS: f32 = 3.0;
pub const POINTER_FOLLOW_RATE: f32 = 8.0;
pub const POINTER_FOLLOW_MAX: f32 = 0.2;
pub const DRIFT_FREQ_X: f64 = 0.0005; // per millisecond
pub const DRIFT_FREQ_Y: f64 = 0.0004;
pub const DRIFT_AMP_X: f32 = 0.3;
pub const DRIFT_AMP_Y: f32 = 0.2;

// Camera
pub const CAMERA_Z: f32 = 60.0;
pub const CAMERA_FOVY_DEG: f32 = 65.0;
pub const CAMERA_ZNEAR: f32 = 0.1;
pub const CAMERA_ZFAR: f32 = 1000.0;
pub const CAMERA_PARALLAX: f32 = 15.0;
pub const CAMERA_FOLLOW_RATE: f32 = 3.0;
pub const CAMERA_FOLLOW_MAX: f32 = 0.1;

// Supervision
pub const WATCHDOG_INTERVAL_MS: f64 = 5_000.0;
/// Repeating timers fire up to this much early relative to the last tick.
pub const WATCHDOG_SLACK_MS: f64 = 500.0;
