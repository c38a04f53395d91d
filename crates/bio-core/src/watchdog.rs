use crate::constants::{WATCHDOG_INTERVAL_MS, WATCHDOG_SLACK_MS};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WatchdogConfig {
    pub interval_ms: f64,
    /// A check counts once `interval_ms - slack_ms` has passed.
    pub slack_ms: f64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval_ms: WATCHDOG_INTERVAL_MS,
            slack_ms: WATCHDOG_SLACK_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Interval not yet elapsed.
    Pending,
    Healthy,
    Stalled,
}

/// Liveness check on the frame counter.
///
/// Each check compares the counter against the value seen at the previous
/// check; no progress while visible is a stall.
#[derive(Clone, Debug)]
pub struct Watchdog {
    config: WatchdogConfig,
    last_check_ms: f64,
    last_frame: u64,
}

impl Watchdog {
    pub fn new(config: WatchdogConfig, now_ms: f64, frame: u64) -> Self {
        Self {
            config,
            last_check_ms: now_ms,
            last_frame: frame,
        }
    }

    pub fn rearm(&mut self, now_ms: f64, frame: u64) {
        self.last_check_ms = now_ms;
        self.last_frame = frame;
    }

    pub fn poll(&mut self, now_ms: f64, frame: u64, visible: bool) -> Verdict {
        if now_ms - self.last_check_ms < self.config.interval_ms - self.config.slack_ms {
            return Verdict::Pending;
        }
        let stalled = frame == self.last_frame && visible;
        self.rearm(now_ms, frame);
        if stalled {
            Verdict::Stalled
        } else {
            Verdict::Healthy
        }
    }
}
