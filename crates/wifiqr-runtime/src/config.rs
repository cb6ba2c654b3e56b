//! Engine configuration

use std::time::Duration;

/// Association engine configuration
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Scan/associate cycles per attempt
    pub max_association_retries: u32,
    /// Scans per cycle while the interface reports busy
    pub max_scan_retries: u32,
    /// Backoff before the first retry; doubles per retry
    pub initial_backoff: Duration,
    /// Jitter is drawn from `[0, jitter_fraction × backoff]`
    pub jitter_fraction: f64,
    /// Busy-scan delay unit
    pub scan_retry_step: Duration,
    /// Hard cap on a permission request
    pub permission_timeout: Duration,
    /// Pause before resuming a deferred attempt
    pub resume_delay: Duration,
    /// Progress events buffered per subscriber
    pub event_capacity: usize,
    /// Fixed jitter seed, for reproducible runs
    pub jitter_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_association_retries: 5,
            max_scan_retries: 3,
            initial_backoff: Duration::from_millis(500),
            jitter_fraction: 0.3,
            scan_retry_step: Duration::from_millis(200),
            permission_timeout: Duration::from_secs(10),
            resume_delay: Duration::from_millis(500),
            event_capacity: 64,
            jitter_seed: None,
        }
    }
}

impl EngineConfig {
    /// Scan/associate cycles per attempt; at least one
    pub fn with_max_association_retries(mut self, retries: u32) -> Self {
        self.max_association_retries = retries;
        self
    }

    pub fn with_max_scan_retries(mut self, retries: u32) -> Self {
        self.max_scan_retries = retries;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Clamped to `[0, 1]` by [`sanitized`](Self::sanitized)
    pub fn with_jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }

    pub fn with_permission_timeout(mut self, timeout: Duration) -> Self {
        self.permission_timeout = timeout;
        self
    }

    pub fn with_resume_delay(mut self, delay: Duration) -> Self {
        self.resume_delay = delay;
        self
    }

    /// Make backoff jitter deterministic
    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }

    /// Clamp values the loop cannot work with
    pub fn sanitized(mut self) -> Self {
        self.max_association_retries = self.max_association_retries.max(1);
        self.max_scan_retries = self.max_scan_retries.max(1);
        self.jitter_fraction = if self.jitter_fraction.is_finite() {
            self.jitter_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.event_capacity = self.event_capacity.max(1);
        self
    }
}
