//! Exponential backoff with jitter

use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::EngineConfig;

/// Largest doubling applied to the initial backoff
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Delay schedule for the retry loop
pub struct Backoff {
    initial: Duration,
    jitter_fraction: f64,
    scan_step: Duration,
    rng: Mutex<StdRng>,
}

impl Backoff {
    pub fn new(config: &EngineConfig) -> Self {
        let config = config.clone().sanitized();
        let rng = match config.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Backoff {
            initial: config.initial_backoff,
            jitter_fraction: config.jitter_fraction,
            scan_step: config.scan_retry_step,
            rng: Mutex::new(rng),
        }
    }

    /// `initial × 2^(retry-1)` for 1-based `retry`
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.initial.saturating_mul(1 << exponent)
    }

    /// Base delay plus jitter drawn uniformly from `[0, fraction × base]`
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        let factor: f64 = self.rng.lock().gen_range(0.0..=self.jitter_fraction);
        base + base.mul_f64(factor)
    }

    /// Pause before re-scanning a busy interface
    pub fn scan_delay(&self, scan_attempt: u32, retry: u32) -> Duration {
        self.scan_step.saturating_mul(scan_attempt.saturating_add(retry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn backoff(seed: u64) -> Backoff {
        Backoff::new(&EngineConfig::default().with_jitter_seed(seed))
    }

    #[test]
    fn test_base_delay_doubles() {
        let backoff = backoff(1);
        assert_eq!(backoff.base_delay(1), Duration::from_millis(500));
        assert_eq!(backoff.base_delay(2), Duration::from_millis(1000));
        assert_eq!(backoff.base_delay(3), Duration::from_millis(2000));
        assert_eq!(backoff.base_delay(4), Duration::from_millis(4000));
    }

    #[test]
    fn test_jitter_bounds() {
        let backoff = backoff(7);
        for retry in 1..=4 {
            let base = backoff.base_delay(retry);
            for _ in 0..100 {
                let delay = backoff.delay(retry);
                assert!(delay >= base);
                assert!(delay <= base + base.mul_f64(0.3));
            }
        }
    }

    #[test]
    fn test_no_jitter() {
        let config = EngineConfig::default().with_jitter_fraction(0.0);
        let backoff = Backoff::new(&config);
        assert_eq!(backoff.delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = backoff(99);
        let b = backoff(99);
        for retry in 1..=4 {
            assert_eq!(a.delay(retry), b.delay(retry));
        }
    }

    #[test]
    fn test_scan_delay() {
        let backoff = backoff(1);
        assert_eq!(backoff.scan_delay(1, 0), Duration::from_millis(200));
        assert_eq!(backoff.scan_delay(2, 3), Duration::from_millis(1000));
    }

    #[test]
    fn test_large_retry_saturates() {
        let backoff = backoff(1);
        assert_eq!(backoff.base_delay(100), backoff.base_delay(17));
    }

    proptest! {
        #[test]
        fn prop_delays_strictly_increase(seed in any::<u64>()) {
            let backoff = backoff(seed);
            let mut previous = Duration::ZERO;
            for retry in 1..=8 {
                let delay = backoff.delay(retry);
                prop_assert!(delay > previous);
                previous = delay;
            }
        }
    }
}
