//! Randomized waits to keep concurrent clients from retrying in lockstep.

use std::time::Duration;

use super::{duration_from_nanos_f64, max_wait_nanos, Policy};

/// Redraws the inner policy's wait uniformly from `[w * (1 - factor), w * (1 + factor)]`.
///
/// Zero and [`STOP`](super::STOP) pass through untouched. The upper bound is
/// clamped to [`MAX_WAIT`](super::MAX_WAIT) before sampling, and the sample
/// covers whole nanoseconds with both ends reachable.
///
/// This is the one policy that is not a pure function of its arguments: it
/// reads from `rand`'s thread-local generator, which is safe to share.
///
/// # Examples
///
/// ```rust
/// use undertow::policy::{Constant, Randomize};
/// use undertow::Policy;
/// use std::time::Duration;
///
/// let policy = Randomize::new(0.5, Constant(Duration::from_secs(60)));
/// let wait = policy.wait(1, Duration::ZERO).unwrap();
/// assert!(wait >= Duration::from_secs(30) && wait <= Duration::from_secs(90));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Randomize<P> {
    /// Relative spread, in `[0, 1]`.
    pub factor: f64,
    /// Policy whose waits are randomized.
    pub inner: P,
}

impl<P> Randomize<P> {
    /// Wrap `inner` with `±factor` jitter. `factor` is clamped into `[0, 1]`.
    pub fn new(factor: f64, inner: P) -> Self {
        Self {
            factor: clamp_factor(factor),
            inner,
        }
    }
}

impl<P: Policy> Policy for Randomize<P> {
    fn wait(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        let wait = self.inner.wait(attempts, elapsed)?;
        if wait.is_zero() {
            return Some(wait);
        }

        let factor = clamp_factor(self.factor);
        let nanos = wait.as_nanos() as f64;
        let min = (nanos * (1.0 - factor)).floor();
        let max = (nanos * (1.0 + factor)).min(max_wait_nanos()).floor();

        // The +1 makes `max` itself reachable once the draw is truncated:
        // for [1, 3] each of 1, 2 and 3 gets a third of the probability.
        let drawn = min + rand::random::<f64>() * (max - min + 1.0);
        Some(duration_from_nanos_f64(drawn.min(max)))
    }
}

fn clamp_factor(factor: f64) -> f64 {
    if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Constant, Immediate, LimitAttempts, Max, MAX_WAIT, STOP};

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_randomize_stays_in_range() {
        let policy = Randomize::new(0.5, Constant(MINUTE));
        for _ in 0..1000 {
            let wait = policy.wait(1, Duration::ZERO).unwrap();
            assert!(wait >= Duration::from_secs(30), "{wait:?} below range");
            assert!(wait <= Duration::from_secs(90), "{wait:?} above range");
        }
    }

    #[test]
    fn test_randomize_overflow_clamped() {
        let policy = Randomize::new(0.5, Constant(MAX_WAIT));
        for _ in 0..100 {
            let wait = policy.wait(1, Duration::ZERO).unwrap();
            assert!(wait >= MAX_WAIT / 3);
        }
    }

    #[test]
    fn test_randomize_passes_stop() {
        let policy = Randomize::new(0.5, LimitAttempts::new(1, Constant(MINUTE)));
        assert_eq!(policy.wait(1, Duration::ZERO), STOP);
    }

    #[test]
    fn test_randomize_passes_zero() {
        let policy = Randomize::new(1.0, Immediate);
        assert_eq!(policy.wait(1, Duration::ZERO), Some(Duration::ZERO));
    }

    #[test]
    fn test_randomize_zero_factor_is_identity() {
        let policy = Randomize::new(0.0, Constant(MINUTE));
        assert_eq!(policy.wait(1, Duration::ZERO), Some(MINUTE));
    }

    #[test]
    fn test_randomize_small_range_is_uniform() {
        // [1ns, 3ns]
        let policy = Randomize::new(0.5, Constant(Duration::from_nanos(2)));
        let mut hits = [0u32; 4];
        for _ in 0..30_000 {
            let wait = policy.wait(1, Duration::ZERO).unwrap();
            hits[wait.as_nanos() as usize] += 1;
        }

        assert_eq!(hits[0], 0);
        for (nanos, count) in hits.iter().enumerate().skip(1) {
            assert!(
                (7_500..=12_600).contains(count),
                "{nanos}ns drawn {count} times out of 30000"
            );
        }
    }

    #[test]
    fn test_factor_clamped() {
        assert_eq!(Randomize::new(2.5, Immediate).factor, 1.0);
        assert_eq!(Randomize::new(-1.0, Immediate).factor, 0.0);
        assert_eq!(Randomize::new(f64::NAN, Immediate).factor, 0.0);
    }

    #[test]
    fn test_composition_order_matters() {
        let cap = Duration::from_secs(45);

        let clamp_after_jitter = Max::new(cap, Randomize::new(0.5, Constant(MINUTE)));
        let jitter_after_clamp = Randomize::new(0.5, Max::new(cap, Constant(MINUTE)));

        let mut above_cap = false;
        for _ in 0..1000 {
            assert!(clamp_after_jitter.wait(1, Duration::ZERO).unwrap() <= cap);
            let wait = jitter_after_clamp.wait(1, Duration::ZERO).unwrap();
            assert!(wait <= cap + cap / 2);
            above_cap |= wait > cap;
        }
        assert!(above_cap, "jitter after clamping should exceed the cap");
    }
}
