//! Base policies: the ones that produce a wait from nothing.

use std::time::Duration;

use super::{duration_from_nanos_f64, max_wait_nanos, Policy, MAX_WAIT};

/// Always retries immediately.
///
/// On its own this retries forever; pair it with [`LimitAttempts`](super::LimitAttempts)
/// or [`LimitTotal`](super::LimitTotal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Immediate;

impl Policy for Immediate {
    fn wait(&self, _attempts: u32, _elapsed: Duration) -> Option<Duration> {
        Some(Duration::ZERO)
    }
}

/// Always waits the same fixed duration.
///
/// # Examples
///
/// ```rust
/// use undertow::policy::Constant;
/// use undertow::Policy;
/// use std::time::Duration;
///
/// let policy = Constant(Duration::from_millis(500));
/// assert_eq!(policy.wait(1, Duration::ZERO), Some(Duration::from_millis(500)));
/// assert_eq!(policy.wait(9, Duration::from_secs(60)), Some(Duration::from_millis(500)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constant(pub Duration);

impl Policy for Constant {
    fn wait(&self, _attempts: u32, _elapsed: Duration) -> Option<Duration> {
        Some(self.0)
    }
}

/// Wait grows linearly: `initial + (attempts - 1) * increment`.
///
/// Overflow in either the multiplication or the addition saturates the whole
/// result to [`MAX_WAIT`].
///
/// # Examples
///
/// ```rust
/// use undertow::policy::Linear;
/// use undertow::Policy;
/// use std::time::Duration;
///
/// let policy = Linear::new(Duration::from_secs(60), Duration::from_secs(30));
///
/// // 60s, 90s, 120s, ...
/// assert_eq!(policy.wait(1, Duration::ZERO), Some(Duration::from_secs(60)));
/// assert_eq!(policy.wait(2, Duration::ZERO), Some(Duration::from_secs(90)));
/// assert_eq!(policy.wait(3, Duration::ZERO), Some(Duration::from_secs(120)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Linear {
    /// Wait after the first failure.
    pub initial: Duration,
    /// Added for each further failure.
    pub increment: Duration,
}

impl Linear {
    /// Create a linear policy.
    pub fn new(initial: Duration, increment: Duration) -> Self {
        Self { initial, increment }
    }
}

impl Policy for Linear {
    fn wait(&self, attempts: u32, _elapsed: Duration) -> Option<Duration> {
        let wait = self
            .increment
            .checked_mul(attempts.saturating_sub(1))
            .and_then(|step| self.initial.checked_add(step))
            .unwrap_or(MAX_WAIT);
        Some(wait)
    }
}

/// Wait grows geometrically: `initial * multiplier^(attempts - 1)`.
///
/// The product is built one multiplication at a time. As soon as the running
/// value is zero, or one more multiplication could overflow [`MAX_WAIT`], the
/// loop stops and the current value is returned. With a multiplier barely
/// above 1 and a huge attempt count this can settle below `MAX_WAIT`; that
/// saturation point is part of the contract.
///
/// A multiplier of 1 or less gives a constant or shrinking sequence.
///
/// # Examples
///
/// ```rust
/// use undertow::policy::Exponential;
/// use undertow::Policy;
/// use std::time::Duration;
///
/// let policy = Exponential::new(Duration::from_secs(60), 2.0);
///
/// // 1m, 2m, 4m, ...
/// assert_eq!(policy.wait(1, Duration::ZERO), Some(Duration::from_secs(60)));
/// assert_eq!(policy.wait(2, Duration::ZERO), Some(Duration::from_secs(120)));
/// assert_eq!(policy.wait(3, Duration::ZERO), Some(Duration::from_secs(240)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Exponential {
    /// Wait after the first failure. Must be non-zero for the wait to grow.
    pub initial: Duration,
    /// Growth factor per failure. Must exceed 1 for the wait to grow.
    pub multiplier: f64,
}

impl Exponential {
    /// Create an exponential policy.
    pub fn new(initial: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            multiplier,
        }
    }
}

impl Policy for Exponential {
    fn wait(&self, attempts: u32, _elapsed: Duration) -> Option<Duration> {
        // Every step would leave the wait unchanged.
        if self.multiplier == 1.0 {
            return Some(self.initial);
        }

        let mut wait = self.initial.as_nanos() as f64;
        let overflow = max_wait_nanos() / self.multiplier;
        for _ in 1..attempts {
            if wait == 0.0 || wait > overflow {
                break;
            }
            wait *= self.multiplier;
        }
        Some(duration_from_nanos_f64(wait))
    }
}
