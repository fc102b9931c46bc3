//! Decorators that bound another policy: by attempts, by total time, by cap.

use std::time::Duration;

use super::{Policy, STOP};

/// Stops once the attempt count reaches `limit`.
///
/// The policy is consulted after a failure, so `LimitAttempts::new(2, p)`
/// retries the first failure once and stops after the second.
///
/// # Examples
///
/// ```rust
/// use undertow::policy::{Constant, LimitAttempts, STOP};
/// use undertow::Policy;
/// use std::time::Duration;
///
/// let policy = LimitAttempts::new(2, Constant(Duration::from_secs(1)));
/// assert_eq!(policy.wait(1, Duration::ZERO), Some(Duration::from_secs(1)));
/// assert_eq!(policy.wait(2, Duration::ZERO), STOP);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LimitAttempts<P> {
    /// Attempt count at which to stop.
    pub limit: u32,
    /// Policy consulted below the limit.
    pub inner: P,
}

impl<P> LimitAttempts<P> {
    /// Wrap `inner` with an attempt limit.
    pub fn new(limit: u32, inner: P) -> Self {
        Self { limit, inner }
    }
}

impl<P: Policy> Policy for LimitAttempts<P> {
    fn wait(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        if attempts >= self.limit {
            return STOP;
        }
        self.inner.wait(attempts, elapsed)
    }
}

/// Stops once the elapsed time reaches `limit`.
///
/// The limit is checked when a failure is seen, so a run can overshoot it by
/// up to one wait plus one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LimitTotal<P> {
    /// Elapsed time at which to stop.
    pub limit: Duration,
    /// Policy consulted below the limit.
    pub inner: P,
}

impl<P> LimitTotal<P> {
    /// Wrap `inner` with a total time limit.
    pub fn new(limit: Duration, inner: P) -> Self {
        Self { limit, inner }
    }
}

impl<P: Policy> Policy for LimitTotal<P> {
    fn wait(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        if elapsed >= self.limit {
            return STOP;
        }
        self.inner.wait(attempts, elapsed)
    }
}

/// Caps the inner policy's wait at `cap`.
///
/// Only clamps downward: shorter waits, zero and [`STOP`] pass through.
///
/// # Examples
///
/// ```rust
/// use undertow::policy::{Linear, Max};
/// use undertow::Policy;
/// use std::time::Duration;
///
/// let policy = Max::new(
///     Duration::from_secs(90),
///     Linear::new(Duration::from_secs(60), Duration::from_secs(60)),
/// );
/// assert_eq!(policy.wait(1, Duration::ZERO), Some(Duration::from_secs(60)));
/// assert_eq!(policy.wait(2, Duration::ZERO), Some(Duration::from_secs(90)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Max<P> {
    /// Largest wait this policy returns.
    pub cap: Duration,
    /// Policy whose waits are capped.
    pub inner: P,
}

impl<P> Max<P> {
    /// Wrap `inner` with a wait cap.
    pub fn new(cap: Duration, inner: P) -> Self {
        Self { cap, inner }
    }
}

impl<P: Policy> Policy for Max<P> {
    fn wait(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        let wait = self.inner.wait(attempts, elapsed)?;
        Some(wait.min(self.cap))
    }
}
