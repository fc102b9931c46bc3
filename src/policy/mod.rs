//! Wait policies and their decorators.
//!
//! A [`Policy`] answers a single question for the retry loop: after `attempts`
//! failures and `elapsed` time, how long should we wait before trying again?
//!
//! - **Pure**: `wait` takes `&self`, so one policy value can drive any number
//!   of runs, concurrently or not
//! - **Composable**: decorators wrap another policy and transform its answer
//! - **Saturating**: arithmetic overflow clamps to [`MAX_WAIT`], never wraps
//!
//! # Quick Start
//!
//! ```rust
//! use undertow::policy::{Exponential, PolicyExt};
//! use undertow::Policy;
//! use std::time::Duration;
//!
//! let policy = Exponential::new(Duration::from_millis(100), 2.0)
//!     .capped(Duration::from_secs(1))
//!     .limit_attempts(5);
//!
//! assert_eq!(policy.wait(1, Duration::ZERO), Some(Duration::from_millis(100)));
//! assert_eq!(policy.wait(4, Duration::ZERO), Some(Duration::from_millis(800)));
//! assert_eq!(policy.wait(5, Duration::ZERO), None); // STOP
//! ```
//!
//! # Composition Order
//!
//! Decorators apply from the inside out, and order matters:
//! `Max(Randomize(p))` clamps after jitter while `Randomize(Max(p))` jitters
//! the clamped value and may land above the cap.

mod backoff;
mod bounds;
mod jitter;

pub use backoff::{Constant, Exponential, Immediate, Linear};
pub use bounds::{LimitAttempts, LimitTotal, Max};
pub use jitter::Randomize;

use std::sync::Arc;
use std::time::Duration;

/// Returned by [`Policy::wait`] to tell the retry loop to give up.
pub const STOP: Option<Duration> = None;

/// The largest wait a policy can return. Overflowing computations saturate here.
pub const MAX_WAIT: Duration = Duration::MAX;

/// Decides how long to wait before the next attempt.
///
/// `attempts` is the number of failed calls so far in the current run, so the
/// first call to `wait` in a run sees `attempts == 1`. `elapsed` is the time
/// since the run started.
///
/// Return `Some(Duration::ZERO)` to retry immediately, `Some(d)` to wait `d`,
/// or [`STOP`] to end the run with the last error.
///
/// Implementations must not rely on mutable state between calls: a policy is
/// shared by every run that uses it. The only exception in this crate is
/// [`Randomize`], which draws from the thread-local random generator.
pub trait Policy {
    /// Compute the wait before the next attempt, or [`STOP`].
    fn wait(&self, attempts: u32, elapsed: Duration) -> Option<Duration>;
}

/// A type-erased policy, handy for policy trees chosen at runtime.
pub type BoxedPolicy = Box<dyn Policy + Send + Sync>;

impl<P: Policy + ?Sized> Policy for &P {
    fn wait(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        (**self).wait(attempts, elapsed)
    }
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn wait(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        (**self).wait(attempts, elapsed)
    }
}

impl<P: Policy + ?Sized> Policy for Arc<P> {
    fn wait(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        (**self).wait(attempts, elapsed)
    }
}

/// Combinators for wrapping a policy in decorators.
///
/// Each method is shorthand for the decorator of the same meaning, so
/// `p.capped(cap)` is `Max::new(cap, p)`.
pub trait PolicyExt: Policy + Sized {
    /// Stop once `attempts >= limit`. See [`LimitAttempts`].
    fn limit_attempts(self, limit: u32) -> LimitAttempts<Self> {
        LimitAttempts::new(limit, self)
    }

    /// Stop once `elapsed >= limit`. See [`LimitTotal`].
    fn limit_total(self, limit: Duration) -> LimitTotal<Self> {
        LimitTotal::new(limit, self)
    }

    /// Clamp waits down to `cap`. See [`Max`].
    fn capped(self, cap: Duration) -> Max<Self> {
        Max::new(cap, self)
    }

    /// Spread waits by `±factor`. See [`Randomize`].
    fn randomize(self, factor: f64) -> Randomize<Self> {
        Randomize::new(factor, self)
    }

    /// Erase the policy type.
    fn boxed(self) -> BoxedPolicy
    where
        Self: Send + Sync + 'static,
    {
        Box::new(self)
    }
}

impl<P: Policy> PolicyExt for P {}

/// Convert a nanosecond count to a `Duration`, truncating the fraction and
/// saturating at [`MAX_WAIT`]. Negative and NaN inputs map to zero.
pub(crate) fn duration_from_nanos_f64(nanos: f64) -> Duration {
    if nanos.is_nan() || nanos <= 0.0 {
        return Duration::ZERO;
    }
    if nanos < u64::MAX as f64 {
        return Duration::from_nanos(nanos as u64);
    }
    Duration::try_from_secs_f64(nanos.floor() / 1e9).unwrap_or(MAX_WAIT)
}

pub(crate) fn max_wait_nanos() -> f64 {
    MAX_WAIT.as_nanos() as f64
}
