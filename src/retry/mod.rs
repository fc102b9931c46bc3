//! The retry loop.
//!
//! [`Retry`] drives one fallible async operation until it succeeds or one of
//! the stop conditions is met:
//!
//! - the operation (after the filter) returns `Ok`
//! - the error is, or wraps, a cancellation failure ([`CancelError`] or
//!   `tokio::time::error::Elapsed`)
//! - the error is an [`ErrorStop`]; its inner error is returned
//! - the [`Policy`] returns [`STOP`](crate::policy::STOP)
//! - the cancellation source fires during a wait
//!
//! Otherwise the operation is retried after the wait the policy chose.
//!
//! # Quick Start
//!
//! ```rust
//! use undertow::policy::{Constant, PolicyExt};
//! use undertow::Retry;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let mut calls = 0;
//! let result = Retry::new(Constant(Duration::from_millis(1)).limit_attempts(5))
//!     .run(|| {
//!         calls += 1;
//!         let n = calls;
//!         async move {
//!             if n < 3 {
//!                 Err("transient failure")
//!             } else {
//!                 Ok(n)
//!             }
//!         }
//!     })
//!     .await;
//!
//! assert_eq!(result.unwrap(), 3);
//! # });
//! ```
//!
//! [`CancelError`]: crate::CancelError

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::cancel::{Cancellation, Never};
use crate::clock::{ArmedCountdown, Clock, Countdown, TokioClock};
use crate::error::{is_cancellation, BoxError, ErrorStop};
use crate::policy::Policy;

type Filter<'a, T> = Box<dyn FnMut(Result<T, BoxError>) -> Result<T, BoxError> + Send + 'a>;
type Notify<'a> = Box<dyn FnMut(&RetryEvent<'_>) + Send + 'a>;

/// Information about a failed attempt, passed to the notify hook before waiting.
#[derive(Debug, Clone, Copy)]
pub struct RetryEvent<'a> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt, after filtering.
    pub error: &'a BoxError,
    /// Delay before the next attempt.
    pub wait: Duration,
    /// Time since the run started.
    pub elapsed: Duration,
}

/// A configured retry run.
///
/// Built with [`Retry::new`] and finished with [`Retry::run`]. The defaults are
/// no filter, no notify hook, a cancellation source that never fires, and
/// [`TokioClock`].
///
/// # Examples
///
/// ```rust
/// use undertow::policy::{Exponential, PolicyExt};
/// use undertow::{error_stop, Retry};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # tokio_test::block_on(async {
/// let policy = Exponential::new(Duration::from_millis(1), 2.0)
///     .randomize(0.5)
///     .capped(Duration::from_millis(10))
///     .limit_attempts(10)
///     .limit_total(Duration::from_secs(1));
///
/// let result: Result<(), _> = Retry::new(policy)
///     .cancel_on(CancellationToken::new())
///     .filter(|result| {
///         result.map_err(|err| {
///             if err.to_string() == "unrecoverable" {
///                 error_stop(err)
///             } else {
///                 err
///             }
///         })
///     })
///     .notify(|event| println!("attempt {} failed: {}", event.attempt, event.error))
///     .run(|| async { Err("unrecoverable") })
///     .await;
///
/// assert_eq!(result.unwrap_err().to_string(), "unrecoverable");
/// # });
/// ```
pub struct Retry<'a, T, P, C = Never, K = TokioClock> {
    policy: P,
    cancel: C,
    clock: K,
    filter: Option<Filter<'a, T>>,
    notify: Option<Notify<'a>>,
}

impl<'a, T, P: Policy> Retry<'a, T, P> {
    /// Start configuring a run driven by `policy`.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            cancel: Never,
            clock: TokioClock,
            filter: None,
            notify: None,
        }
    }
}

impl<'a, T, P, C, K> Retry<'a, T, P, C, K>
where
    P: Policy,
    C: Cancellation,
    K: Clock,
{
    /// Pass every result of the operation through `filter`.
    ///
    /// The filter sees successes as well as failures. It can rewrite an error,
    /// suppress it by returning `Ok`, or wrap it with
    /// [`error_stop`](crate::error_stop) to end the run.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: FnMut(Result<T, BoxError>) -> Result<T, BoxError> + Send + 'a,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Call `notify` after each failed attempt that will be retried, before
    /// waiting.
    ///
    /// The hook only observes; it cannot change the outcome.
    pub fn notify<F>(mut self, notify: F) -> Self
    where
        F: FnMut(&RetryEvent<'_>) + Send + 'a,
    {
        self.notify = Some(Box::new(notify));
        self
    }

    /// Abandon waits when `cancel` fires.
    pub fn cancel_on<C2: Cancellation>(self, cancel: C2) -> Retry<'a, T, P, C2, K> {
        Retry {
            policy: self.policy,
            cancel,
            clock: self.clock,
            filter: self.filter,
            notify: self.notify,
        }
    }

    /// Read time and sleep through `clock` instead of [`TokioClock`].
    pub fn clock<K2: Clock>(self, clock: K2) -> Retry<'a, T, P, C, K2> {
        Retry {
            policy: self.policy,
            cancel: self.cancel,
            clock,
            filter: self.filter,
            notify: self.notify,
        }
    }

    /// Run `op` until it succeeds or a stop condition is met.
    ///
    /// Returns the operation's value, or the most recent filtered error. An
    /// [`ErrorStop`] is unwrapped so the caller gets the original error back.
    pub async fn run<F, Fut, E>(mut self, mut op: F) -> Result<T, BoxError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        // Armed at zero so the first attempt happens immediately; the guard
        // disarms it however the run ends.
        let mut countdown = ArmedCountdown::new(self.clock.countdown(Duration::ZERO));
        let start = self.clock.now();
        let mut attempt = 0u32;

        loop {
            let result = op().await.map_err(Into::into);
            let result = match self.filter.as_mut() {
                Some(filter) => filter(result),
                None => result,
            };
            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            attempt = attempt.saturating_add(1);

            // There is no point in retrying after the cancellation source failed.
            if is_cancellation(error.as_ref()) {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt, error = %error, "retry stopped by cancellation error");
                return Err(error);
            }

            let error = match error.downcast::<ErrorStop>() {
                Ok(stop) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, error = %stop, "retry stopped by error_stop");
                    return Err(stop.into_inner());
                }
                Err(error) => error,
            };

            let elapsed = self.clock.now().saturating_duration_since(start);
            let Some(wait) = self.policy.wait(attempt, elapsed) else {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt, ?elapsed, error = %error, "retry policy stopped");
                return Err(error);
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, ?wait, ?elapsed, error = %error, "retrying");

            if let Some(notify) = self.notify.as_mut() {
                notify(&RetryEvent {
                    attempt,
                    error: &error,
                    wait,
                    elapsed,
                });
            }

            if wait.is_zero() {
                continue;
            }

            countdown.reset(wait);
            tokio::select! {
                biased;
                _ = self.cancel.done() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, cause = ?self.cancel.cause(), "retry wait canceled");
                    return Err(error);
                }
                _ = countdown.expired() => {}
            }
        }
    }
}

impl<T, P: fmt::Debug, C: fmt::Debug, K: fmt::Debug> fmt::Debug for Retry<'_, T, P, C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("policy", &self.policy)
            .field("cancel", &self.cancel)
            .field("clock", &self.clock)
            .field("filter", &self.filter.is_some())
            .field("notify", &self.notify.is_some())
            .finish()
    }
}

/// Retry `op` under `policy` with no filter, no hook and no cancellation.
///
/// Shorthand for `Retry::new(policy).run(op)`.
///
/// # Examples
///
/// ```rust
/// use undertow::policy::{Immediate, PolicyExt};
/// use undertow::retry;
///
/// # tokio_test::block_on(async {
/// let result: Result<(), _> = retry(Immediate.limit_attempts(3), || async { Err("failed") }).await;
/// assert_eq!(result.unwrap_err().to_string(), "failed");
/// # });
/// ```
pub async fn retry<T, P, F, Fut, E>(policy: P, op: F) -> Result<T, BoxError>
where
    P: Policy,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    Retry::new(policy).run(op).await
}
