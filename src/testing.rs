//! Testing utilities for code that retries.
//!
//! Real waits make retry tests slow and flaky. This module provides a fake
//! [`Clock`] whose countdowns expire the moment they are armed, while still
//! moving the clock forward by the requested wait, plus assertion macros for
//! checking policies.
//!
//! # Examples
//!
//! ## FakeClock
//!
//! ```rust
//! use undertow::policy::{Constant, PolicyExt};
//! use undertow::testing::FakeClock;
//! use undertow::Retry;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let clock = FakeClock::new();
//! let result: Result<(), _> = Retry::new(Constant(Duration::from_secs(30)).limit_attempts(3))
//!     .clock(clock.clone())
//!     .run(|| async { Err("down") })
//!     .await;
//!
//! assert!(result.is_err());
//! // Two waits of 30s were "taken" without sleeping.
//! assert_eq!(clock.resets(), vec![Duration::from_secs(30); 2]);
//! assert_eq!(clock.elapsed(), Duration::from_secs(60));
//! # });
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use undertow::policy::{Linear, PolicyExt};
//! use undertow::{assert_stops, assert_waits};
//! use std::time::Duration;
//!
//! let policy = Linear::new(Duration::from_secs(1), Duration::from_secs(1)).limit_attempts(3);
//! assert_waits!(policy,
//!     (1, Duration::ZERO) => Duration::from_secs(1),
//!     (2, Duration::ZERO) => Duration::from_secs(2),
//! );
//! assert_stops!(policy, 3, Duration::ZERO);
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::{Clock, Countdown};

/// A manually driven clock for deterministic retry tests.
///
/// Cloning shares the same time line, so a test can keep one handle while the
/// retry loop owns another.
#[derive(Debug, Clone)]
pub struct FakeClock {
    origin: Instant,
    state: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    offset: Duration,
    resets: Vec<Duration>,
    created: usize,
    stops: usize,
}

impl FakeClock {
    /// Create a clock at offset zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Arc::default(),
        }
    }

    /// Move the clock forward without arming anything.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.offset = state.offset.saturating_add(by);
    }

    /// Total time the clock has moved since it was created.
    pub fn elapsed(&self) -> Duration {
        self.lock().offset
    }

    /// Every wait a countdown was reset to, in order.
    pub fn resets(&self) -> Vec<Duration> {
        self.lock().resets.clone()
    }

    /// How many countdowns were created.
    pub fn created(&self) -> usize {
        self.lock().created
    }

    /// How many times any countdown was stopped.
    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    type Countdown = FakeCountdown;

    fn now(&self) -> Instant {
        let offset = self.elapsed();
        self.origin.checked_add(offset).unwrap_or(self.origin)
    }

    fn countdown(&self, wait: Duration) -> FakeCountdown {
        {
            let mut state = self.lock();
            state.created += 1;
            state.offset = state.offset.saturating_add(wait);
        }
        FakeCountdown {
            clock: self.clone(),
            fired: true,
        }
    }
}

/// Countdown handed out by [`FakeClock`].
///
/// Arming it advances the clock by the wait and makes it fire on the next
/// call to [`Countdown::expired`].
#[derive(Debug)]
pub struct FakeCountdown {
    clock: FakeClock,
    fired: bool,
}

impl Countdown for FakeCountdown {
    fn reset(&mut self, wait: Duration) {
        let mut state = self.clock.lock();
        state.offset = state.offset.saturating_add(wait);
        state.resets.push(wait);
        self.fired = true;
    }

    fn stop(&mut self) -> bool {
        self.clock.lock().stops += 1;
        std::mem::replace(&mut self.fired, false)
    }

    fn expired(&mut self) -> impl Future<Output = ()> + Send + '_ {
        async move {
            if !std::mem::replace(&mut self.fired, false) {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Assert the waits a policy returns for a list of `(attempts, elapsed)`
/// arguments.
///
/// # Example
///
/// ```rust
/// use undertow::assert_waits;
/// use undertow::policy::Constant;
/// use std::time::Duration;
///
/// assert_waits!(Constant(Duration::from_secs(1)),
///     (1, Duration::ZERO) => Duration::from_secs(1),
///     (7, Duration::from_secs(60)) => Duration::from_secs(1),
/// );
/// ```
#[macro_export]
macro_rules! assert_waits {
    ($policy:expr, $(($attempts:expr, $elapsed:expr) => $expected:expr),+ $(,)?) => {{
        let policy = &$policy;
        $(
            let wait = $crate::Policy::wait(policy, $attempts, $elapsed);
            assert_eq!(
                wait,
                Some($expected),
                "wait(attempts = {:?}, elapsed = {:?})",
                $attempts,
                $elapsed
            );
        )+
    }};
}

/// Assert that a policy returns [`STOP`](crate::policy::STOP).
///
/// # Example
///
/// ```rust
/// use undertow::assert_stops;
/// use undertow::policy::{Immediate, PolicyExt};
/// use std::time::Duration;
///
/// assert_stops!(Immediate.limit_attempts(2), 2, Duration::ZERO);
/// ```
#[macro_export]
macro_rules! assert_stops {
    ($policy:expr, $attempts:expr, $elapsed:expr) => {{
        let wait = $crate::Policy::wait(&$policy, $attempts, $elapsed);
        assert!(
            wait.is_none(),
            "expected STOP for wait(attempts = {:?}, elapsed = {:?}), got {:?}",
            $attempts,
            $elapsed,
            wait
        );
    }};
}

#[cfg(feature = "proptest")]
mod arbitrary {
    use proptest::prelude::*;
    use std::time::Duration;

    use crate::policy::{Constant, Exponential, Immediate, Linear};

    fn any_duration() -> impl Strategy<Value = Duration> {
        any::<u64>().prop_map(Duration::from_nanos)
    }

    impl Arbitrary for Immediate {
        type Parameters = ();
        type Strategy = Just<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            Just(Immediate)
        }
    }

    impl Arbitrary for Constant {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            any_duration().prop_map(Constant).boxed()
        }
    }

    impl Arbitrary for Linear {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            (any_duration(), any_duration())
                .prop_map(|(initial, increment)| Linear::new(initial, increment))
                .boxed()
        }
    }

    impl Arbitrary for Exponential {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            (any_duration(), 0.0f64..16.0)
                .prop_map(|(initial, multiplier)| Exponential::new(initial, multiplier))
                .boxed()
        }
    }
}
