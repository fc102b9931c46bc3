//! Time sources for the retry loop.
//!
//! The loop reads the time through a [`Clock`] and sleeps through the
//! [`Countdown`] that clock hands out. [`TokioClock`] is the production pair;
//! [`crate::testing::FakeClock`] swaps in a clock that never really sleeps.

use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::time::{Duration, Instant};

use tokio::time::Sleep;

use crate::cancel::far_instant;

/// A resettable, stoppable, single-shot timer.
pub trait Countdown {
    /// Re-arm the countdown to expire `wait` from now.
    fn reset(&mut self, wait: Duration);

    /// Disarm the countdown. Returns true if it was armed and had not yet
    /// expired. Stopping an expired or stopped countdown is not an error.
    fn stop(&mut self) -> bool;

    /// Resolves when the armed countdown expires. Never resolves while the
    /// countdown is disarmed.
    fn expired(&mut self) -> impl Future<Output = ()> + Send + '_;
}

/// Reads the time and creates countdowns.
pub trait Clock {
    /// The countdown type handed out by [`Clock::countdown`].
    type Countdown: Countdown;

    /// The current instant. Must be monotonic.
    fn now(&self) -> Instant;

    /// Create a countdown armed to expire after `wait`.
    fn countdown(&self, wait: Duration) -> Self::Countdown;
}

/// Wall-clock time backed by `tokio::time`.
///
/// Honors `tokio::time::pause`, so paused-time tests work with it as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    type Countdown = TokioCountdown;

    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn countdown(&self, wait: Duration) -> TokioCountdown {
        TokioCountdown {
            sleep: Box::pin(tokio::time::sleep_until(far_instant(wait))),
            armed: true,
        }
    }
}

/// A countdown backed by a `tokio::time::Sleep`.
#[derive(Debug)]
pub struct TokioCountdown {
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl Countdown for TokioCountdown {
    fn reset(&mut self, wait: Duration) {
        self.sleep.as_mut().reset(far_instant(wait));
        self.armed = true;
    }

    fn stop(&mut self) -> bool {
        let was_running = self.armed && !self.sleep.is_elapsed();
        self.armed = false;
        was_running
    }

    fn expired(&mut self) -> impl Future<Output = ()> + Send + '_ {
        async move {
            if !self.armed {
                std::future::pending::<()>().await;
            }
            self.sleep.as_mut().await;
            self.armed = false;
        }
    }
}

/// Owns a countdown for the length of a run and disarms it on drop.
///
/// Every way out of the retry loop, including an early return or the run's
/// future being dropped mid-wait, goes through `Drop`.
#[derive(Debug)]
pub struct ArmedCountdown<C: Countdown> {
    countdown: C,
}

impl<C: Countdown> ArmedCountdown<C> {
    /// Take ownership of an armed countdown.
    pub fn new(countdown: C) -> Self {
        Self { countdown }
    }
}

impl<C: Countdown> Deref for ArmedCountdown<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.countdown
    }
}

impl<C: Countdown> DerefMut for ArmedCountdown<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.countdown
    }
}

impl<C: Countdown> Drop for ArmedCountdown<C> {
    fn drop(&mut self) {
        self.countdown.stop();
    }
}
