//! Cancellation sources watched by the retry loop.
//!
//! The loop never cancels anything itself. It only asks a [`Cancellation`]
//! whether it has fired, so that a pending wait can be abandoned.
//!
//! - [`Never`]: the default, never fires
//! - `tokio_util::sync::CancellationToken`: fires when canceled
//! - [`Deadline`]: another source plus a point in time

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::CancelError;

/// An external signal that can abort a retry run between attempts.
pub trait Cancellation {
    /// Returns true once the source has fired.
    fn is_done(&self) -> bool;

    /// Why the source fired, or `None` while it has not.
    fn cause(&self) -> Option<CancelError>;

    /// Resolves once the source has fired. Resolves immediately if it already has.
    fn done(&self) -> impl Future<Output = ()> + Send + '_;
}

/// A cancellation source that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Cancellation for Never {
    fn is_done(&self) -> bool {
        false
    }

    fn cause(&self) -> Option<CancelError> {
        None
    }

    fn done(&self) -> impl Future<Output = ()> + Send + '_ {
        std::future::pending()
    }
}

impl Cancellation for CancellationToken {
    fn is_done(&self) -> bool {
        self.is_cancelled()
    }

    fn cause(&self) -> Option<CancelError> {
        self.is_cancelled().then_some(CancelError::Canceled)
    }

    fn done(&self) -> impl Future<Output = ()> + Send + '_ {
        self.cancelled()
    }
}

/// A cancellation source that also fires at a fixed instant.
///
/// If the inner source fired, its cause wins; otherwise a passed deadline
/// reports [`CancelError::DeadlineExceeded`].
///
/// # Examples
///
/// ```rust
/// use undertow::cancel::{Cancellation, Deadline, Never};
/// use undertow::CancelError;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let deadline = Deadline::after(Never, Duration::ZERO);
/// deadline.done().await;
/// assert_eq!(deadline.cause(), Some(CancelError::DeadlineExceeded));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Deadline<C> {
    inner: C,
    deadline: Instant,
}

impl<C> Deadline<C> {
    /// Fire at `deadline`, or earlier if `inner` does.
    pub fn new(inner: C, deadline: Instant) -> Self {
        Self { inner, deadline }
    }

    /// Fire `timeout` from now, or earlier if `inner` does.
    pub fn after(inner: C, timeout: Duration) -> Self {
        Self::new(inner, far_instant(timeout))
    }

    /// The instant at which this source fires on its own.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

impl<C: Cancellation + Sync> Cancellation for Deadline<C> {
    fn is_done(&self) -> bool {
        self.inner.is_done() || self.expired()
    }

    fn cause(&self) -> Option<CancelError> {
        self.inner
            .cause()
            .or_else(|| self.expired().then_some(CancelError::DeadlineExceeded))
    }

    fn done(&self) -> impl Future<Output = ()> + Send + '_ {
        async move {
            tokio::select! {
                _ = self.inner.done() => {}
                _ = tokio::time::sleep_until(self.deadline) => {}
            }
        }
    }
}

impl<C: Cancellation + ?Sized> Cancellation for &C {
    fn is_done(&self) -> bool {
        (**self).is_done()
    }

    fn cause(&self) -> Option<CancelError> {
        (**self).cause()
    }

    fn done(&self) -> impl Future<Output = ()> + Send + '_ {
        (**self).done()
    }
}

impl<C: Cancellation + ?Sized> Cancellation for Arc<C> {
    fn is_done(&self) -> bool {
        (**self).is_done()
    }

    fn cause(&self) -> Option<CancelError> {
        (**self).cause()
    }

    fn done(&self) -> impl Future<Output = ()> + Send + '_ {
        (**self).done()
    }
}

/// `now + wait`, or roughly thirty years out when that would overflow.
pub(crate) fn far_instant(wait: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(wait)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_never_is_never_done() {
        assert!(!Never.is_done());
        assert_eq!(Never.cause(), None);
        let fired = tokio::time::timeout(Duration::from_millis(10), Never.done()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn test_token_reports_canceled() {
        let token = CancellationToken::new();
        assert!(!Cancellation::is_done(&token));
        assert_eq!(token.cause(), None);

        token.cancel();
        token.done().await;
        assert!(Cancellation::is_done(&token));
        assert_eq!(token.cause(), Some(CancelError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_at_instant() {
        let deadline = Deadline::after(Never, Duration::from_secs(5));
        assert!(!deadline.is_done());
        assert_eq!(deadline.cause(), None);

        deadline.done().await;
        assert!(deadline.is_done());
        assert_eq!(deadline.cause(), Some(CancelError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_inner_cause_wins() {
        let token = CancellationToken::new();
        let deadline = Deadline::after(token.clone(), Duration::from_secs(60));

        token.cancel();
        deadline.done().await;
        assert_eq!(deadline.cause(), Some(CancelError::Canceled));
    }

    #[tokio::test]
    async fn test_deadline_far_future_does_not_overflow() {
        let deadline = Deadline::after(Never, Duration::MAX);
        assert!(!deadline.is_done());
    }

    #[tokio::test]
    async fn test_shared_sources_delegate() {
        let token = Arc::new(CancellationToken::new());
        token.cancel();
        assert!(token.is_done());
        assert_eq!((&token).cause(), Some(CancelError::Canceled));
    }
}
