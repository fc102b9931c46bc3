//! Error types for the retry loop.
//!
//! Errors cross the retry loop as [`BoxError`] so that the loop can look
//! through an error's `source()` chain when classifying it:
//!
//! - [`ErrorStop`] (usually built with [`error_stop`]) ends the run at once and
//!   the wrapped error is handed back to the caller unchanged.
//! - [`CancelError`] anywhere in the chain means the cancellation source itself
//!   failed, so there is nothing to gain from another attempt.

use std::error::Error;
use std::fmt;

/// Type-erased error carried through the retry loop.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Wraps `err` so that returning it from an operation or filter stops the
/// retry loop immediately.
///
/// The loop unwraps the [`ErrorStop`] and returns the original error, so the
/// caller can still downcast it to its concrete type.
///
/// # Examples
///
/// ```rust
/// use undertow::{error_stop, ErrorStop};
///
/// let err = error_stop("permission denied");
/// assert_eq!(err.to_string(), "permission denied");
/// assert!(err.is::<ErrorStop>());
/// ```
pub fn error_stop(err: impl Into<BoxError>) -> BoxError {
    Box::new(ErrorStop::new(err))
}

/// An error that tells the retry loop to give up without consulting the policy.
///
/// Formatting, `source()` and equality all delegate to the wrapped error.
#[derive(Debug)]
pub struct ErrorStop(BoxError);

impl ErrorStop {
    /// Wrap an error.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }

    /// Get a reference to the wrapped error.
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }

    /// Extract the wrapped error.
    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

impl fmt::Display for ErrorStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for ErrorStop {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

impl PartialEq for ErrorStop {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_string() == other.0.to_string()
    }
}

/// Why a cancellation source fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelError {
    /// The source was canceled explicitly.
    Canceled,
    /// The source's deadline passed.
    DeadlineExceeded,
}

impl CancelError {
    /// Returns true if this is [`CancelError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns true if this is [`CancelError::DeadlineExceeded`].
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

impl fmt::Display for CancelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => f.write_str("operation canceled"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

impl Error for CancelError {}

/// Walk an error and its `source()` chain, outermost first.
pub(crate) fn chain<'a>(
    err: &'a (dyn Error + 'static),
) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

/// Returns true if `err` is, or wraps, a cancellation failure.
///
/// Both [`CancelError`] and the `Elapsed` error from `tokio::time::timeout`
/// count as cancellation.
pub fn is_cancellation(err: &(dyn Error + 'static)) -> bool {
    chain(err).any(|e| e.is::<CancelError>() || e.is::<tokio::time::error::Elapsed>())
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[derive(Debug)]
    struct Wrapped {
        msg: &'static str,
        source: BoxError,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}: {}", self.msg, self.source)
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(self.source.as_ref())
        }
    }

    #[test]
    fn test_error_stop_display_delegates() {
        let err = error_stop("test");
        assert_eq!(err.to_string(), "test");
    }

    #[test]
    fn test_error_stop_into_inner_keeps_identity() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let stop = ErrorStop::new(inner);
        let unwrapped = stop.into_inner();
        let io = unwrapped.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_error_stop_equality_uses_message() {
        assert_eq!(ErrorStop::new("same"), ErrorStop::new("same"));
        assert_ne!(ErrorStop::new("same"), ErrorStop::new("other"));
    }

    #[test]
    fn test_error_stop_source_delegates() {
        let stop = ErrorStop::new(Wrapped {
            msg: "outer",
            source: "root cause".into(),
        });
        assert_eq!(stop.source().unwrap().to_string(), "root cause");
    }

    #[test]
    fn test_cancel_error_display() {
        assert_eq!(CancelError::Canceled.to_string(), "operation canceled");
        assert_eq!(
            CancelError::DeadlineExceeded.to_string(),
            "deadline exceeded"
        );
        assert!(CancelError::Canceled.is_canceled());
        assert!(CancelError::DeadlineExceeded.is_deadline_exceeded());
    }

    #[test]
    fn test_is_cancellation_direct() {
        let err: BoxError = Box::new(CancelError::Canceled);
        assert!(is_cancellation(err.as_ref()));
    }

    #[test]
    fn test_is_cancellation_wrapped() {
        let err = Wrapped {
            msg: "wrapped",
            source: Box::new(CancelError::DeadlineExceeded),
        };
        assert!(is_cancellation(&err));
        assert_eq!(err.to_string(), "wrapped: deadline exceeded");
    }

    #[test]
    fn test_chain_walks_nested_sources() {
        let err = Wrapped {
            msg: "outer",
            source: Box::new(Wrapped {
                msg: "inner",
                source: Box::new(CancelError::Canceled),
            }),
        };

        let messages: Vec<String> = chain(&err).map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "outer: inner: operation canceled",
                "inner: operation canceled",
                "operation canceled",
            ]
        );
        assert!(chain(&err).last().unwrap().is::<CancelError>());
        assert!(is_cancellation(&err));
    }

    #[test]
    fn test_is_cancellation_plain_error() {
        let err: BoxError = "failed".into();
        assert!(!is_cancellation(err.as_ref()));
    }

    #[tokio::test]
    async fn test_is_cancellation_tokio_timeout() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        assert!(is_cancellation(&elapsed));
    }
}
