//! # Undertow
//!
//! > *"What goes out comes back"*
//!
//! Composable wait policies and a cancellable retry loop for async Rust.
//!
//! ## Philosophy
//!
//! **Undertow** splits retrying into a pure decision and a small driver:
//! - **Policies** are plain values: `(attempts, elapsed) -> wait or STOP`
//! - **The loop** runs the operation, classifies its errors, asks the policy,
//!   and waits on a clock it was handed, giving way to cancellation
//!
//! ## Quick Example
//!
//! ```rust
//! use undertow::policy::{Exponential, PolicyExt};
//! use undertow::Retry;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! // Exponential backoff with jitter, capped, at most 10 attempts, 25 minutes overall
//! let policy = Exponential::new(Duration::from_millis(5), 2.0)
//!     .randomize(0.5)
//!     .capped(Duration::from_secs(10))
//!     .limit_attempts(10)
//!     .limit_total(Duration::from_secs(25 * 60));
//!
//! let mut calls = 0;
//! let result = Retry::new(policy)
//!     .notify(|event| {
//!         println!(
//!             "Attempt {} returned {}. Retrying in {:?}...",
//!             event.attempt, event.error, event.wait
//!         );
//!     })
//!     .run(|| {
//!         calls += 1;
//!         let ready = calls > 2;
//!         async move { if ready { Ok("done") } else { Err("not yet") } }
//!     })
//!     .await;
//!
//! assert_eq!(result.unwrap(), "done");
//! # });
//! ```
//!
//! ## Features
//!
//! - `tracing`: log retry decisions with `tracing`
//! - `serde`: serialize policies and load them from [`config::PolicyConfig`]
//! - `proptest`: `Arbitrary` impls for the base policies

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cancel;
pub mod clock;
#[cfg(feature = "serde")]
pub mod config;
pub mod error;
pub mod policy;
pub mod retry;
pub mod testing;

// Re-exports
pub use cancel::{Cancellation, Deadline, Never};
pub use clock::{Clock, Countdown, TokioClock};
pub use error::{error_stop, is_cancellation, BoxError, CancelError, ErrorStop};
pub use policy::{BoxedPolicy, Policy, PolicyExt, MAX_WAIT, STOP};
pub use retry::{retry, Retry, RetryEvent};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::{Cancellation, Deadline, Never};
    pub use crate::error::{error_stop, BoxError, CancelError, ErrorStop};
    pub use crate::policy::{
        Constant, Exponential, Immediate, LimitAttempts, LimitTotal, Linear, Max, Policy,
        PolicyExt, Randomize, STOP,
    };
    pub use crate::retry::{retry, Retry, RetryEvent};
}
