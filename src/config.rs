//! Declarative policy configuration.
//!
//! [`PolicyConfig`] mirrors the policy types as a serde-friendly tree, so a
//! retry policy can live in a config file instead of code. Durations are whole
//! milliseconds.
//!
//! # Examples
//!
//! ```rust
//! use undertow::config::PolicyConfig;
//! use undertow::Policy;
//! use std::time::Duration;
//!
//! let config: PolicyConfig = serde_json::from_str(r#"{
//!     "type": "limit_attempts",
//!     "limit": 5,
//!     "policy": {
//!         "type": "max",
//!         "cap_ms": 10000,
//!         "policy": { "type": "exponential", "initial_ms": 100, "multiplier": 2.0 }
//!     }
//! }"#).unwrap();
//!
//! let policy = config.build().unwrap();
//! assert_eq!(policy.wait(2, Duration::ZERO), Some(Duration::from_millis(200)));
//! assert_eq!(policy.wait(5, Duration::ZERO), None);
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::{BoxedPolicy, Constant, Exponential, Immediate, Linear, PolicyExt};

/// A policy tree in configuration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// See [`Immediate`].
    Immediate,
    /// See [`Constant`].
    Constant {
        /// Fixed wait.
        wait_ms: u64,
    },
    /// See [`Linear`].
    Linear {
        /// Wait after the first failure.
        initial_ms: u64,
        /// Added for each further failure.
        increment_ms: u64,
    },
    /// See [`Exponential`].
    Exponential {
        /// Wait after the first failure.
        initial_ms: u64,
        /// Growth factor per failure. Must be finite.
        multiplier: f64,
    },
    /// See [`LimitAttempts`](crate::policy::LimitAttempts).
    LimitAttempts {
        /// Attempt count at which to stop.
        limit: u32,
        /// Wrapped policy.
        policy: Box<PolicyConfig>,
    },
    /// See [`LimitTotal`](crate::policy::LimitTotal).
    LimitTotal {
        /// Elapsed time at which to stop.
        limit_ms: u64,
        /// Wrapped policy.
        policy: Box<PolicyConfig>,
    },
    /// See [`Max`](crate::policy::Max).
    Max {
        /// Largest wait.
        cap_ms: u64,
        /// Wrapped policy.
        policy: Box<PolicyConfig>,
    },
    /// See [`Randomize`](crate::policy::Randomize).
    Randomize {
        /// Relative spread, in `[0, 1]`.
        factor: f64,
        /// Wrapped policy.
        policy: Box<PolicyConfig>,
    },
}

/// A [`PolicyConfig`] that cannot be turned into a policy.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A randomize factor outside `[0, 1]`.
    InvalidFactor(f64),
    /// An exponential multiplier that is NaN or infinite.
    InvalidMultiplier(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFactor(factor) => {
                write!(f, "randomize factor {} is outside [0, 1]", factor)
            }
            Self::InvalidMultiplier(multiplier) => {
                write!(f, "exponential multiplier {} is not finite", multiplier)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl PolicyConfig {
    /// Check every node of the tree.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Immediate | Self::Constant { .. } | Self::Linear { .. } => Ok(()),
            Self::Exponential { multiplier, .. } => {
                if multiplier.is_finite() {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidMultiplier(*multiplier))
                }
            }
            Self::Randomize { factor, policy } => {
                if !(0.0..=1.0).contains(factor) {
                    return Err(ConfigError::InvalidFactor(*factor));
                }
                policy.validate()
            }
            Self::LimitAttempts { policy, .. }
            | Self::LimitTotal { policy, .. }
            | Self::Max { policy, .. } => policy.validate(),
        }
    }

    /// Validate the tree and build the policy it describes.
    pub fn build(&self) -> Result<BoxedPolicy, ConfigError> {
        self.validate()?;
        Ok(self.build_unchecked())
    }

    fn build_unchecked(&self) -> BoxedPolicy {
        match self {
            Self::Immediate => Immediate.boxed(),
            Self::Constant { wait_ms } => Constant(millis(*wait_ms)).boxed(),
            Self::Linear {
                initial_ms,
                increment_ms,
            } => Linear::new(millis(*initial_ms), millis(*increment_ms)).boxed(),
            Self::Exponential {
                initial_ms,
                multiplier,
            } => Exponential::new(millis(*initial_ms), *multiplier).boxed(),
            Self::LimitAttempts { limit, policy } => {
                policy.build_unchecked().limit_attempts(*limit).boxed()
            }
            Self::LimitTotal { limit_ms, policy } => {
                policy.build_unchecked().limit_total(millis(*limit_ms)).boxed()
            }
            Self::Max { cap_ms, policy } => {
                policy.build_unchecked().capped(millis(*cap_ms)).boxed()
            }
            Self::Randomize { factor, policy } => {
                policy.build_unchecked().randomize(*factor).boxed()
            }
        }
    }
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
