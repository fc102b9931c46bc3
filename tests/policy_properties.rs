//! Property-based tests for the policy algebra

use proptest::prelude::*;
use std::time::Duration;
use undertow::policy::{
    Constant, Exponential, Immediate, LimitAttempts, LimitTotal, Linear, Max, Randomize, MAX_WAIT,
    STOP,
};
use undertow::Policy;

fn duration() -> impl Strategy<Value = Duration> {
    any::<u64>().prop_map(Duration::from_nanos)
}

fn small_duration() -> impl Strategy<Value = Duration> {
    (0u64..=3_600_000).prop_map(Duration::from_millis)
}

/// A policy that stops on every other attempt, to exercise STOP pass-through.
#[derive(Debug, Clone, Copy)]
struct Alternating(Duration);

impl Policy for Alternating {
    fn wait(&self, attempts: u32, _elapsed: Duration) -> Option<Duration> {
        if attempts % 2 == 0 {
            STOP
        } else {
            Some(self.0)
        }
    }
}

proptest! {
    #[test]
    fn prop_linear_matches_closed_form(
        initial in small_duration(),
        increment in small_duration(),
        attempts in 1u32..10_000,
    ) {
        let expected = initial + increment * (attempts - 1);
        let policy = Linear::new(initial, increment);
        prop_assert_eq!(policy.wait(attempts, Duration::ZERO), Some(expected));
    }

    #[test]
    fn prop_linear_never_wraps(
        initial in duration(),
        increment in duration(),
        attempts in 1u32..=u32::MAX,
    ) {
        let wait = Linear::new(initial, increment).wait(attempts, Duration::ZERO).unwrap();
        prop_assert!(wait >= initial);
        if attempts > 1 {
            prop_assert!(wait >= increment);
        }
    }

    #[test]
    fn prop_exponential_matches_closed_form(
        initial_ms in 1u64..1_000,
        attempts in 1u32..20,
    ) {
        let policy = Exponential::new(Duration::from_millis(initial_ms), 2.0);
        let expected = Duration::from_millis(initial_ms) * 2u32.pow(attempts - 1);
        prop_assert_eq!(policy.wait(attempts, Duration::ZERO), Some(expected));
    }

    #[test]
    fn prop_exponential_is_monotonic_when_growing(
        initial in duration(),
        multiplier in 1.0f64..16.0,
        attempts in 1u32..2_000,
    ) {
        let policy = Exponential::new(initial, multiplier);
        let now = policy.wait(attempts, Duration::ZERO).unwrap();
        let next = policy.wait(attempts + 1, Duration::ZERO).unwrap();
        prop_assert!(next >= now, "{:?} then {:?}", now, next);
    }

    #[test]
    fn prop_max_is_min_of_cap_and_inner(
        cap in duration(),
        inner in duration(),
        attempts in 1u32..100,
    ) {
        let policy = Max::new(cap, Constant(inner));
        prop_assert_eq!(policy.wait(attempts, Duration::ZERO), Some(cap.min(inner)));
    }

    #[test]
    fn prop_max_passes_stop(cap in duration(), inner in duration()) {
        let policy = Max::new(cap, Alternating(inner));
        prop_assert_eq!(policy.wait(2, Duration::ZERO), STOP);
    }

    #[test]
    fn prop_randomize_within_factor(
        wait_ms in 1u64..1_000_000,
        factor in 0.0f64..=1.0,
    ) {
        let wait = Duration::from_millis(wait_ms);
        let policy = Randomize::new(factor, Constant(wait));
        let drawn = policy.wait(1, Duration::ZERO).unwrap();

        let low = wait.as_nanos() as f64 * (1.0 - factor);
        let high = wait.as_nanos() as f64 * (1.0 + factor);
        let drawn = drawn.as_nanos() as f64;
        prop_assert!(drawn >= low.floor() && drawn <= high, "{} not in [{}, {}]", drawn, low, high);
    }

    #[test]
    fn prop_randomize_passes_zero_and_stop(factor in 0.0f64..=1.0, inner in duration()) {
        prop_assert_eq!(Randomize::new(factor, Immediate).wait(1, Duration::ZERO), Some(Duration::ZERO));
        prop_assert_eq!(Randomize::new(factor, Alternating(inner)).wait(2, Duration::ZERO), STOP);
    }

    #[test]
    fn prop_randomize_never_exceeds_max_wait(factor in 0.0f64..=1.0) {
        let drawn = Randomize::new(factor, Constant(MAX_WAIT)).wait(1, Duration::ZERO);
        prop_assert!(drawn.is_some());
    }

    #[test]
    fn prop_limit_attempts_boundary(
        limit in 0u32..1_000,
        attempts in 1u32..2_000,
        inner in duration(),
    ) {
        let policy = LimitAttempts::new(limit, Constant(inner));
        let expected = if attempts >= limit { STOP } else { Some(inner) };
        prop_assert_eq!(policy.wait(attempts, Duration::ZERO), expected);
    }

    #[test]
    fn prop_limit_total_boundary(
        limit in duration(),
        elapsed in duration(),
        inner in duration(),
    ) {
        let policy = LimitTotal::new(limit, Constant(inner));
        let expected = if elapsed >= limit { STOP } else { Some(inner) };
        prop_assert_eq!(policy.wait(1, elapsed), expected);
    }
}
