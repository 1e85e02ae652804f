// gatekeeper-core/tests/proptest_breaker.rs
// ============================================================================
// Module: Circuit Breaker Property-Based Tests
// Description: Property tests for CircuitBreaker's threshold, cooldown, and
// half-open-probe invariants.
// Purpose: Detect state-machine accounting bugs across wide configuration
// ranges.
// ============================================================================

//! Property-based tests for the closed/open/half-open circuit breaker.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use gatekeeper_core::breaker::BreakerConfig;
use gatekeeper_core::breaker::BreakerState;
use gatekeeper_core::breaker::CircuitBreaker;
use proptest::prelude::*;

proptest! {
    #[test]
    fn opens_exactly_at_the_failure_threshold(
        failure_threshold in 1_u32..=10,
        half_open_probes in 1_u32..=5,
    ) {
        let breaker = CircuitBreaker::new(BreakerConfig {
            failure_threshold,
            cooldown_ms: 1_000,
            half_open_probes,
        });

        for _ in 0..failure_threshold.saturating_sub(1) {
            breaker.record_failure(0);
            prop_assert_eq!(breaker.state(), BreakerState::Closed);
            prop_assert!(breaker.try_acquire(0));
        }

        breaker.record_failure(0);
        prop_assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn open_breaker_rejects_until_cooldown_elapses(
        failure_threshold in 1_u32..=5,
        cooldown_ms in 0_i64..=10_000,
        elapsed_before_cooldown in 0_i64..=9_999,
    ) {
        let breaker = CircuitBreaker::new(BreakerConfig {
            failure_threshold,
            cooldown_ms,
            half_open_probes: 1,
        });

        for _ in 0..failure_threshold {
            breaker.record_failure(0);
        }
        prop_assert_eq!(breaker.state(), BreakerState::Open);

        let before = elapsed_before_cooldown % cooldown_ms.max(1);
        if before < cooldown_ms {
            prop_assert!(!breaker.try_acquire(before));
        }
        prop_assert!(breaker.try_acquire(cooldown_ms));
    }

    #[test]
    fn half_open_closes_after_exactly_half_open_probes_consecutive_successes(
        failure_threshold in 1_u32..=5,
        half_open_probes in 1_u32..=6,
    ) {
        let cooldown_ms = 1_000;
        let breaker = CircuitBreaker::new(BreakerConfig {
            failure_threshold,
            cooldown_ms,
            half_open_probes,
        });

        for _ in 0..failure_threshold {
            breaker.record_failure(0);
        }
        prop_assert!(breaker.try_acquire(cooldown_ms));
        prop_assert_eq!(breaker.state(), BreakerState::HalfOpen);

        for probe in 1..half_open_probes {
            breaker.record_success();
            prop_assert_eq!(breaker.state(), BreakerState::HalfOpen, "closed early after {probe} of {half_open_probes} probes");
            prop_assert!(breaker.try_acquire(cooldown_ms));
        }
        breaker.record_success();
        prop_assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately(
        failure_threshold in 1_u32..=5,
        half_open_probes in 1_u32..=5,
    ) {
        let cooldown_ms = 1_000;
        let breaker = CircuitBreaker::new(BreakerConfig {
            failure_threshold,
            cooldown_ms,
            half_open_probes,
        });

        for _ in 0..failure_threshold {
            breaker.record_failure(0);
        }
        prop_assert!(breaker.try_acquire(cooldown_ms));
        prop_assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_failure(cooldown_ms);
        prop_assert_eq!(breaker.state(), BreakerState::Open);
        prop_assert!(!breaker.try_acquire(cooldown_ms));
    }
}
