// gatekeeper-limits/tests/proptest_sliding_window.rs
// ============================================================================
// Module: Sliding Window Rate Limiter Property-Based Tests
// Description: Property tests for InMemorySlidingWindowLimiter's monotonicity
// invariant under arbitrary call sequences.
// Purpose: Detect window/limit accounting bugs across wide input ranges.
// ============================================================================

//! Property-based tests for the in-memory sliding-window rate limiter.

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

use gatekeeper_core::interfaces::RateLimitOutcome;
use gatekeeper_core::interfaces::RateLimiterStore;
use gatekeeper_limits::InMemorySlidingWindowLimiter;
use proptest::prelude::*;

fn run_sequence(window_seconds: u64, limit: u64, deltas: &[u64]) -> Vec<(i64, bool)> {
    let limiter = InMemorySlidingWindowLimiter::new();
    let mut now_ms: i64 = 0;
    let mut results = Vec::with_capacity(deltas.len());

    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("current-thread runtime")
        .block_on(async {
            for delta in deltas {
                now_ms = now_ms.saturating_add(i64::try_from(*delta).unwrap_or(i64::MAX));
                let outcome = limiter
                    .check_and_increment("k", window_seconds, limit, now_ms)
                    .await
                    .expect("in-memory limiter never errors");
                let admitted = matches!(outcome, RateLimitOutcome::Admitted { .. });
                results.push((now_ms, admitted));
            }
        });

    results
}

proptest! {
    #[test]
    fn never_admits_more_than_limit_within_any_trailing_window(
        window_seconds in 1_u64..=50,
        limit in 1_u64..=10,
        deltas in prop::collection::vec(0_u64..=5_000, 0..80),
    ) {
        let window_ms = i64::try_from(window_seconds.saturating_mul(1_000)).unwrap();
        let results = run_sequence(window_seconds, limit, &deltas);
        let admitted_at: Vec<i64> = results.iter().filter(|(_, admitted)| *admitted).map(|(t, _)| *t).collect();

        for &t in &admitted_at {
            let count_in_window = admitted_at.iter().filter(|&&other| other > t - window_ms && other <= t).count();
            prop_assert!(
                count_in_window as u64 <= limit,
                "admitted {count_in_window} calls within the trailing window ending at {t}, exceeding limit {limit}"
            );
        }
    }

    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn admitting_a_call_never_retroactively_denies_an_earlier_admitted_call(
        window_seconds in 1_u64..=50,
        limit in 1_u64..=10,
        deltas in prop::collection::vec(0_u64..=5_000, 0..20),
    ) {
        let results = run_sequence(window_seconds, limit, &deltas);

        // Re-running the same prefix must yield the same admit/deny decisions:
        // a later call's presence cannot change an earlier call's outcome.
        for prefix_len in 0..=deltas.len() {
            let prefix_results = run_sequence(window_seconds, limit, &deltas[..prefix_len]);
            prop_assert_eq!(&results[..prefix_len], &prefix_results[..]);
        }
    }
}
