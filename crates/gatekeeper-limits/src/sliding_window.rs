// gatekeeper-limits/src/sliding_window.rs
// ============================================================================
// Module: Sliding Window Rate Limiter
// Description: In-process sliding-log implementation of
// gatekeeper_core::interfaces::RateLimiterStore.
// Purpose: Provide the local fallback rate limiter, and the reference
// implementation a remote store-backed limiter must match semantically.
// Dependencies: gatekeeper_core, std::sync::Mutex
// ============================================================================

//! ## Overview
//! Each key keeps a deque of call timestamps (milliseconds) within the
//! trailing `window_seconds`. `check_and_increment` evicts timestamps older
//! than the window, then admits only if the post-eviction count is strictly
//! below `limit` — so `count == limit` is always `Limited`, never
//! `Admitted`, matching the spec's boundary invariant exactly.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use gatekeeper_core::error::GatewayError;
use gatekeeper_core::interfaces::RateLimitOutcome;
use gatekeeper_core::interfaces::RateLimiterStore;

struct KeyState {
    calls: VecDeque<i64>,
}

/// An in-process sliding-window rate limiter keyed by an arbitrary string.
///
/// # Invariants
/// - Monotonic under a fixed `window_seconds`/`limit` pair: admitting a call
///   at `now_ms` can never cause a later call at `now_ms' >= now_ms` with an
///   otherwise-identical history to be denied when the earlier one was
///   admitted, other than by the later call's own weight.
pub struct InMemorySlidingWindowLimiter {
    keys: Mutex<HashMap<String, KeyState>>,
}

impl Default for InMemorySlidingWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySlidingWindowLimiter {
    /// Creates an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiterStore for InMemorySlidingWindowLimiter {
    async fn check_and_increment(
        &self,
        key: &str,
        window_seconds: u64,
        limit: u64,
        now_ms: i64,
    ) -> Result<RateLimitOutcome, GatewayError> {
        let window_ms = i64::try_from(window_seconds.saturating_mul(1_000))
            .map_err(|_| GatewayError::InternalError("window_seconds overflowed i64 ms".to_string()))?;
        let cutoff = now_ms.saturating_sub(window_ms);

        #[allow(clippy::unwrap_used, reason = "poisoned only on a prior panic; fail-closed callers treat Err the same as a deny")]
        let mut keys = self.keys.lock().unwrap();
        let state = keys.entry(key.to_string()).or_insert_with(|| KeyState {
            calls: VecDeque::new(),
        });

        while matches!(state.calls.front(), Some(ts) if *ts <= cutoff) {
            state.calls.pop_front();
        }

        if state.calls.len() as u64 >= limit {
            let oldest = state.calls.front().copied().unwrap_or(now_ms);
            let retry_after_ms = (oldest + window_ms - now_ms).max(0);
            return Ok(RateLimitOutcome::Limited { retry_after_ms });
        }

        state.calls.push_back(now_ms);
        let remaining = limit.saturating_sub(state.calls.len() as u64);
        Ok(RateLimitOutcome::Admitted { remaining })
    }

    async fn release(&self, key: &str, now_ms: i64) {
        #[allow(clippy::unwrap_used, reason = "poisoned only on a prior panic; a missed release is a bounded over-count, not a correctness issue")]
        let mut keys = self.keys.lock().unwrap();
        if let Some(state) = keys.get_mut(key) {
            if let Some(pos) = state.calls.iter().rposition(|ts| *ts == now_ms) {
                state.calls.remove(pos);
            }
        }
    }
}
