// gatekeeper-limits/src/cost.rs
// ============================================================================
// Module: Cost Admission
// Description: Enforces per-principal cost budget ceilings for cost-bearing
// capabilities (spec.md §4.6), independent of the call-count rate limiter.
// Purpose: Reject invocations that would push a principal's rolling cost
// total, within a budget window, past its ceiling.
// Dependencies: gatekeeper_core, std::sync::Mutex
// ============================================================================

//! ## Overview
//! Unlike the call-count rate limiter, cost admission tracks a *weighted*
//! rolling sum: every admitted call contributes `cost_units` (from the
//! capability or an explicit `Constraint::MaxCostUnits` override) rather
//! than a flat `1`. The sliding window mechanics are otherwise identical —
//! entries older than `window_seconds` are evicted before the ceiling check.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use gatekeeper_core::error::GatewayError;

/// Outcome of a cost admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostOutcome {
    /// The call is admitted; `remaining_units` are left in the budget window.
    Admitted {
        /// Budget units remaining in the window after this call.
        remaining_units: u64,
    },
    /// The call would exceed the budget ceiling.
    Exceeded {
        /// Milliseconds until enough budget frees up to admit this cost.
        retry_after_ms: i64,
    },
}

struct KeyState {
    spent: VecDeque<(i64, u64)>,
    running_total: u64,
}

/// In-process rolling cost ledger.
///
/// # Invariants
/// - A call whose `cost_units` alone exceeds `max_units` can never be
///   admitted regardless of window occupancy (no single call may exceed the
///   ceiling outright).
pub struct InMemoryCostLedger {
    keys: Mutex<HashMap<String, KeyState>>,
}

impl Default for InMemoryCostLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCostLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Checks and, if admitted, records `cost_units` against `key` at
    /// `now_ms` within a rolling `window_seconds` budget of `max_units`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InternalError`] on an internal overflow;
    /// callers must treat this as fail-closed.
    pub fn check_and_consume(
        &self,
        key: &str,
        window_seconds: u64,
        max_units: u64,
        cost_units: u64,
        now_ms: i64,
    ) -> Result<CostOutcome, GatewayError> {
        if cost_units > max_units {
            return Ok(CostOutcome::Exceeded {
                retry_after_ms: i64::try_from(window_seconds.saturating_mul(1_000))
                    .unwrap_or(i64::MAX),
            });
        }

        let window_ms = i64::try_from(window_seconds.saturating_mul(1_000))
            .map_err(|_| GatewayError::InternalError("window_seconds overflowed i64 ms".to_string()))?;
        let cutoff = now_ms.saturating_sub(window_ms);

        #[allow(clippy::unwrap_used, reason = "poisoned only on a prior panic; fail-closed callers treat Err the same as a deny")]
        let mut keys = self.keys.lock().unwrap();
        let state = keys.entry(key.to_string()).or_insert_with(|| KeyState {
            spent: VecDeque::new(),
            running_total: 0,
        });

        while matches!(state.spent.front(), Some((ts, _)) if *ts <= cutoff) {
            if let Some((_, units)) = state.spent.pop_front() {
                state.running_total = state.running_total.saturating_sub(units);
            }
        }

        if state.running_total.saturating_add(cost_units) > max_units {
            let oldest_ts = state.spent.front().map_or(now_ms, |(ts, _)| *ts);
            let retry_after_ms = (oldest_ts + window_ms - now_ms).max(0);
            return Ok(CostOutcome::Exceeded { retry_after_ms });
        }

        state.spent.push_back((now_ms, cost_units));
        state.running_total = state.running_total.saturating_add(cost_units);
        Ok(CostOutcome::Admitted {
            remaining_units: max_units.saturating_sub(state.running_total),
        })
    }
}
