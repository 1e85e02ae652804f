// gatekeeper-core/src/breaker.rs
// ============================================================================
// Module: Gatekeeper Circuit Breaker
// Description: Shared closed/open/half-open state machine for Adapter
// Dispatch (spec.md §4.7) and SIEM sink fan-out (spec.md §4.8).
// Purpose: Provide one breaker implementation both call sites reuse, per the
// spec's explicit note that they share "identical state machine".
// Dependencies: crate::time
// ============================================================================

//! ## Overview
//! The breaker is driven entirely by explicit `Timestamp`s supplied by the
//! caller (no wall-clock reads; see [`crate::time`]), and by outcome reports
//! (`record_success`/`record_failure`) made after each attempt. Internal
//! counters use atomics so a breaker can be shared behind an `Arc` across
//! concurrent dispatch tasks without an external mutex.

use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;

/// Breaker configuration.
///
/// # Invariants
/// - `failure_threshold >= 1` and `half_open_probes >= 1`; `validate()`
///   enforces this so a misconfigured breaker cannot silently never trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures (while closed) before the breaker opens.
    pub failure_threshold: u32,
    /// Milliseconds to wait after opening before allowing a probe.
    pub cooldown_ms: i64,
    /// Consecutive successful probes required to close from half-open.
    pub half_open_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 1_000,
            half_open_probes: 2,
        }
    }
}

impl BreakerConfig {
    /// Minimum permitted `failure_threshold`.
    pub const MIN_FAILURE_THRESHOLD: u32 = 1;
    /// Minimum permitted `half_open_probes`.
    pub const MIN_HALF_OPEN_PROBES: u32 = 1;

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BreakerConfigError`] when a field is out of range.
    pub fn validate(&self) -> Result<(), BreakerConfigError> {
        if self.failure_threshold < Self::MIN_FAILURE_THRESHOLD {
            return Err(BreakerConfigError::FailureThresholdTooLow {
                got: self.failure_threshold,
                min: Self::MIN_FAILURE_THRESHOLD,
            });
        }
        if self.half_open_probes < Self::MIN_HALF_OPEN_PROBES {
            return Err(BreakerConfigError::HalfOpenProbesTooLow {
                got: self.half_open_probes,
                min: Self::MIN_HALF_OPEN_PROBES,
            });
        }
        if self.cooldown_ms < 0 {
            return Err(BreakerConfigError::NegativeCooldown { got: self.cooldown_ms });
        }
        Ok(())
    }
}

/// Errors returned by [`BreakerConfig::validate`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum BreakerConfigError {
    /// `failure_threshold` was below the allowed minimum.
    #[error("failure_threshold {got} is below minimum {min}")]
    FailureThresholdTooLow {
        /// Configured value.
        got: u32,
        /// Minimum allowed value.
        min: u32,
    },
    /// `half_open_probes` was below the allowed minimum.
    #[error("half_open_probes {got} is below minimum {min}")]
    HalfOpenProbesTooLow {
        /// Configured value.
        got: u32,
        /// Minimum allowed value.
        min: u32,
    },
    /// `cooldown_ms` was negative.
    #[error("cooldown_ms {got} must not be negative")]
    NegativeCooldown {
        /// Configured value.
        got: i64,
    },
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Requests pass through; failures accumulate toward the threshold.
    Closed,
    /// Requests are rejected immediately until the cooldown elapses.
    Open,
    /// A bounded number of probe requests are allowed through.
    HalfOpen,
}

const STATE_CLOSED: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_HALF_OPEN: u8 = 2;

/// Shared closed/open/half-open circuit breaker.
///
/// # Invariants
/// - `try_acquire` is the single gate: callers must not dispatch unless it
///   returns `true`, and must report the outcome via `record_success` /
///   `record_failure` afterward.
/// - All mutation is lock-free; concurrent callers never observe a torn
///   state, though the exact interleaving of who wins a given transition is
///   unspecified (matches spec.md §5's "contended transitions resolve to the
///   stricter state" note).
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    opened_at_ms: AtomicI64,
    half_open_inflight: AtomicU32,
}

impl CircuitBreaker {
    /// Creates a new breaker in the closed state.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(STATE_CLOSED),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            opened_at_ms: AtomicI64::new(0),
            half_open_inflight: AtomicU32::new(0),
        }
    }

    /// Returns the current observable state.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => BreakerState::Open,
            STATE_HALF_OPEN => BreakerState::HalfOpen,
            _ => BreakerState::Closed,
        }
    }

    /// Attempts to acquire permission to dispatch at `now_ms` (unix millis).
    ///
    /// Transitions `Open` to `HalfOpen` once the cooldown has elapsed, and
    /// bounds the number of concurrent half-open probes to
    /// `config.half_open_probes`.
    #[must_use]
    pub fn try_acquire(&self, now_ms: i64) -> bool {
        match self.state.load(Ordering::Acquire) {
            STATE_CLOSED => true,
            STATE_OPEN => {
                let opened_at = self.opened_at_ms.load(Ordering::Acquire);
                if now_ms.saturating_sub(opened_at) < self.config.cooldown_ms {
                    return false;
                }
                if self
                    .state
                    .compare_exchange(
                        STATE_OPEN,
                        STATE_HALF_OPEN,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    self.consecutive_successes.store(0, Ordering::Release);
                    self.half_open_inflight.store(0, Ordering::Release);
                }
                self.acquire_half_open_slot()
            }
            _ => self.acquire_half_open_slot(),
        }
    }

    fn acquire_half_open_slot(&self) -> bool {
        let mut inflight = self.half_open_inflight.load(Ordering::Acquire);
        loop {
            if inflight >= self.config.half_open_probes {
                return false;
            }
            match self.half_open_inflight.compare_exchange(
                inflight,
                inflight + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => inflight = observed,
            }
        }
    }

    /// Records a successful dispatch.
    pub fn record_success(&self) {
        match self.state.load(Ordering::Acquire) {
            STATE_HALF_OPEN => {
                self.half_open_inflight.fetch_sub(1, Ordering::AcqRel);
                let successes = self.consecutive_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.half_open_probes {
                    self.state.store(STATE_CLOSED, Ordering::Release);
                    self.consecutive_failures.store(0, Ordering::Release);
                    self.consecutive_successes.store(0, Ordering::Release);
                }
            }
            _ => {
                self.consecutive_failures.store(0, Ordering::Release);
            }
        }
    }

    /// Records a failed dispatch at `now_ms` (unix millis).
    pub fn record_failure(&self, now_ms: i64) {
        match self.state.load(Ordering::Acquire) {
            STATE_HALF_OPEN => {
                self.half_open_inflight.fetch_sub(1, Ordering::AcqRel);
                self.trip(now_ms);
            }
            STATE_CLOSED => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    self.trip(now_ms);
                }
            }
            STATE_OPEN => {}
            _ => {}
        }
    }

    fn trip(&self, now_ms: i64) {
        self.state.store(STATE_OPEN, Ordering::Release);
        self.opened_at_ms.store(now_ms, Ordering::Release);
        self.consecutive_successes.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::BreakerConfig;
    use super::BreakerState;
    use super::CircuitBreaker;

    fn config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            cooldown_ms: 1_000,
            half_open_probes: 2,
        }
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(config());
        assert!(breaker.try_acquire(0));
        breaker.record_failure(0);
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure(0);
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure(0);
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.try_acquire(0));
    }

    #[test]
    fn half_opens_after_cooldown_and_closes_after_probes() {
        let breaker = CircuitBreaker::new(config());
        breaker.record_failure(0);
        breaker.record_failure(0);
        breaker.record_failure(0);
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.try_acquire(500));
        assert!(breaker.try_acquire(1_000));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(breaker.try_acquire(1_000));
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(config());
        breaker.record_failure(0);
        breaker.record_failure(0);
        breaker.record_failure(0);
        assert!(breaker.try_acquire(1_000));
        breaker.record_failure(1_000);
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.try_acquire(1_000));
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = config();
        cfg.failure_threshold = 0;
        assert!(cfg.validate().is_err());
    }
}
