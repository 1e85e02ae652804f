// gatekeeper-core/src/time.rs
// ============================================================================
// Module: Gatekeeper Time Model
// Description: Canonical timestamp representation for decisions and audit logs.
// Purpose: Keep the pipeline core free of direct wall-clock reads so tests
// and replay stay deterministic.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Gatekeeper never reads the wall clock inside its core logic; callers (the
//! pipeline driver, adapters, the audit emitter) supply timestamps explicitly.
//! This keeps cache hit/miss behavior, rate-limiter windows, and audit
//! ordering deterministic and replayable in tests.

use serde::Deserialize;
use serde::Serialize;

/// Canonical timestamp used across decisions, audit events, and traces.
///
/// # Invariants
/// - Values are supplied explicitly by callers; monotonicity across a single
///   request is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds (UTC), used for durable audit records.
    UnixMillis(i64),
    /// Monotonic logical tick, used in tests and for cache generation ordering.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as a logical tick when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }

    /// Returns the number of whole milliseconds elapsed between two unix
    /// timestamps, or `None` when either value is logical.
    #[must_use]
    pub const fn millis_since(&self, earlier: &Self) -> Option<i64> {
        match (self, earlier) {
            (Self::UnixMillis(later), Self::UnixMillis(earlier)) => Some(later - earlier),
            _ => None,
        }
    }
}
