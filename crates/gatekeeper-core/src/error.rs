// gatekeeper-core/src/error.rs
// ============================================================================
// Module: Gatekeeper Error Taxonomy
// Description: The top-level error sum type surfaced to callers and recorded
// in audit events.
// Purpose: Give every pipeline stage a shared vocabulary of rejection
// reasons so outcome codes stay stable across stages and across the audit
// trail.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every rejection path in the pipeline resolves to one `GatewayError`
//! variant. `code()` returns the stable machine-readable string stored in
//! `AuditEvent::outcome_code`; never change an existing variant's code once
//! it has shipped, since it is part of the audit record's external contract.

use thiserror::Error;

/// Top-level pipeline error.
///
/// # Invariants
/// - Every variant maps to exactly one stable `code()` string, independent of
///   the `Display` message.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Principal resolution failed (missing, malformed, or expired credential).
    #[error("authentication failed: {0}")]
    AuthError(String),
    /// The requested resource or capability does not exist, or is
    /// decommissioned.
    #[error("not found: {0}")]
    NotFound(String),
    /// The Policy Decision Point denied the action.
    #[error("denied: {0}")]
    Denied(String),
    /// The Policy Decision Point's evaluator returned an error; fail-closed
    /// to `Deny` without caching the result.
    #[error("policy evaluation failed: {0}")]
    EvaluationError(String),
    /// The Policy Decision Point's evaluator did not respond within
    /// `PdpConfig::evaluation_timeout_ms`; fail-closed to `Deny` without
    /// caching the result.
    #[error("policy evaluation deadline exceeded after {elapsed_ms}ms")]
    EvaluationTimeout {
        /// Configured evaluation timeout that elapsed.
        elapsed_ms: i64,
    },
    /// The caller exceeded its rate limit.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Milliseconds the caller should wait before retrying.
        retry_after_ms: i64,
    },
    /// Cost Admission rejected the action for exceeding a budget ceiling.
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),
    /// Request parameters failed schema or filter validation.
    #[error("validation failed: {0}")]
    ValidationError(String),
    /// The resource's circuit breaker is open.
    #[error("circuit open for resource {resource_id}")]
    CircuitOpen {
        /// Resource whose breaker is open.
        resource_id: String,
    },
    /// The backend adapter returned an error.
    #[error("upstream error: {0}")]
    UpstreamError(String),
    /// A pipeline stage exceeded its deadline.
    #[error("timeout after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: i64,
    },
    /// An unexpected internal failure; always fail-closed.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl GatewayError {
    /// Returns the stable machine-readable outcome code for this error,
    /// recorded verbatim in `AuditEvent::outcome_code`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AuthError(_) => "auth_error",
            Self::NotFound(_) => "not_found",
            Self::Denied(_) => "denied",
            Self::EvaluationError(_) => "evaluation_error",
            Self::EvaluationTimeout { .. } => "deadline_exceeded",
            Self::RateLimited { .. } => "rate_limited",
            Self::BudgetExceeded(_) => "budget_exceeded",
            Self::ValidationError(_) => "validation_error",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::UpstreamError(_) => "upstream_error",
            Self::Timeout { .. } => "timeout",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Returns true when the error represents a condition safe to retry
    /// (transient upstream/timeout/circuit conditions), as opposed to a
    /// definitive policy or validation rejection.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamError(_) | Self::Timeout { .. } | Self::CircuitOpen { .. }
        )
    }
}
