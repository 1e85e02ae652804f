// gatekeeper-core/src/invocation.rs
// ============================================================================
// Module: Gatekeeper Invocation Model
// Description: The end-to-end request/result pair carried through the
// Authorization & Invocation Pipeline.
// Purpose: Bind a request id, the resolved principal, the requested action,
// and the eventual adapter outcome into a single traceable unit.
// Dependencies: crate::{action, decision, identifiers, principal, time}
// ============================================================================

//! ## Overview
//! `InvocationRequest` enters the pipeline at the Principal Resolver and
//! `InvocationResult` leaves it at the Adapter Dispatch stage (or earlier, on
//! a fail-closed rejection). Every `InvocationRequest` produces exactly one
//! `AuditEvent` regardless of which stage terminates it (invariant I2).

use serde::Deserialize;
use serde::Serialize;

use crate::action::Action;
use crate::decision::Decision;
use crate::identifiers::CorrelationId;
use crate::identifiers::RequestId;
use crate::principal::Principal;
use crate::time::Timestamp;

/// A single request to invoke a capability, as accepted by the pipeline.
///
/// # Invariants
/// - `request_id` is unique per invocation and is the audit join key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Unique identifier for this invocation, generated at ingress.
    pub request_id: RequestId,
    /// Caller-supplied correlation id for cross-system tracing, if any.
    pub correlation_id: Option<CorrelationId>,
    /// Raw caller credential, opaque to the pipeline until resolved.
    pub credential: String,
    /// The requested action.
    pub action: Action,
    /// When the request was accepted at ingress.
    pub received_at: Timestamp,
}

/// Terminal stage that produced an `InvocationResult`.
///
/// # Invariants
/// - Exactly one `TerminalStage` is recorded per request; it names the stage
///   whose outcome is reflected in `InvocationOutcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStage {
    /// Rejected at the Principal Resolver.
    PrincipalResolver,
    /// Rejected at Capability Lookup.
    CapabilityLookup,
    /// Rejected by the Rate Limiter.
    RateLimiter,
    /// Rejected by the Policy Decision Point.
    Pdp,
    /// Rejected by the Parameter Filter.
    ParameterFilter,
    /// Rejected by Cost Admission.
    CostAdmission,
    /// Completed (successfully or not) at Adapter Dispatch.
    AdapterDispatch,
}

/// The pipeline's terminal outcome for an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum InvocationOutcome {
    /// The adapter returned a successful result payload.
    Success {
        /// Result payload returned by the backend, after any response-side
        /// constraints (e.g. truncation) have been applied.
        payload: serde_json::Value,
    },
    /// The pipeline rejected the request before dispatch, or dispatch failed.
    Rejected {
        /// Machine-readable rejection code (mirrors `GatewayError` variants).
        code: String,
        /// Human-readable explanation.
        message: String,
    },
}

/// The full result of processing an `InvocationRequest`.
///
/// # Invariants
/// - Always paired 1:1 with the `InvocationRequest` that produced it via
///   `request_id`, and always yields exactly one `AuditEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Identifier of the originating request.
    pub request_id: RequestId,
    /// Stage at which the invocation terminated.
    pub terminal_stage: TerminalStage,
    /// The decision reached, when the pipeline got as far as the PDP.
    pub decision: Option<Decision>,
    /// Final outcome.
    pub outcome: InvocationOutcome,
    /// When the result was produced.
    pub completed_at: Timestamp,
}

impl InvocationResult {
    /// Returns true when the invocation completed successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Success { .. })
    }
}
