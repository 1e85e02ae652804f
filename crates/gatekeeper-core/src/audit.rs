// gatekeeper-core/src/audit.rs
// ============================================================================
// Module: Gatekeeper Audit Event Model
// Description: The durable record emitted for every invocation, regardless of
// which pipeline stage terminated it.
// Purpose: Provide a single canonical event shape for the bounded in-process
// queue, the audit store, and SIEM fan-out.
// Dependencies: crate::{decision, hashing, identifiers, invocation, principal,
// resource, time}
// ============================================================================

//! ## Overview
//! One [`AuditEvent`] is emitted per `InvocationRequest` (invariant I2), built
//! from the already-redacted action parameters (the Parameter Filter's output,
//! never the raw request). `content_hash` is computed over the canonical JSON
//! of the event's caller-visible fields so a SIEM consumer can detect
//! replay/duplication independent of transport.

use serde::Deserialize;
use serde::Serialize;

use crate::action::Operation;
use crate::decision::Effect;
use crate::hashing::HashDigest;
use crate::identifiers::AuditEventId;
use crate::identifiers::CapabilityId;
use crate::identifiers::CorrelationId;
use crate::identifiers::PolicyId;
use crate::identifiers::PrincipalId;
use crate::identifiers::RequestId;
use crate::identifiers::ResourceId;
use crate::invocation::TerminalStage;
use crate::principal::TrustLevel;
use crate::resource::Sensitivity;
use crate::time::Timestamp;

/// Durable record of a single invocation's outcome.
///
/// # Invariants
/// - Exactly one `AuditEvent` is emitted per `InvocationRequest` (I2).
/// - `parameters` holds the Parameter Filter's redacted copy, never raw
///   caller arguments.
/// - Emission is fail-closed at the pipeline boundary: if the audit queue is
///   unreachable the *request* must still fail closed, but the emitter itself
///   never blocks the request path (it drops the oldest queued event instead;
///   see `gatekeeper-audit::emitter`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique audit event identifier.
    pub id: AuditEventId,
    /// Originating request identifier.
    pub request_id: RequestId,
    /// Caller-supplied correlation id, if any.
    pub correlation_id: Option<CorrelationId>,
    /// Resolved principal.
    pub principal_id: PrincipalId,
    /// Principal trust level at resolution time.
    pub trust_level: TrustLevel,
    /// Target resource.
    pub resource_id: ResourceId,
    /// Target capability.
    pub capability_id: CapabilityId,
    /// Requested operation.
    pub operation: Operation,
    /// Resource sensitivity at evaluation time.
    pub sensitivity: Sensitivity,
    /// Decision effect, when the pipeline reached the PDP.
    pub effect: Option<Effect>,
    /// Policy rules that matched the decision, when applicable.
    #[serde(default)]
    pub matched_policies: Vec<PolicyId>,
    /// Stage at which the invocation terminated.
    pub terminal_stage: TerminalStage,
    /// Machine-readable outcome code (mirrors `GatewayError` variants, or
    /// `"success"`).
    pub outcome_code: String,
    /// Redacted call arguments, as produced by the Parameter Filter.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Content hash over the caller-visible fields, for dedup/replay checks.
    pub content_hash: HashDigest,
    /// When the request was received.
    pub received_at: Timestamp,
    /// When the pipeline finished processing the request.
    pub completed_at: Timestamp,
    /// End-to-end latency in milliseconds, when both timestamps are
    /// wall-clock (`Timestamp::UnixMillis`).
    pub latency_ms: Option<i64>,
    /// Timestamp after which a retention policy may purge this event.
    /// Carried through from the original system; enforcement is out of scope
    /// (see `SPEC_FULL.md` §3).
    pub retention_until: Option<Timestamp>,
}

impl AuditEvent {
    /// Computes `latency_ms` from `received_at`/`completed_at`.
    #[must_use]
    pub const fn compute_latency_ms(received_at: &Timestamp, completed_at: &Timestamp) -> Option<i64> {
        completed_at.millis_since(received_at)
    }
}
