// gatekeeper-audit/src/lib.rs
// ============================================================================
// Crate: gatekeeper-audit
// Description: Audit Emitter — bounded local queue, append-only store, and
// SIEM fan-out.
// ============================================================================

//! Audit Emitter implementation for the Gatekeeper gateway.
//!
//! [`emitter::AuditEmitter`] implements
//! [`gatekeeper_core::interfaces::AuditSink`] over a bounded, drop-oldest
//! in-process queue drained by a single writer task. Each flushed batch is
//! appended to an [`store::AuditStore`] and, when configured, forwarded to
//! one or more [`siem::SiemSink`]s.

pub mod emitter;
pub mod siem;
pub mod store;

pub use emitter::AuditEmitter;
pub use emitter::EmitterConfig;
pub use emitter::EmitterStats;
pub use siem::SiemSink;
pub use siem::SiemSinkConfig;
pub use siem::SiemSinkStats;
pub use store::AuditStore;
pub use store::InMemoryAuditStore;

#[cfg(test)]
pub(crate) mod test_support {
    use gatekeeper_core::action::Operation;
    use gatekeeper_core::audit::AuditEvent;
    use gatekeeper_core::decision::Effect;
    use gatekeeper_core::hashing::HashAlgorithm;
    use gatekeeper_core::hashing::HashDigest;
    use gatekeeper_core::identifiers::AuditEventId;
    use gatekeeper_core::identifiers::CapabilityId;
    use gatekeeper_core::identifiers::PrincipalId;
    use gatekeeper_core::identifiers::RequestId;
    use gatekeeper_core::identifiers::ResourceId;
    use gatekeeper_core::invocation::TerminalStage;
    use gatekeeper_core::principal::TrustLevel;
    use gatekeeper_core::resource::Sensitivity;
    use gatekeeper_core::time::Timestamp;

    /// Builds a minimal, deterministic `AuditEvent` for tests, tagged by
    /// `tag` in both `id` and `request_id` so assertions can tell events
    /// apart.
    pub(crate) fn sample_event(tag: &str) -> AuditEvent {
        let received_at = Timestamp::UnixMillis(1_000);
        let completed_at = Timestamp::UnixMillis(1_010);
        AuditEvent {
            id: AuditEventId::new(format!("evt-{tag}")),
            request_id: RequestId::new(tag.to_string()),
            correlation_id: None,
            principal_id: PrincipalId::new("principal-1"),
            trust_level: TrustLevel::Trusted,
            resource_id: ResourceId::new("resource-1"),
            capability_id: CapabilityId::new("capability-1"),
            operation: Operation::Read,
            sensitivity: Sensitivity::Low,
            effect: Some(Effect::Allow),
            matched_policies: Vec::new(),
            terminal_stage: TerminalStage::AdapterDispatch,
            outcome_code: "success".to_string(),
            parameters: serde_json::Map::new(),
            content_hash: HashDigest::new(HashAlgorithm::Sha256, tag.as_bytes()),
            received_at,
            completed_at,
            latency_ms: AuditEvent::compute_latency_ms(&received_at, &completed_at),
            retention_until: None,
        }
    }
}
