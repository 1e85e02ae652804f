// gatekeeper-audit/tests/siem_outage.rs
// ============================================================================
// Module: SIEM Outage Integration Test
// Description: Exercises a real AuditEmitter + SiemSink composition against
// a perpetually-failing local HTTP endpoint.
// Purpose: spec.md §8 scenario 5 requires that a SIEM sink outage trips the
// sink's breaker and counts dropped batches without starving the local
// audit store.
// Dependencies: gatekeeper-audit, tiny_http (local failing endpoint)
// ============================================================================

//! Integration test for SIEM fan-out behavior during a sink outage.

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

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gatekeeper_adapters::auth::AuthScheme;
use gatekeeper_adapters::retry::RetryConfig;
use gatekeeper_audit::AuditEmitter;
use gatekeeper_audit::EmitterConfig;
use gatekeeper_audit::InMemoryAuditStore;
use gatekeeper_audit::SiemSink;
use gatekeeper_audit::SiemSinkConfig;
use gatekeeper_core::breaker::BreakerConfig;
use gatekeeper_core::identifiers::AuditEventId;
use gatekeeper_core::identifiers::CapabilityId;
use gatekeeper_core::identifiers::PrincipalId;
use gatekeeper_core::identifiers::RequestId;
use gatekeeper_core::identifiers::ResourceId;
use gatekeeper_core::identifiers::SinkId;
use gatekeeper_core::interfaces::AuditSink;
use gatekeeper_core::invocation::TerminalStage;
use gatekeeper_core::principal::TrustLevel;
use gatekeeper_core::resource::Sensitivity;
use gatekeeper_core::time::Timestamp;
use gatekeeper_core::Operation;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;

/// Spawns a local server that answers every request it receives with a 500.
/// Breaker configuration in this test trips after the first failure, so
/// exactly one request ever reaches it — the loop bounds how many it will
/// serve before exiting, matching the outage's real shape (the endpoint is
/// up, not unreachable, and keeps erroring for as long as callers keep
/// probing it).
fn spawn_failing_endpoint(requests_to_serve: usize) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("bind local http server");
    let addr = server.server_addr().to_ip().expect("ip address");
    let url = format!("http://{addr}");

    let handle = thread::spawn(move || {
        for _ in 0..requests_to_serve {
            if let Ok(request) = server.recv() {
                let response = Response::from_string("server error").with_status_code(StatusCode(500));
                let _ = request.respond(response);
            }
        }
    });

    (url, handle)
}

fn sample_event(tag: &str) -> gatekeeper_core::audit::AuditEvent {
    let received_at = Timestamp::UnixMillis(1_000);
    let completed_at = Timestamp::UnixMillis(1_010);
    gatekeeper_core::audit::AuditEvent {
        id: AuditEventId::new(format!("evt-{tag}")),
        request_id: RequestId::new(tag.to_string()),
        correlation_id: None,
        principal_id: PrincipalId::new("principal-1"),
        trust_level: TrustLevel::Trusted,
        resource_id: ResourceId::new("resource-1"),
        capability_id: CapabilityId::new("capability-1"),
        operation: Operation::Read,
        sensitivity: Sensitivity::Low,
        effect: Some(gatekeeper_core::decision::Effect::Allow),
        matched_policies: Vec::new(),
        terminal_stage: TerminalStage::AdapterDispatch,
        outcome_code: "success".to_string(),
        parameters: serde_json::Map::new(),
        content_hash: gatekeeper_core::hashing::HashDigest::new(gatekeeper_core::hashing::HashAlgorithm::Sha256, tag.as_bytes()),
        received_at,
        completed_at,
        latency_ms: gatekeeper_core::audit::AuditEvent::compute_latency_ms(&received_at, &completed_at),
        retention_until: None,
    }
}

#[tokio::test]
async fn siem_outage_drops_batches_but_local_store_still_grows() {
    let (endpoint, handle) = spawn_failing_endpoint(1);

    let sink_config = SiemSinkConfig {
        id: SinkId::new("test-sink"),
        endpoint,
        batch_size: 1,
        flush_ms: 5,
        compression_threshold_bytes: 1_000_000,
        retry: RetryConfig {
            max_attempts: 1,
            base_delay_ms: 1,
            max_delay_ms: 1,
        },
        breaker: BreakerConfig {
            failure_threshold: 1,
            cooldown_ms: 60_000,
            half_open_probes: 1,
        },
    };
    let sink = Arc::new(SiemSink::new(sink_config, AuthScheme::None).expect("sink config is valid"));

    let store = Arc::new(InMemoryAuditStore::new());
    let emitter = AuditEmitter::spawn_with_sinks(
        EmitterConfig {
            queue_capacity: 100,
            batch_size: 1,
            flush_ms: 5,
        },
        Arc::clone(&store),
        vec![Arc::clone(&sink)],
    );

    for i in 0..5 {
        emitter.emit(sample_event(&i.to_string())).await.expect("emit never fails");
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(store.len(), 5, "local audit store must still receive every event while the SIEM sink is down");
    let stats = sink.stats();
    assert!(stats.batches_dropped > 0, "the failing SIEM sink must count dropped batches");

    emitter.shutdown().await;
    handle.join().expect("endpoint thread");
}
