// gatekeeper-pipeline/src/metrics.rs
// ============================================================================
// Module: Pipeline Telemetry
// Description: Observability hooks for the Authorization & Invocation
// Pipeline.
// Purpose: Provide request counters and latency observations without a hard
// dependency on a metrics backend.
// Dependencies: gatekeeper_core
// ============================================================================

//! ## Overview
//! Grounded on the teacher's `decision-gate-mcp::telemetry` module: a thin,
//! dependency-light metrics trait so a deployment can plug in Prometheus or
//! OpenTelemetry without redesigning the pipeline. The gateway never writes
//! to stdout/stderr for request-level events (`print_stdout`/`print_stderr`
//! are workspace-lint-denied); every stage reports through this trait or
//! through `gatekeeper_core::audit::AuditEvent` instead.

use std::time::Duration;

use gatekeeper_core::identifiers::CapabilityId;
use gatekeeper_core::identifiers::ResourceId;
use gatekeeper_core::invocation::TerminalStage;

/// Pipeline request outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The request completed successfully.
    Success,
    /// The request was rejected or failed at some stage.
    Error,
}

/// Pipeline request metric event payload.
///
/// # Invariants
/// - `resource_id`/`capability_id` are `None` when the request terminated
///   before Capability Lookup resolved them.
#[derive(Debug, Clone)]
pub struct PipelineMetricEvent {
    /// Stage at which the request terminated.
    pub terminal_stage: TerminalStage,
    /// Resource targeted, when resolved.
    pub resource_id: Option<ResourceId>,
    /// Capability targeted, when resolved.
    pub capability_id: Option<CapabilityId>,
    /// Request outcome.
    pub outcome: PipelineOutcome,
    /// Stable machine-readable outcome code, mirroring `GatewayError::code()`.
    pub outcome_code: &'static str,
}

/// Metrics sink for pipeline requests and latencies.
pub trait PipelineMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: PipelineMetricEvent);
    /// Records a latency observation for the request.
    fn record_latency(&self, event: PipelineMetricEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl PipelineMetrics for NoopMetrics {
    fn record_request(&self, _event: PipelineMetricEvent) {}

    fn record_latency(&self, _event: PipelineMetricEvent, _latency: Duration) {}
}
