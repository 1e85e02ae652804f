// gatekeeper-core/src/resource.rs
// ============================================================================
// Module: Gatekeeper Resource & Capability Model
// Description: Backend endpoints and the operations invokable on them.
// Purpose: Provide the canonical Resource/Capability schema used by capability
// lookup, the PDP, and adapter dispatch.
// Dependencies: crate::identifiers, serde
// ============================================================================

//! ## Overview
//! A [`Resource`] is a backend endpoint reachable through a protocol adapter.
//! A [`Capability`] is owned by exactly one resource (parent-owns-child; the
//! capability holds a back-reference by id, never a cycle) and is the unit an
//! `InvocationRequest` names.

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CapabilityId;
use crate::identifiers::ResourceId;

/// Wire protocol used to reach a resource.
///
/// # Invariants
/// - Variants are stable for serialization, config, and adapter-registry
///   lookup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Model Context Protocol backend.
    Mcp,
    /// Plain HTTP/JSON backend.
    Http,
    /// gRPC backend.
    Grpc,
}

/// Data sensitivity classification shared by resources and capabilities.
///
/// # Invariants
/// - Ordered from least to most sensitive; `Critical` is the strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    /// Public or non-sensitive data.
    Low,
    /// Internal data requiring authentication.
    Medium,
    /// Sensitive data requiring elevated trust.
    High,
    /// Highly sensitive data; strictest policy and audit posture.
    Critical,
}

/// Backend resource status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Resource is active and may be invoked.
    Active,
    /// Resource is scheduled for removal but still reachable.
    Deprecated,
    /// Resource has been permanently removed; lookups must fail closed.
    Decommissioned,
}

/// Backend endpoint reachable through a protocol adapter.
///
/// # Invariants
/// - `status == Decommissioned` must cause capability lookup to fail closed
///   rather than silently skip the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier.
    pub id: ResourceId,
    /// Protocol used to reach the resource.
    pub protocol: Protocol,
    /// Endpoint address (URL, MCP namespace, or gRPC target) interpreted by
    /// the adapter bound to `protocol`.
    pub endpoint: String,
    /// Resource-level sensitivity classification.
    pub sensitivity: Sensitivity,
    /// Resource lifecycle status.
    pub status: ResourceStatus,
    /// Free-form metadata describing the resource, unvalidated.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Streaming mode a capability supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingMode {
    /// No streaming; unary request/response only.
    None,
    /// Server streams frames back to the caller.
    Server,
    /// Caller streams frames to the server.
    Client,
    /// Both directions stream concurrently.
    Bidi,
}

/// Invokable operation owned by a [`Resource`].
///
/// # Invariants
/// - `resource_id` must reference an existing, non-decommissioned resource.
/// - Lifetime is bound to the owning resource (no independent lifecycle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability identifier.
    pub id: CapabilityId,
    /// Owning resource identifier (back-reference, not ownership).
    pub resource_id: ResourceId,
    /// Capability name as exposed to callers.
    pub name: String,
    /// JSON Schema describing accepted arguments.
    pub input_schema: serde_json::Value,
    /// JSON Schema describing the result payload.
    pub output_schema: serde_json::Value,
    /// Capability-level sensitivity classification.
    pub sensitivity: Sensitivity,
    /// Streaming support for this capability.
    pub streaming: StreamingMode,
    /// Whether repeated invocation with the same arguments is safe to retry.
    #[serde(default)]
    pub idempotent: bool,
    /// Whether invoking this capability bears an estimable cost subject to
    /// budget ceilings (see Cost Admission, `spec.md` §4.6).
    #[serde(default)]
    pub cost_bearing: bool,
}
