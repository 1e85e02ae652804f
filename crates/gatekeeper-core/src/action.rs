// gatekeeper-core/src/action.rs
// ============================================================================
// Module: Gatekeeper Action Model
// Description: The operation a principal requests against a resource.
// Purpose: Carry the operation kind and call arguments through the pipeline
// for policy matching, parameter filtering, and adapter dispatch.
// Dependencies: crate::identifiers, serde
// ============================================================================

//! ## Overview
//! An [`Action`] names the operation kind requested on a resource. It is
//! distinct from [`crate::resource::Capability`]: a capability describes what
//! a resource *can* do; an action describes what a single request *asks* it
//! to do, plus the arguments for that request.

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CapabilityId;
use crate::identifiers::ResourceId;

/// Operation kind requested against a resource.
///
/// # Invariants
/// - Variants are stable for policy matching (`PolicyRule.operations`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Read-only retrieval.
    Read,
    /// Creates or mutates state.
    Write,
    /// Triggers a side-effecting action (e.g. a pipeline run).
    Execute,
    /// Administrative control of the resource itself.
    Control,
    /// Manages resource/capability registration.
    Manage,
    /// Reads or exports audit records.
    Audit,
}

/// A single requested operation against a resource, with arguments.
///
/// # Invariants
/// - `capability_id` must belong to `resource_id` (enforced by Capability
///   Lookup before the action reaches the PDP).
/// - `parameters` is the pre-filter payload; the Parameter Filter produces a
///   redacted copy for dispatch and audit, never mutating this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Target resource identifier.
    pub resource_id: ResourceId,
    /// Target capability identifier.
    pub capability_id: CapabilityId,
    /// Requested operation kind.
    pub operation: Operation,
    /// Call arguments as supplied by the caller, prior to filtering.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}
