// gatekeeper-core/src/decision.rs
// ============================================================================
// Module: Gatekeeper Policy Decision Model
// Description: The input the PDP evaluates and the decision it produces.
// Purpose: Provide a stable, canonically hashable decision-cache key and a
// decision result carrying the effect, constraints, and matched rule trail.
// Dependencies: crate::{action, hashing, identifiers, principal, resource, time}
// ============================================================================

//! ## Overview
//! [`DecisionInput`] is hashed with [`crate::hashing::hash_canonical_json`] to
//! form the decision-cache key (invariant I5): semantically equivalent inputs
//! must hash identically regardless of field order or incidental `None`s.
//! [`Decision`] is the PDP's output; `Effect::Deny` always wins ties among
//! same-priority rules, and `constraints` from multiple matching `Allow`
//! rules at the same priority are intersected, never unioned.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::action::Operation;
use crate::identifiers::CapabilityId;
use crate::identifiers::PolicyId;
use crate::identifiers::PolicyVersion;
use crate::identifiers::PrincipalId;
use crate::identifiers::ResourceId;
use crate::principal::TrustLevel;
use crate::resource::Sensitivity;
use crate::time::Timestamp;

/// The canonical, hashable view of a request as seen by the PDP.
///
/// # Invariants
/// - Two `DecisionInput`s that are `==` after JCS canonicalization must be
///   treated as the same cache key (I5); do not add fields here that vary
///   per-call without affecting the decision (e.g. raw argument values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionInput {
    /// Principal requesting the action.
    pub principal_id: PrincipalId,
    /// Principal trust level at resolution time.
    pub trust_level: TrustLevel,
    /// Principal role.
    pub role: String,
    /// Principal team membership, sorted for canonical form stability.
    pub teams: BTreeSet<String>,
    /// Target resource.
    pub resource_id: ResourceId,
    /// Target capability.
    pub capability_id: CapabilityId,
    /// Requested operation.
    pub operation: Operation,
    /// Resource sensitivity at evaluation time.
    pub sensitivity: Sensitivity,
    /// Free-form principal attributes (e.g. `department`, `clearance`),
    /// opaque to the resolver; absent keys evaluate to
    /// `TriState::Unknown` in policy matchers rather than `false` (see
    /// `gatekeeper-policy::predicate`).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Active policy bundle version, included so a bundle replacement
    /// invalidates stale cache entries without an explicit flush.
    pub policy_version: PolicyVersion,
}

/// The effect of a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// The action is permitted, possibly subject to `constraints`.
    Allow,
    /// The action is forbidden.
    Deny,
}

/// A restriction attached to an `Allow` decision.
///
/// # Invariants
/// - When multiple same-priority `Allow` rules match, their constraint sets
///   are intersected (the narrower restriction always wins), never unioned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Constraint {
    /// Caller-visible fields are limited to this explicit allow-list.
    FieldAllowList(BTreeSet<String>),
    /// The named fields must be redacted before dispatch/audit.
    RedactFields(BTreeSet<String>),
    /// A ceiling on cost units consumable by this action.
    MaxCostUnits(u64),
    /// Requires the result payload be truncated to at most this many bytes.
    MaxResponseBytes(u64),
}

/// Why a decision was reached, for audit and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionReason {
    /// Policy rules that matched, in evaluation order.
    pub matched_policies: Vec<PolicyId>,
    /// Human-readable explanation, e.g. `"explicit deny: rule pii-lockdown"`.
    pub explanation: String,
}

/// The PDP's output for a single `DecisionInput`.
///
/// # Invariants
/// - `Effect::Deny` is fail-closed: evaluator errors and timeouts MUST produce
///   a `Deny` decision, never an `Allow`, and that `Deny` MUST NOT be cached
///   (see `gatekeeper-policy::pdp`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Permit or forbid the action.
    pub effect: Effect,
    /// Constraints attached to an `Allow` effect (intersected across
    /// same-priority matches); always empty for `Deny`.
    pub constraints: BTreeSet<Constraint>,
    /// Explanation and matched-rule trail.
    pub reason: DecisionReason,
    /// Policy bundle version this decision was evaluated against.
    pub policy_version: PolicyVersion,
    /// When the decision was produced.
    pub decided_at: Timestamp,
}

impl Decision {
    /// Returns a fail-closed deny decision with the given explanation.
    #[must_use]
    pub fn deny(explanation: impl Into<String>, policy_version: PolicyVersion, at: Timestamp) -> Self {
        Self {
            effect: Effect::Deny,
            constraints: BTreeSet::new(),
            reason: DecisionReason {
                matched_policies: Vec::new(),
                explanation: explanation.into(),
            },
            policy_version,
            decided_at: at,
        }
    }

    /// Returns true when this decision permits the action.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self.effect, Effect::Allow)
    }
}
