// gatekeeper-core/src/principal.rs
// ============================================================================
// Module: Gatekeeper Principal Model
// Description: Authenticated caller identity bound by the Principal Resolver.
// Purpose: Provide the immutable per-request identity consumed by every
// downstream pipeline stage.
// Dependencies: crate::identifiers, serde
// ============================================================================

//! ## Overview
//! A [`Principal`] is built once per request by the Principal Resolver and is
//! immutable for the remainder of the request's lifetime. Trust level and
//! attributes are carried through unchanged from the validated token.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::PrincipalId;

/// Principal type, derived from the token/credential class that authenticated
/// the caller.
///
/// # Invariants
/// - Variants are stable for serialization and policy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalType {
    /// A human operator authenticated interactively.
    Human,
    /// An autonomous or semi-autonomous agent.
    Agent,
    /// A backend service acting on its own credentials.
    Service,
    /// A registered device.
    Device,
}

/// Trust level assigned to a principal at resolution time.
///
/// # Invariants
/// - `Trusted` is strictly more trusted than `Limited`, which is strictly
///   more trusted than `Untrusted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// Least trusted; typically unauthenticated or newly provisioned callers.
    Untrusted,
    /// Bounded trust; subject to tighter policy and rate limits.
    Limited,
    /// Fully trusted caller.
    Trusted,
}

/// Authenticated principal bound to a single request.
///
/// # Invariants
/// - Immutable once constructed by the Principal Resolver.
/// - `attributes` values are opaque to the resolver; policy matchers interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier.
    pub id: PrincipalId,
    /// Principal type.
    pub principal_type: PrincipalType,
    /// Role assigned to the principal (e.g. `developer`, `viewer`).
    pub role: String,
    /// Teams the principal belongs to.
    pub teams: Vec<String>,
    /// Trust level assigned at resolution time.
    pub trust_level: TrustLevel,
    /// Additional attributes carried through from the token, unvalidated.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Principal {
    /// Returns true when the principal belongs to the given team.
    #[must_use]
    pub fn is_member_of(&self, team: &str) -> bool {
        self.teams.iter().any(|item| item == team)
    }
}
