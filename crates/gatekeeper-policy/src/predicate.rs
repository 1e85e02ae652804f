// gatekeeper-policy/src/predicate.rs
// ============================================================================
// Module: Policy Predicate
// Description: The atomic, domain-specific leaves of a rule's requirement
// tree, and their tri-state evaluation against a DecisionInput.
// Purpose: Let PolicyRule compose principal/resource/action matchers with
// the vendored `ret-logic` requirement algebra instead of a flat boolean AND,
// per `SPEC_FULL.md` §4.4.
// Dependencies: gatekeeper_core, ret_logic
// ============================================================================

//! ## Overview
//! `PolicyPredicate::Attribute` is the one leaf that can evaluate to
//! [`TriState::Unknown`] (when the named principal attribute is absent from
//! `DecisionInput::attributes`); every other leaf is a simple equality check
//! against a field that is always present on a resolved `DecisionInput` and
//! so only ever returns `True`/`False`. Composing these through
//! [`ret_logic::tristate::LogicMode::Kleene`] (via [`PolicyRule::requirement`]
//! in `bundle.rs`) means a rule with an unresolved attribute requirement
//! never silently matches: `Unknown` only ever combines to `Unknown` or
//! `False`, never to `True` (the teacher's `GateEvaluator` gives condition
//! evaluation this exact guarantee for gate conditions; this predicate gives
//! policy rule conditions the same one).

use gatekeeper_core::action::Operation;
use gatekeeper_core::decision::DecisionInput;
use gatekeeper_core::principal::TrustLevel;
use gatekeeper_core::resource::Sensitivity;
use ret_logic::traits::Row;
use ret_logic::traits::TriStatePredicateEval;
use ret_logic::tristate::TriState;

/// A single atomic match condition against a `DecisionInput`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PolicyPredicate {
    /// Matches when the principal's role equals the given value.
    Role(String),
    /// Matches when the principal belongs to the given team.
    Team(String),
    /// Matches when the principal's trust level is at least the given level.
    MinTrustLevel(TrustLevel),
    /// Matches when the target resource id equals the given value.
    ResourceId(String),
    /// Matches when the target capability id equals the given value.
    CapabilityId(String),
    /// Matches when the requested operation equals the given value.
    Operation(Operation),
    /// Matches when the resource sensitivity equals the given value.
    Sensitivity(Sensitivity),
    /// Matches when principal attribute `key` is present and equals `value`;
    /// evaluates to `TriState::Unknown` when `key` is absent.
    Attribute {
        /// Attribute key, looked up in `DecisionInput::attributes`.
        key: String,
        /// Expected attribute value.
        value: String,
    },
}

impl TriStatePredicateEval for PolicyPredicate {
    type Reader<'a> = DecisionInput;

    fn eval_row_tristate(&self, reader: &DecisionInput, _row: Row) -> TriState {
        match self {
            Self::Role(role) => (reader.role == *role).into(),
            Self::Team(team) => reader.teams.contains(team).into(),
            Self::MinTrustLevel(min) => (reader.trust_level >= *min).into(),
            Self::ResourceId(id) => (reader.resource_id.as_str() == id).into(),
            Self::CapabilityId(id) => (reader.capability_id.as_str() == id).into(),
            Self::Operation(op) => (reader.operation == *op).into(),
            Self::Sensitivity(sensitivity) => (reader.sensitivity == *sensitivity).into(),
            Self::Attribute { key, value } => match reader.attributes.get(key) {
                None => TriState::Unknown,
                Some(actual) => (actual == value).into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use gatekeeper_core::action::Operation;
    use gatekeeper_core::decision::DecisionInput;
    use gatekeeper_core::identifiers::CapabilityId;
    use gatekeeper_core::identifiers::PolicyVersion;
    use gatekeeper_core::identifiers::PrincipalId;
    use gatekeeper_core::identifiers::ResourceId;
    use gatekeeper_core::principal::TrustLevel;
    use gatekeeper_core::resource::Sensitivity;

    use super::PolicyPredicate;
    use super::TriState;
    use super::TriStatePredicateEval;

    fn input() -> DecisionInput {
        DecisionInput {
            principal_id: PrincipalId::new("user-1"),
            trust_level: TrustLevel::Trusted,
            role: "developer".to_string(),
            teams: BTreeSet::new(),
            resource_id: ResourceId::new("res-1"),
            capability_id: CapabilityId::new("cap-1"),
            operation: Operation::Read,
            sensitivity: Sensitivity::Low,
            attributes: BTreeMap::from([("department".to_string(), "payments".to_string())]),
            policy_version: PolicyVersion::new("v1"),
        }
    }

    #[test]
    fn role_predicate_matches_exact_role() {
        let predicate = PolicyPredicate::Role("developer".to_string());
        assert_eq!(predicate.eval_row_tristate(&input(), 0), TriState::True);
    }

    #[test]
    fn attribute_predicate_is_unknown_when_absent() {
        let predicate = PolicyPredicate::Attribute {
            key: "clearance".to_string(),
            value: "top-secret".to_string(),
        };
        assert_eq!(predicate.eval_row_tristate(&input(), 0), TriState::Unknown);
    }

    #[test]
    fn attribute_predicate_matches_present_value() {
        let predicate = PolicyPredicate::Attribute {
            key: "department".to_string(),
            value: "payments".to_string(),
        };
        assert_eq!(predicate.eval_row_tristate(&input(), 0), TriState::True);
    }

    #[test]
    fn attribute_predicate_false_on_mismatch() {
        let predicate = PolicyPredicate::Attribute {
            key: "department".to_string(),
            value: "legal".to_string(),
        };
        assert_eq!(predicate.eval_row_tristate(&input(), 0), TriState::False);
    }
}
