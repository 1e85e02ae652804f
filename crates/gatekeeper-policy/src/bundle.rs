// gatekeeper-policy/src/bundle.rs
// ============================================================================
// Module: Policy Bundle
// Description: Ordered, priority-grouped policy rules evaluated against a
// DecisionInput.
// Purpose: Provide the static rule matcher behind the default PolicyEvaluator,
// with explicit-deny-wins tie-break and constraint-intersection composition.
// Dependencies: gatekeeper_core, serde
// ============================================================================

//! ## Overview
//! Rules are grouped by `priority` (higher evaluates first). Within the
//! highest priority group that has at least one match: if any matching rule
//! is `Deny`, the bundle denies (explicit-deny-wins); otherwise every
//! matching rule is `Allow` and the decision's constraints are the
//! intersection of their constraint sets (narrower restriction always wins,
//! per `spec.md` §4.4). If no rule matches at any priority, `default_effect`
//! applies with no constraints.
//!
//! A rule's selector fields are compiled into a [`Requirement<PolicyPredicate>`]
//! (each non-empty field becomes an OR-group of its values, and the
//! non-empty groups are AND-ed together) and evaluated with
//! [`Requirement::eval_tristate`] under [`LogicMode::Kleene`]: a rule matches
//! only when the tree evaluates to `TriState::True`. A missing principal
//! attribute referenced by `attributes` makes the tree evaluate to `Unknown`
//! rather than `False`, and Kleene `And`/`Or` never upgrade `Unknown` to
//! `True`, so an attribute-gated rule never matches on missing evidence.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use gatekeeper_core::decision::Constraint;
use gatekeeper_core::decision::Decision;
use gatekeeper_core::decision::DecisionInput;
use gatekeeper_core::decision::DecisionReason;
use gatekeeper_core::decision::Effect;
use gatekeeper_core::identifiers::PolicyId;
use gatekeeper_core::identifiers::PolicyVersion;
use gatekeeper_core::principal::TrustLevel;
use gatekeeper_core::resource::Sensitivity;
use gatekeeper_core::time::Timestamp;
use gatekeeper_core::Operation;
use ret_logic::requirement::Requirement;
use ret_logic::tristate::LogicMode;
use ret_logic::tristate::TriState;
use serde::Deserialize;
use serde::Serialize;

use crate::predicate::PolicyPredicate;

/// A single policy rule.
///
/// # Invariants
/// - At least one selector field must be non-empty (`validate()` enforces
///   this), so a rule can never match every input by accident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Stable rule identifier, recorded in `Decision::reason`.
    pub id: PolicyId,
    /// Evaluation priority; higher values are considered first.
    #[serde(default)]
    pub priority: i32,
    /// Effect applied when this rule matches.
    pub effect: Effect,
    /// Constraints attached when `effect == Allow`.
    #[serde(default)]
    pub constraints: BTreeSet<Constraint>,
    /// Roles this rule applies to; empty matches any role.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Teams this rule applies to; empty matches any team membership.
    #[serde(default)]
    pub teams: Vec<String>,
    /// Minimum trust level required for this rule to match.
    #[serde(default)]
    pub min_trust_level: Option<TrustLevel>,
    /// Resource ids this rule applies to; empty matches any resource.
    #[serde(default)]
    pub resource_ids: Vec<String>,
    /// Capability ids this rule applies to; empty matches any capability.
    #[serde(default)]
    pub capability_ids: Vec<String>,
    /// Operations this rule applies to; empty matches any operation.
    #[serde(default)]
    pub operations: Vec<Operation>,
    /// Sensitivities this rule applies to; empty matches any sensitivity.
    #[serde(default)]
    pub sensitivities: Vec<Sensitivity>,
    /// Required principal attribute values; empty matches regardless of
    /// `DecisionInput::attributes`. A key absent from the input makes the
    /// whole rule evaluate to `Unknown` rather than matching.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl PolicyRule {
    /// Validates that the rule has at least one match criterion.
    ///
    /// # Errors
    ///
    /// Returns a message naming the missing criterion.
    pub fn validate(&self) -> Result<(), String> {
        let has_selector = !self.roles.is_empty()
            || !self.teams.is_empty()
            || self.min_trust_level.is_some()
            || !self.resource_ids.is_empty()
            || !self.capability_ids.is_empty()
            || !self.operations.is_empty()
            || !self.sensitivities.is_empty()
            || !self.attributes.is_empty();
        if !has_selector {
            return Err(format!("rule {} must include at least one match criterion", self.id));
        }
        Ok(())
    }

    /// Builds the `Requirement<PolicyPredicate>` tree this rule matches
    /// against. Each non-empty selector field becomes an OR-group over its
    /// values; the non-empty groups are AND-ed together. A rule with no
    /// selectors produces the trivially-satisfied empty `And`.
    #[must_use]
    pub fn requirement(&self) -> Requirement<PolicyPredicate> {
        let mut groups: Vec<Requirement<PolicyPredicate>> = Vec::new();

        if !self.roles.is_empty() {
            groups.push(Requirement::or(
                self.roles
                    .iter()
                    .map(|role| Requirement::predicate(PolicyPredicate::Role(role.clone())))
                    .collect(),
            ));
        }
        if !self.teams.is_empty() {
            groups.push(Requirement::or(
                self.teams
                    .iter()
                    .map(|team| Requirement::predicate(PolicyPredicate::Team(team.clone())))
                    .collect(),
            ));
        }
        if let Some(min_trust) = self.min_trust_level {
            groups.push(Requirement::predicate(PolicyPredicate::MinTrustLevel(min_trust)));
        }
        if !self.resource_ids.is_empty() {
            groups.push(Requirement::or(
                self.resource_ids
                    .iter()
                    .map(|id| Requirement::predicate(PolicyPredicate::ResourceId(id.clone())))
                    .collect(),
            ));
        }
        if !self.capability_ids.is_empty() {
            groups.push(Requirement::or(
                self.capability_ids
                    .iter()
                    .map(|id| Requirement::predicate(PolicyPredicate::CapabilityId(id.clone())))
                    .collect(),
            ));
        }
        if !self.operations.is_empty() {
            groups.push(Requirement::or(
                self.operations
                    .iter()
                    .map(|op| Requirement::predicate(PolicyPredicate::Operation(*op)))
                    .collect(),
            ));
        }
        if !self.sensitivities.is_empty() {
            groups.push(Requirement::or(
                self.sensitivities
                    .iter()
                    .map(|sensitivity| Requirement::predicate(PolicyPredicate::Sensitivity(*sensitivity)))
                    .collect(),
            ));
        }
        for (key, value) in &self.attributes {
            groups.push(Requirement::predicate(PolicyPredicate::Attribute {
                key: key.clone(),
                value: value.clone(),
            }));
        }

        Requirement::and(groups)
    }

    /// Returns true when this rule matches `input` under Kleene tri-state
    /// logic (`Unknown` never counts as a match).
    #[must_use]
    pub fn matches(&self, input: &DecisionInput) -> bool {
        self.requirement().eval_tristate(input, 0, &LogicMode::Kleene) == TriState::True
    }
}

/// An ordered collection of policy rules plus a fallback effect.
///
/// # Invariants
/// - `version` changes whenever `rules` or `default_effect` change; it is
///   folded into every decision-cache key so a bundle replacement implicitly
///   invalidates stale entries without an explicit flush.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBundle {
    /// Bundle version tag.
    pub version: PolicyVersion,
    /// Effect applied when no rule matches.
    pub default_effect: Effect,
    /// Rules, evaluated highest-`priority`-first.
    pub rules: Vec<PolicyRule>,
}

impl PolicyBundle {
    /// Validates every rule in the bundle.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure encountered.
    pub fn validate(&self) -> Result<(), String> {
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }

    /// Evaluates `input` against this bundle at `at`.
    #[must_use]
    pub fn evaluate(&self, input: &DecisionInput, at: Timestamp) -> Decision {
        let mut by_priority: Vec<&PolicyRule> = self.rules.iter().collect();
        by_priority.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut priorities: Vec<i32> = by_priority.iter().map(|rule| rule.priority).collect();
        priorities.dedup();

        for priority in priorities {
            let matched: Vec<&PolicyRule> = by_priority
                .iter()
                .filter(|rule| rule.priority == priority && rule.matches(input))
                .copied()
                .collect();
            if matched.is_empty() {
                continue;
            }
            return self.resolve_group(&matched, at);
        }

        Decision {
            effect: self.default_effect,
            constraints: BTreeSet::new(),
            reason: DecisionReason {
                matched_policies: Vec::new(),
                explanation: "no rule matched; applying default effect".to_string(),
            },
            policy_version: self.version.clone(),
            decided_at: at,
        }
    }

    fn resolve_group(&self, matched: &[&PolicyRule], at: Timestamp) -> Decision {
        let matched_policies: Vec<PolicyId> = matched.iter().map(|rule| rule.id.clone()).collect();

        if let Some(deny_rule) = matched.iter().find(|rule| rule.effect == Effect::Deny) {
            return Decision {
                effect: Effect::Deny,
                constraints: BTreeSet::new(),
                reason: DecisionReason {
                    matched_policies,
                    explanation: format!("explicit deny: rule {}", deny_rule.id),
                },
                policy_version: self.version.clone(),
                decided_at: at,
            };
        }

        let mut constraints: Option<BTreeSet<Constraint>> = None;
        for rule in matched {
            constraints = Some(match constraints {
                None => rule.constraints.clone(),
                Some(existing) => existing.intersection(&rule.constraints).cloned().collect(),
            });
        }

        Decision {
            effect: Effect::Allow,
            constraints: constraints.unwrap_or_default(),
            reason: DecisionReason {
                matched_policies,
                explanation: "allowed by matching rule(s)".to_string(),
            },
            policy_version: self.version.clone(),
            decided_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use gatekeeper_core::identifiers::CapabilityId;
    use gatekeeper_core::identifiers::PolicyId;
    use gatekeeper_core::identifiers::PolicyVersion;
    use gatekeeper_core::identifiers::PrincipalId;
    use gatekeeper_core::identifiers::ResourceId;
    use gatekeeper_core::principal::TrustLevel;
    use gatekeeper_core::resource::Sensitivity;
    use gatekeeper_core::time::Timestamp;
    use gatekeeper_core::Operation;

    use super::Constraint;
    use super::Decision;
    use super::DecisionInput;
    use super::Effect;
    use super::PolicyBundle;
    use super::PolicyRule;

    fn version() -> PolicyVersion {
        PolicyVersion::new("v1")
    }

    fn input() -> DecisionInput {
        DecisionInput {
            principal_id: PrincipalId::new("user-1"),
            trust_level: TrustLevel::Trusted,
            role: "developer".to_string(),
            teams: BTreeSet::from(["payments".to_string()]),
            resource_id: ResourceId::new("res-1"),
            capability_id: CapabilityId::new("cap-1"),
            operation: Operation::Read,
            sensitivity: Sensitivity::High,
            attributes: std::collections::BTreeMap::new(),
            policy_version: version(),
        }
    }

    fn bundle(rules: Vec<PolicyRule>) -> PolicyBundle {
        PolicyBundle {
            version: version(),
            default_effect: Effect::Deny,
            rules,
        }
    }

    #[test]
    fn explicit_deny_wins_over_allow_at_same_priority() {
        let allow_rule = PolicyRule {
            id: PolicyId::new("allow-devs"),
            priority: 10,
            effect: Effect::Allow,
            constraints: BTreeSet::new(),
            roles: vec!["developer".to_string()],
            teams: vec![],
            min_trust_level: None,
            resource_ids: vec![],
            capability_ids: vec![],
            operations: vec![],
            sensitivities: vec![],
            attributes: std::collections::BTreeMap::new(),
        };
        let deny_rule = PolicyRule {
            id: PolicyId::new("deny-high-sensitivity"),
            priority: 10,
            effect: Effect::Deny,
            constraints: BTreeSet::new(),
            roles: vec![],
            teams: vec![],
            min_trust_level: None,
            resource_ids: vec![],
            capability_ids: vec![],
            operations: vec![],
            sensitivities: vec![Sensitivity::High],
            attributes: std::collections::BTreeMap::new(),
        };
        let decision = bundle(vec![allow_rule, deny_rule]).evaluate(&input(), Timestamp::Logical(0));
        assert_eq!(decision.effect, Effect::Deny);
        assert_eq!(decision.reason.matched_policies.len(), 2);
    }

    #[test]
    fn higher_priority_group_shadows_lower() {
        let low_priority_deny = PolicyRule {
            id: PolicyId::new("low-deny"),
            priority: 1,
            effect: Effect::Deny,
            constraints: BTreeSet::new(),
            roles: vec!["developer".to_string()],
            teams: vec![],
            min_trust_level: None,
            resource_ids: vec![],
            capability_ids: vec![],
            operations: vec![],
            sensitivities: vec![],
            attributes: std::collections::BTreeMap::new(),
        };
        let high_priority_allow = PolicyRule {
            id: PolicyId::new("high-allow"),
            priority: 10,
            effect: Effect::Allow,
            constraints: BTreeSet::new(),
            roles: vec!["developer".to_string()],
            teams: vec![],
            min_trust_level: None,
            resource_ids: vec![],
            capability_ids: vec![],
            operations: vec![],
            sensitivities: vec![],
            attributes: std::collections::BTreeMap::new(),
        };
        let decision =
            bundle(vec![low_priority_deny, high_priority_allow]).evaluate(&input(), Timestamp::Logical(0));
        assert_eq!(decision.effect, Effect::Allow);
    }

    #[test]
    fn same_priority_allow_constraints_intersect() {
        let narrow = PolicyRule {
            id: PolicyId::new("narrow"),
            priority: 5,
            effect: Effect::Allow,
            constraints: BTreeSet::from([Constraint::MaxResponseBytes(1_024)]),
            roles: vec!["developer".to_string()],
            teams: vec![],
            min_trust_level: None,
            resource_ids: vec![],
            capability_ids: vec![],
            operations: vec![],
            sensitivities: vec![],
            attributes: std::collections::BTreeMap::new(),
        };
        let wide = PolicyRule {
            id: PolicyId::new("wide"),
            priority: 5,
            effect: Effect::Allow,
            constraints: BTreeSet::from([
                Constraint::MaxResponseBytes(1_024),
                Constraint::MaxCostUnits(100),
            ]),
            roles: vec![],
            teams: vec!["payments".to_string()],
            min_trust_level: None,
            resource_ids: vec![],
            capability_ids: vec![],
            operations: vec![],
            sensitivities: vec![],
            attributes: std::collections::BTreeMap::new(),
        };
        let decision: Decision = bundle(vec![narrow, wide]).evaluate(&input(), Timestamp::Logical(0));
        assert_eq!(decision.effect, Effect::Allow);
        assert_eq!(decision.constraints, BTreeSet::from([Constraint::MaxResponseBytes(1_024)]));
    }

    #[test]
    fn no_match_falls_back_to_default_effect() {
        let rule = PolicyRule {
            id: PolicyId::new("unrelated"),
            priority: 1,
            effect: Effect::Allow,
            constraints: BTreeSet::new(),
            roles: vec!["nobody".to_string()],
            teams: vec![],
            min_trust_level: None,
            resource_ids: vec![],
            capability_ids: vec![],
            operations: vec![],
            sensitivities: vec![],
            attributes: std::collections::BTreeMap::new(),
        };
        let decision = bundle(vec![rule]).evaluate(&input(), Timestamp::Logical(0));
        assert_eq!(decision.effect, Effect::Deny);
    }

    #[test]
    fn rule_gated_on_missing_attribute_never_matches() {
        let rule = PolicyRule {
            id: PolicyId::new("clearance-gated"),
            priority: 1,
            effect: Effect::Allow,
            constraints: BTreeSet::new(),
            roles: vec!["developer".to_string()],
            teams: vec![],
            min_trust_level: None,
            resource_ids: vec![],
            capability_ids: vec![],
            operations: vec![],
            sensitivities: vec![],
            attributes: std::collections::BTreeMap::from([("clearance".to_string(), "top-secret".to_string())]),
        };
        assert!(!rule.matches(&input()), "Unknown attribute must not upgrade to a match");

        let decision = bundle(vec![rule]).evaluate(&input(), Timestamp::Logical(0));
        assert_eq!(decision.effect, Effect::Deny, "fallback to default_effect when the only rule is gated on missing evidence");
    }
}
