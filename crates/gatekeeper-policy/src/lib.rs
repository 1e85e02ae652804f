// gatekeeper-policy/src/lib.rs
// ============================================================================
// Crate: gatekeeper-policy
// Description: The Policy Decision Point — rule bundle, static evaluator,
// and two-tier decision cache.
// ============================================================================

//! Policy Decision Point implementation for the Gatekeeper gateway.
//!
//! [`bundle::PolicyBundle`] holds priority-ordered [`bundle::PolicyRule`]s
//! with explicit-deny-wins tie-break and constraint-intersection
//! composition. [`engine::StaticPolicyEngine`] implements
//! [`gatekeeper_core::interfaces::PolicyEvaluator`] over a hot-swappable
//! bundle. [`cache::LruTtlDecisionCache`] implements
//! [`gatekeeper_core::interfaces::DecisionCache`] and is used for both tiers
//! of [`pdp::PolicyDecisionPoint`], which is the crate's single fail-closed
//! entry point.

pub mod bundle;
pub mod cache;
pub mod engine;
pub mod pdp;
pub mod predicate;

pub use bundle::PolicyBundle;
pub use bundle::PolicyRule;
pub use cache::LruTtlDecisionCache;
pub use engine::StaticPolicyEngine;
pub use pdp::PdpConfig;
pub use pdp::PdpOutcome;
pub use pdp::PolicyDecisionPoint;
pub use predicate::PolicyPredicate;
