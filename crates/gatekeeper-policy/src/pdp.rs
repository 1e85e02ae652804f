// gatekeeper-policy/src/pdp.rs
// ============================================================================
// Module: Policy Decision Point Orchestrator
// Description: Wires the two-tier decision cache in front of a
// PolicyEvaluator, enforcing the fail-closed evaluation deadline.
// Purpose: Give the pipeline a single `decide` entry point that hides cache
// topology and timeout handling.
// Dependencies: gatekeeper_core, tokio::time::timeout
// ============================================================================

//! ## Overview
//! Lookup order is local cache, then shared cache (promoting a shared hit
//! into the local tier), then the evaluator. A decision is written back to
//! both tiers only when the evaluator returns `Ok` within the deadline — an
//! evaluator error or timeout produces a fail-closed `Deny` that is returned
//! to the caller but never cached (see `DESIGN.md`'s Open Question
//! resolution), so a transient evaluator outage does not keep denying a
//! principal for a full cache TTL after it recovers.

use std::sync::Arc;
use std::time::Duration;

use gatekeeper_core::decision::Decision;
use gatekeeper_core::decision::DecisionInput;
use gatekeeper_core::error::GatewayError;
use gatekeeper_core::hashing::hash_canonical_json;
use gatekeeper_core::hashing::DEFAULT_HASH_ALGORITHM;
use gatekeeper_core::interfaces::DecisionCache;
use gatekeeper_core::interfaces::PolicyEvaluator;
use gatekeeper_core::time::Timestamp;

/// Configuration for the PDP orchestrator.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct PdpConfig {
    /// Maximum time the evaluator is given to produce a decision.
    pub evaluation_timeout_ms: i64,
    /// Local-tier cache entry time-to-live, in milliseconds.
    pub local_ttl_ms: i64,
    /// Shared-tier cache entry time-to-live, in milliseconds. Must be
    /// greater than or equal to `local_ttl_ms`.
    pub shared_ttl_ms: i64,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            evaluation_timeout_ms: 1_000,
            local_ttl_ms: 5_000,
            shared_ttl_ms: 300_000,
        }
    }
}

impl PdpConfig {
    /// Validates that the shared tier's TTL bounds the local tier's.
    ///
    /// # Errors
    ///
    /// Returns an error message when `shared_ttl_ms < local_ttl_ms`.
    pub fn validate(&self) -> Result<(), String> {
        if self.shared_ttl_ms < self.local_ttl_ms {
            return Err(format!(
                "shared_ttl_ms ({}) must be >= local_ttl_ms ({})",
                self.shared_ttl_ms, self.local_ttl_ms
            ));
        }
        if self.evaluation_timeout_ms <= 0 {
            return Err("evaluation_timeout_ms must be positive".to_string());
        }
        Ok(())
    }
}

/// The result of a `decide` call, distinguishing an ordinary policy decision
/// (allow or deny, matched against the bundle) from a fail-closed `Deny`
/// produced because the evaluator itself errored or overran its deadline
/// (spec.md §4.4's "Fail-closed" clause, `reason="evaluation_error: …"`).
///
/// Both cases carry a `Decision` (for the audit record's `effect`/`reason`
/// fields), but only `EvaluationFailed` carries a distinct `GatewayError` so
/// the pipeline's `outcome_code` can surface `"evaluation_error"` or
/// `"deadline_exceeded"` instead of the generic `"denied"` an ordinary
/// policy deny produces.
#[derive(Debug)]
pub enum PdpOutcome {
    /// The evaluator ran to completion; `Decision::effect` reflects the
    /// matched rules (or the default effect when none matched).
    Decided(Decision),
    /// The evaluator errored or exceeded `evaluation_timeout_ms`; `decision`
    /// is the fail-closed `Deny` that was returned to the caller but never
    /// cached.
    EvaluationFailed {
        /// The fail-closed `Deny` decision.
        decision: Decision,
        /// The specific failure, for `AuditEvent::outcome_code`.
        error: GatewayError,
    },
}

/// Orchestrates cache lookups and fail-closed policy evaluation.
pub struct PolicyDecisionPoint<E: PolicyEvaluator, L: DecisionCache, S: DecisionCache> {
    evaluator: Arc<E>,
    local_cache: Arc<L>,
    shared_cache: Arc<S>,
    config: PdpConfig,
}

impl<E: PolicyEvaluator, L: DecisionCache, S: DecisionCache> PolicyDecisionPoint<E, L, S> {
    /// Creates a new orchestrator.
    #[must_use]
    pub fn new(evaluator: Arc<E>, local_cache: Arc<L>, shared_cache: Arc<S>, config: PdpConfig) -> Self {
        Self {
            evaluator,
            local_cache,
            shared_cache,
            config,
        }
    }

    /// Produces a decision for `input`, consulting the cache tiers first and
    /// falling back to the evaluator under `config.evaluation_timeout_ms`.
    ///
    /// Fail-closed: evaluator errors and deadline overruns both return
    /// `PdpOutcome::EvaluationFailed`, carrying a `Deny` decision that is
    /// never written to either cache tier.
    pub async fn decide(&self, input: &DecisionInput, at: Timestamp) -> PdpOutcome {
        let key = match hash_canonical_json(DEFAULT_HASH_ALGORITHM, input) {
            Ok(digest) => digest.as_cache_key(),
            Err(err) => {
                let decision = Decision::deny(
                    format!("evaluation_error: failed to compute decision cache key: {err}"),
                    self.evaluator.active_version(),
                    at,
                );
                return PdpOutcome::EvaluationFailed {
                    error: GatewayError::EvaluationError(decision.reason.explanation.clone()),
                    decision,
                };
            }
        };
        let now_ms = at.as_unix_millis().unwrap_or(0);

        if let Some(decision) = self.local_cache.get(&key, now_ms) {
            return PdpOutcome::Decided(decision);
        }
        if let Some(decision) = self.shared_cache.get(&key, now_ms) {
            self.local_cache
                .put(key.clone(), decision.clone(), self.config.local_ttl_ms, now_ms);
            return PdpOutcome::Decided(decision);
        }

        let evaluation = tokio::time::timeout(
            Duration::from_millis(u64::try_from(self.config.evaluation_timeout_ms).unwrap_or(0)),
            self.evaluator.evaluate(input, at),
        )
        .await;

        match evaluation {
            Ok(Ok(decision)) => {
                self.shared_cache
                    .put(key.clone(), decision.clone(), self.config.shared_ttl_ms, now_ms);
                self.local_cache
                    .put(key, decision.clone(), self.config.local_ttl_ms, now_ms);
                PdpOutcome::Decided(decision)
            }
            Ok(Err(err)) => {
                let decision = Decision::deny(
                    format!("evaluation_error: {err}"),
                    self.evaluator.active_version(),
                    at,
                );
                PdpOutcome::EvaluationFailed {
                    error: GatewayError::EvaluationError(decision.reason.explanation.clone()),
                    decision,
                }
            }
            Err(_elapsed) => {
                let decision = Decision::deny("evaluation_error: timeout", self.evaluator.active_version(), at);
                PdpOutcome::EvaluationFailed {
                    error: GatewayError::EvaluationTimeout {
                        elapsed_ms: self.config.evaluation_timeout_ms,
                    },
                    decision,
                }
            }
        }
    }
}
