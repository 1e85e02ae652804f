// gatekeeper-policy/tests/pdp_fail_closed.rs
// ============================================================================
// Integration tests: PDP fails closed on evaluator error/timeout and never
// caches the resulting deny.
// ============================================================================

use std::collections::BTreeSet;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gatekeeper_core::decision::Decision;
use gatekeeper_core::decision::DecisionInput;
use gatekeeper_core::decision::DecisionReason;
use gatekeeper_core::decision::Effect;
use gatekeeper_core::error::GatewayError;
use gatekeeper_core::identifiers::CapabilityId;
use gatekeeper_core::identifiers::PolicyVersion;
use gatekeeper_core::identifiers::PrincipalId;
use gatekeeper_core::identifiers::ResourceId;
use gatekeeper_core::interfaces::PolicyEvaluator;
use gatekeeper_core::principal::TrustLevel;
use gatekeeper_core::resource::Sensitivity;
use gatekeeper_core::time::Timestamp;
use gatekeeper_core::Operation;
use gatekeeper_policy::pdp::PdpOutcome;
use gatekeeper_policy::LruTtlDecisionCache;
use gatekeeper_policy::PdpConfig;
use gatekeeper_policy::PolicyDecisionPoint;

#[derive(Default)]
struct FailingEvaluator {
    calls: AtomicU32,
}

#[async_trait]
impl PolicyEvaluator for FailingEvaluator {
    async fn evaluate(&self, _input: &DecisionInput, _at: Timestamp) -> Result<Decision, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GatewayError::InternalError("evaluator exploded".to_string()))
    }

    fn active_version(&self) -> PolicyVersion {
        PolicyVersion::new("v1")
    }
}

struct SlowEvaluator;

#[async_trait]
impl PolicyEvaluator for SlowEvaluator {
    async fn evaluate(&self, _input: &DecisionInput, at: Timestamp) -> Result<Decision, GatewayError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(Decision {
            effect: Effect::Allow,
            constraints: BTreeSet::new(),
            reason: DecisionReason {
                matched_policies: Vec::new(),
                explanation: "slow allow".to_string(),
            },
            policy_version: PolicyVersion::new("v1"),
            decided_at: at,
        })
    }

    fn active_version(&self) -> PolicyVersion {
        PolicyVersion::new("v1")
    }
}

fn sample_input() -> DecisionInput {
    DecisionInput {
        principal_id: PrincipalId::new("user-1"),
        trust_level: TrustLevel::Trusted,
        role: "developer".to_string(),
        teams: BTreeSet::new(),
        resource_id: ResourceId::new("res-1"),
        capability_id: CapabilityId::new("cap-1"),
        operation: Operation::Read,
        sensitivity: Sensitivity::Low,
        attributes: std::collections::BTreeMap::new(),
        policy_version: PolicyVersion::new("v1"),
    }
}

#[tokio::test]
async fn evaluator_error_denies_and_is_not_cached() {
    let evaluator = Arc::new(FailingEvaluator::default());
    let pdp = PolicyDecisionPoint::new(
        Arc::clone(&evaluator),
        Arc::new(LruTtlDecisionCache::new(10)),
        Arc::new(LruTtlDecisionCache::new(10)),
        PdpConfig {
            evaluation_timeout_ms: 1_000,
            local_ttl_ms: 10_000,
            shared_ttl_ms: 10_000,
        },
    );

    let input = sample_input();
    let first = pdp.decide(&input, Timestamp::UnixMillis(0)).await;
    match first {
        PdpOutcome::EvaluationFailed { decision, error } => {
            assert_eq!(decision.effect, Effect::Deny);
            assert!(decision.reason.explanation.starts_with("evaluation_error: "));
            assert!(matches!(error, GatewayError::EvaluationError(_)));
        }
        PdpOutcome::Decided(_) => panic!("evaluator error must not be decided as an ordinary policy outcome"),
    }

    let second = pdp.decide(&input, Timestamp::UnixMillis(1)).await;
    assert!(matches!(second, PdpOutcome::EvaluationFailed { .. }));
    assert_eq!(
        evaluator.calls.load(Ordering::SeqCst),
        2,
        "a cache hit would not re-invoke the evaluator on the second identical call"
    );
}

#[tokio::test]
async fn evaluation_timeout_denies() {
    let pdp = PolicyDecisionPoint::new(
        Arc::new(SlowEvaluator),
        Arc::new(LruTtlDecisionCache::new(10)),
        Arc::new(LruTtlDecisionCache::new(10)),
        PdpConfig {
            evaluation_timeout_ms: 10,
            local_ttl_ms: 10_000,
            shared_ttl_ms: 10_000,
        },
    );

    let outcome = pdp.decide(&sample_input(), Timestamp::UnixMillis(0)).await;
    match outcome {
        PdpOutcome::EvaluationFailed { decision, error } => {
            assert_eq!(decision.effect, Effect::Deny);
            assert_eq!(decision.reason.explanation, "evaluation_error: timeout");
            assert!(matches!(error, GatewayError::EvaluationTimeout { .. }));
            assert_eq!(error.code(), "deadline_exceeded");
        }
        PdpOutcome::Decided(_) => panic!("a timed-out evaluator must not be decided as an ordinary policy outcome"),
    }
}
