// gatekeeper-policy/src/engine.rs
// ============================================================================
// Module: Static Policy Engine
// Description: PolicyEvaluator implementation backed by a hot-swappable
// PolicyBundle.
// Purpose: Let an operator replace the active bundle (e.g. on policy deploy)
// without restarting the gateway, bumping `policy_version` so cached
// decisions under the old version are implicitly stale.
// Dependencies: gatekeeper_core, tokio::sync::RwLock
// ============================================================================

use async_trait::async_trait;
use gatekeeper_core::decision::Decision;
use gatekeeper_core::decision::DecisionInput;
use gatekeeper_core::error::GatewayError;
use gatekeeper_core::identifiers::PolicyVersion;
use gatekeeper_core::interfaces::PolicyEvaluator;
use gatekeeper_core::time::Timestamp;
use tokio::sync::RwLock;

use crate::bundle::PolicyBundle;

/// A [`PolicyEvaluator`] that evaluates a static, hot-swappable
/// [`PolicyBundle`].
///
/// # Invariants
/// - `evaluate` never panics on a malformed bundle; `validate()` must be
///   called by the loader before `replace_bundle` is invoked.
pub struct StaticPolicyEngine {
    bundle: RwLock<PolicyBundle>,
}

impl StaticPolicyEngine {
    /// Creates an engine starting from `bundle`.
    #[must_use]
    pub fn new(bundle: PolicyBundle) -> Self {
        Self {
            bundle: RwLock::new(bundle),
        }
    }

    /// Atomically replaces the active bundle.
    ///
    /// # Errors
    ///
    /// Returns the bundle's own validation error without installing it.
    pub async fn replace_bundle(&self, bundle: PolicyBundle) -> Result<(), String> {
        bundle.validate()?;
        *self.bundle.write().await = bundle;
        Ok(())
    }
}

#[async_trait]
impl PolicyEvaluator for StaticPolicyEngine {
    async fn evaluate(&self, input: &DecisionInput, at: Timestamp) -> Result<Decision, GatewayError> {
        let bundle = self.bundle.read().await;
        Ok(bundle.evaluate(input, at))
    }

    fn active_version(&self) -> PolicyVersion {
        self.bundle
            .try_read()
            .map(|bundle| bundle.version.clone())
            .unwrap_or_else(|_| PolicyVersion::new("unknown"))
    }
}
