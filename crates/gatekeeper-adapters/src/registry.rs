// gatekeeper-adapters/src/registry.rs
// ============================================================================
// Module: Adapter Registry
// Description: Routes Adapter Dispatch by backend protocol.
// Purpose: Let Capability Lookup and the pipeline orchestrator invoke a
// resource without knowing which protocol backs it.
// Dependencies: gatekeeper_core
// ============================================================================

//! ## Overview
//! Grounded on the teacher's `decision-gate-providers::registry::ProviderRegistry`:
//! a `BTreeMap` of protocol to boxed trait object, with a `drain` that fans
//! out to every registered adapter rather than a single shared lifecycle
//! flag, since each adapter backend may finish draining at a different time.

use std::collections::BTreeMap;
use std::sync::Arc;

use gatekeeper_core::error::GatewayError;
use gatekeeper_core::interfaces::LifecyclePhase;
use gatekeeper_core::interfaces::ProtocolAdapter;
use gatekeeper_core::resource::Protocol;

/// Routes dispatch to the adapter registered for a resource's protocol.
///
/// # Invariants
/// - At most one adapter is registered per [`Protocol`]; `register`
///   overwrites a prior registration for the same protocol.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<Protocol, Arc<dyn ProtocolAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the adapter for `protocol`.
    pub fn register(&mut self, protocol: Protocol, adapter: Arc<dyn ProtocolAdapter>) {
        self.adapters.insert(protocol, adapter);
    }

    /// Returns the adapter registered for `protocol`, if any.
    #[must_use]
    pub fn get(&self, protocol: Protocol) -> Option<Arc<dyn ProtocolAdapter>> {
        self.adapters.get(&protocol).cloned()
    }

    /// Returns the adapter registered for `protocol`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamError`] when no adapter is registered
    /// for the protocol.
    pub fn require(&self, protocol: Protocol) -> Result<Arc<dyn ProtocolAdapter>, GatewayError> {
        self.get(protocol)
            .ok_or_else(|| GatewayError::UpstreamError(format!("no adapter registered for protocol {protocol:?}")))
    }

    /// Reports the health of every registered adapter.
    pub async fn health_check_all(&self) -> BTreeMap<Protocol, LifecyclePhase> {
        let mut statuses = BTreeMap::new();
        for (protocol, adapter) in &self.adapters {
            statuses.insert(*protocol, adapter.health_check().await);
        }
        statuses
    }

    /// Drains every registered adapter concurrently, each bounded by
    /// `deadline_ms`.
    pub async fn drain_all(&self, deadline_ms: i64) {
        let futures = self.adapters.values().map(|adapter| adapter.drain(deadline_ms));
        futures_lite_join_all(futures).await;
    }
}

/// Minimal concurrent-join helper so this crate does not need to pull in
/// `futures`/`futures-util` just for `join_all` over a handful of adapters.
async fn futures_lite_join_all<I>(futures: I)
where
    I: IntoIterator,
    I::Item: std::future::Future<Output = ()>,
{
    for future in futures {
        future.await;
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests assert on deterministic fixtures"
)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use gatekeeper_core::action::Action;
    use gatekeeper_core::action::Operation;
    use gatekeeper_core::error::GatewayError;
    use gatekeeper_core::identifiers::CapabilityId;
    use gatekeeper_core::identifiers::ResourceId;
    use gatekeeper_core::interfaces::LifecyclePhase;
    use gatekeeper_core::interfaces::ProtocolAdapter;
    use gatekeeper_core::invocation::InvocationOutcome;
    use gatekeeper_core::resource::Capability;
    use gatekeeper_core::resource::Protocol;
    use gatekeeper_core::resource::Resource;

    use super::AdapterRegistry;

    struct StubAdapter;

    #[async_trait]
    impl ProtocolAdapter for StubAdapter {
        async fn discover_resources(&self) -> Result<Vec<Resource>, GatewayError> {
            Ok(Vec::new())
        }
        async fn get_capabilities(&self, _resource_id: &ResourceId) -> Result<Vec<Capability>, GatewayError> {
            Ok(Vec::new())
        }
        fn validate(&self, _action: &Action, _capability: &Capability) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn invoke(&self, _action: &Action, _deadline_ms: i64) -> Result<InvocationOutcome, GatewayError> {
            Ok(InvocationOutcome::Success {
                payload: serde_json::Value::Null,
            })
        }
        async fn health_check(&self) -> LifecyclePhase {
            LifecyclePhase::Ready
        }
        async fn drain(&self, _deadline_ms: i64) {}
    }

    fn action() -> Action {
        Action {
            resource_id: ResourceId::new("res-1"),
            capability_id: CapabilityId::new("cap-1"),
            operation: Operation::Read,
            parameters: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn routes_to_the_registered_protocol() {
        let mut registry = AdapterRegistry::new();
        registry.register(Protocol::Http, Arc::new(StubAdapter));

        let adapter = registry.require(Protocol::Http).expect("registered");
        let outcome = adapter.invoke(&action(), 1_000).await.expect("ok");
        assert!(matches!(outcome, InvocationOutcome::Success { .. }));

        assert!(registry.require(Protocol::Grpc).is_err());
    }

    #[tokio::test]
    async fn drain_all_reaches_every_registered_adapter() {
        let mut registry = AdapterRegistry::new();
        registry.register(Protocol::Http, Arc::new(StubAdapter));
        registry.register(Protocol::Mcp, Arc::new(StubAdapter));
        registry.drain_all(1_000).await;
    }
}
