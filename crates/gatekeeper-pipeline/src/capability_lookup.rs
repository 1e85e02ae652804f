// gatekeeper-pipeline/src/capability_lookup.rs
// ============================================================================
// Module: In-Memory Capability Registry
// Description: CapabilityRegistry implementation kept in sync with an
// external catalog via a bounded-lag ResourceCatalogSource subscription.
// Purpose: Implement spec.md §4.2's "hot path never blocks on I/O"
// contract: lookups are synchronous reads over an in-memory map refreshed
// out of band.
// Dependencies: gatekeeper_core, std::sync::RwLock, tokio::task
// ============================================================================

//! ## Overview
//! Grounded on the teacher's provider-registry split of hot-path reads from
//! out-of-band refresh (`decision-gate-providers::registry` /
//! `decision-gate-broker::broker`): a `subscribe` task owns the only
//! `next_update` call and applies each [`CatalogUpdate`] to a
//! `RwLock`-guarded map, while `lookup` never awaits anything. A
//! `Decommissioned` resource is retained in the map (so the caller gets a
//! precise `NotFound`, not a stale empty read) but always fails lookup.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use gatekeeper_core::error::GatewayError;
use gatekeeper_core::identifiers::CapabilityId;
use gatekeeper_core::identifiers::ResourceId;
use gatekeeper_core::interfaces::CapabilityRegistry;
use gatekeeper_core::interfaces::CatalogUpdate;
use gatekeeper_core::interfaces::ResourceCatalogSource;
use gatekeeper_core::resource::Capability;
use gatekeeper_core::resource::Resource;
use gatekeeper_core::resource::ResourceStatus;
use tokio::task::JoinHandle;

struct ResourceEntry {
    resource: Resource,
    capabilities: BTreeMap<CapabilityId, Capability>,
}

/// A [`CapabilityRegistry`] backed by an in-memory map, refreshed out of
/// band by a subscription task.
///
/// # Invariants
/// - `lookup` never awaits; all mutation happens via `apply_update`, called
///   only from the subscription task or directly in tests.
#[derive(Default)]
pub struct InMemoryCapabilityRegistry {
    resources: RwLock<BTreeMap<ResourceId, ResourceEntry>>,
}

impl InMemoryCapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a single catalog update.
    pub fn apply_update(&self, update: CatalogUpdate) {
        #[allow(clippy::unwrap_used, reason = "poisoned only on a prior panic; catalog refresh tolerates a stale write")]
        let mut resources = self.resources.write().unwrap();
        match update {
            CatalogUpdate::Upsert(resource, capabilities) => {
                let capabilities = capabilities.into_iter().map(|cap| (cap.id.clone(), cap)).collect();
                resources.insert(resource.id.clone(), ResourceEntry { resource, capabilities });
            }
            CatalogUpdate::Remove(resource_id) => {
                resources.remove(&resource_id);
            }
        }
    }

    /// Spawns a task that applies every update from `source` until it
    /// closes.
    pub fn spawn_subscription<S: ResourceCatalogSource + 'static>(self: &Arc<Self>, source: Arc<S>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(update) = source.next_update().await {
                registry.apply_update(update);
            }
        })
    }
}

impl CapabilityRegistry for InMemoryCapabilityRegistry {
    fn lookup(
        &self,
        resource_id: &ResourceId,
        capability_id: &CapabilityId,
    ) -> Result<(Resource, Capability), GatewayError> {
        #[allow(clippy::unwrap_used, reason = "poisoned only on a prior panic; a lookup fails closed on a stale read")]
        let resources = self.resources.read().unwrap();
        let entry = resources
            .get(resource_id)
            .ok_or_else(|| GatewayError::NotFound(format!("unknown resource {resource_id}")))?;
        if entry.resource.status == ResourceStatus::Decommissioned {
            return Err(GatewayError::NotFound(format!("resource {resource_id} is decommissioned")));
        }
        let capability = entry
            .capabilities
            .get(capability_id)
            .ok_or_else(|| GatewayError::NotFound(format!("unknown capability {capability_id}")))?;
        Ok((entry.resource.clone(), capability.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on deterministic fixtures")]
mod tests {
    use gatekeeper_core::resource::Protocol;
    use gatekeeper_core::resource::Sensitivity;
    use gatekeeper_core::resource::StreamingMode;
    use serde_json::Value;

    use super::CapabilityId;
    use super::Capability;
    use super::CatalogUpdate;
    use super::InMemoryCapabilityRegistry;
    use super::Resource;
    use super::ResourceId;
    use super::ResourceStatus;
    use gatekeeper_core::interfaces::CapabilityRegistry;

    fn resource(status: ResourceStatus) -> Resource {
        Resource {
            id: ResourceId::new("res-1"),
            protocol: Protocol::Http,
            endpoint: "https://example.invalid".to_string(),
            sensitivity: Sensitivity::Low,
            status,
            metadata: serde_json::Map::new(),
        }
    }

    fn capability() -> Capability {
        Capability {
            id: CapabilityId::new("cap-1"),
            resource_id: ResourceId::new("res-1"),
            name: "read".to_string(),
            input_schema: Value::Null,
            output_schema: Value::Null,
            sensitivity: Sensitivity::Low,
            streaming: StreamingMode::None,
            idempotent: true,
            cost_bearing: false,
        }
    }

    #[test]
    fn looks_up_an_upserted_capability() {
        let registry = InMemoryCapabilityRegistry::new();
        registry.apply_update(CatalogUpdate::Upsert(resource(ResourceStatus::Active), vec![capability()]));

        let (resource, capability) = registry.lookup(&ResourceId::new("res-1"), &CapabilityId::new("cap-1")).unwrap();
        assert_eq!(resource.id, ResourceId::new("res-1"));
        assert_eq!(capability.id, CapabilityId::new("cap-1"));
    }

    #[test]
    fn decommissioned_resource_fails_closed() {
        let registry = InMemoryCapabilityRegistry::new();
        registry.apply_update(CatalogUpdate::Upsert(resource(ResourceStatus::Decommissioned), vec![capability()]));

        let err = registry.lookup(&ResourceId::new("res-1"), &CapabilityId::new("cap-1")).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn remove_clears_the_resource_and_its_capabilities() {
        let registry = InMemoryCapabilityRegistry::new();
        registry.apply_update(CatalogUpdate::Upsert(resource(ResourceStatus::Active), vec![capability()]));
        registry.apply_update(CatalogUpdate::Remove(ResourceId::new("res-1")));

        let err = registry.lookup(&ResourceId::new("res-1"), &CapabilityId::new("cap-1")).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
