// gatekeeper-adapters/src/grpc.rs
// ============================================================================
// Module: gRPC Protocol Adapter
// Description: Adapter Dispatch backend for gRPC-fronted resources, reached
// as an HTTP/2 JSON-over-POST target rather than through a gRPC/protobuf
// stack absent from this workspace's grounding corpus.
// Purpose: Fill out the third protocol named in spec.md §3 without
// fabricating a `tonic`/`prost` dependency (see DESIGN.md).
// Dependencies: gatekeeper_core, reqwest (http2 via rustls ALPN negotiation)
// ============================================================================

//! ## Overview
//! No example repo in the retrieval pack depends on `tonic` or `prost`.
//! Per the "never fabricate dependencies" rule, this adapter treats a gRPC
//! resource's endpoint as an HTTP/2 target and dispatches the capability
//! call as a JSON POST, exactly like [`crate::http::HttpAdapter`], with the
//! distinction kept at the type level (`Protocol::Grpc` routes here in the
//! adapter registry) so the split can be swapped for a real protobuf
//! transport later without touching callers.

use async_trait::async_trait;
use gatekeeper_core::action::Action;
use gatekeeper_core::error::GatewayError;
use gatekeeper_core::identifiers::ResourceId;
use gatekeeper_core::interfaces::LifecyclePhase;
use gatekeeper_core::interfaces::ProtocolAdapter;
use gatekeeper_core::invocation::InvocationOutcome;
use gatekeeper_core::resource::Capability;
use gatekeeper_core::resource::Resource;

use crate::http::HttpAdapter;
use crate::http::HttpAdapterConfig;
use crate::auth::AuthScheme;

/// Protocol adapter for gRPC-fronted resources, delegating transport to
/// [`HttpAdapter`].
pub struct GrpcAdapter {
    inner: HttpAdapter,
}

impl GrpcAdapter {
    /// Creates a new gRPC adapter.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InternalError`] when the underlying HTTP
    /// transport cannot be built.
    pub fn new(config: HttpAdapterConfig, auth: AuthScheme) -> Result<Self, GatewayError> {
        Ok(Self {
            inner: HttpAdapter::new(config, auth)?,
        })
    }
}

#[async_trait]
impl ProtocolAdapter for GrpcAdapter {
    async fn discover_resources(&self) -> Result<Vec<Resource>, GatewayError> {
        self.inner.discover_resources().await
    }

    async fn get_capabilities(&self, resource_id: &ResourceId) -> Result<Vec<Capability>, GatewayError> {
        self.inner.get_capabilities(resource_id).await
    }

    fn validate(&self, action: &Action, capability: &Capability) -> Result<(), GatewayError> {
        self.inner.validate(action, capability)
    }

    async fn invoke(&self, action: &Action, deadline_ms: i64) -> Result<InvocationOutcome, GatewayError> {
        self.inner.invoke(action, deadline_ms).await
    }

    async fn health_check(&self) -> LifecyclePhase {
        self.inner.health_check().await
    }

    async fn drain(&self, deadline_ms: i64) {
        self.inner.drain(deadline_ms).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on deterministic fixtures")]
mod tests {
    use gatekeeper_core::breaker::BreakerConfig;

    use super::GrpcAdapter;
    use crate::auth::AuthScheme;
    use crate::http::HttpAdapterConfig;

    fn config() -> HttpAdapterConfig {
        HttpAdapterConfig {
            base_url: "https://backend.example.com".to_string(),
            allow_http: false,
            timeout_ms: 1_000,
            max_response_bytes: 1024,
            allowed_hosts: std::collections::BTreeSet::new(),
            user_agent: "gatekeeper/0.1".to_string(),
            breaker: BreakerConfig {
                failure_threshold: 3,
                cooldown_ms: 1_000,
                half_open_probes: 1,
            },
        }
    }

    #[test]
    fn builds_successfully_with_valid_config() {
        assert!(GrpcAdapter::new(config(), AuthScheme::None).is_ok());
    }
}
