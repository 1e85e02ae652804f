// gatekeeper-adapters/src/mcp.rs
// ============================================================================
// Module: MCP Protocol Adapter
// Description: Adapter Dispatch backend for Model Context Protocol servers
// reachable over HTTP, speaking the `tools/call` JSON-RPC method.
// Purpose: Translate a validated Action into a single MCP tool invocation.
// Dependencies: gatekeeper_core, reqwest::blocking, serde_json
// ============================================================================

//! ## Overview
//! Grounded on the teacher's own MCP tool-call client embedded in
//! `decision-gate-mcp::evidence` (its HTTP `McpTransport` variant): a
//! JSON-RPC 2.0 envelope posted to the server's endpoint, invoking
//! `tools/call` with `{name, arguments}` params and decoding a
//! `content: [{type: "json", json: ...}]` result shape. This adapter reuses
//! that wire shape rather than pulling in an SDK crate, since the teacher
//! itself hand-rolls the protocol instead of depending on one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gatekeeper_core::action::Action;
use gatekeeper_core::breaker::BreakerConfig;
use gatekeeper_core::breaker::CircuitBreaker;
use gatekeeper_core::error::GatewayError;
use gatekeeper_core::identifiers::ResourceId;
use gatekeeper_core::interfaces::LifecyclePhase;
use gatekeeper_core::interfaces::ProtocolAdapter;
use gatekeeper_core::invocation::InvocationOutcome;
use gatekeeper_core::resource::Capability;
use gatekeeper_core::resource::Resource;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::auth::AuthScheme;

/// Configuration for an [`McpAdapter`] bound to one MCP server endpoint.
#[derive(Debug, Clone)]
pub struct McpAdapterConfig {
    /// MCP server JSON-RPC endpoint URL.
    pub endpoint: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Circuit breaker configuration for this server.
    pub breaker: BreakerConfig,
}

/// Protocol adapter for MCP servers reachable over HTTP JSON-RPC.
pub struct McpAdapter {
    config: McpAdapterConfig,
    client: Client,
    auth: AuthScheme,
    breaker: Arc<CircuitBreaker>,
    phase: RwLock<LifecyclePhase>,
}

impl McpAdapter {
    /// Creates a new MCP adapter.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InternalError`] when the HTTP client cannot
    /// be built or the breaker configuration is invalid.
    pub fn new(config: McpAdapterConfig, auth: AuthScheme) -> Result<Self, GatewayError> {
        config
            .breaker
            .validate()
            .map_err(|err| GatewayError::InternalError(format!("invalid breaker config: {err}")))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|_| GatewayError::InternalError("http client build failed".to_string()))?;
        let breaker = Arc::new(CircuitBreaker::new(config.breaker));
        Ok(Self {
            config,
            client,
            auth,
            breaker,
            phase: RwLock::new(LifecyclePhase::Init),
        })
    }
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: ToolCallParams,
}

#[derive(Serialize)]
struct ToolCallParams {
    name: String,
    arguments: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<ToolCallResult>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ToolCallResult {
    content: Vec<ToolContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    Json { json: Value },
    Text { text: String },
}

#[async_trait]
impl ProtocolAdapter for McpAdapter {
    async fn discover_resources(&self) -> Result<Vec<Resource>, GatewayError> {
        Err(GatewayError::UpstreamError(
            "the mcp adapter does not support dynamic resource discovery".to_string(),
        ))
    }

    async fn get_capabilities(&self, _resource_id: &ResourceId) -> Result<Vec<Capability>, GatewayError> {
        Err(GatewayError::UpstreamError(
            "the mcp adapter does not support dynamic capability discovery".to_string(),
        ))
    }

    fn validate(&self, action: &Action, capability: &Capability) -> Result<(), GatewayError> {
        if action.capability_id != capability.id {
            return Err(GatewayError::ValidationError(
                "action capability does not match looked-up capability".to_string(),
            ));
        }
        Ok(())
    }

    async fn invoke(&self, action: &Action, _deadline_ms: i64) -> Result<InvocationOutcome, GatewayError> {
        let now_ms = current_unix_millis();
        if !self.breaker.try_acquire(now_ms) {
            return Err(GatewayError::CircuitOpen {
                resource_id: action.resource_id.to_string(),
            });
        }

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: u64::try_from(now_ms).unwrap_or(0),
            method: "tools/call",
            params: ToolCallParams {
                name: action.capability_id.to_string(),
                arguments: action.parameters.clone(),
            },
        };

        let client = self.client.clone();
        let mut builder = client.post(&self.config.endpoint).json(&request);
        builder = match self.auth.apply(builder).await {
            Ok(builder) => builder,
            Err(err) => {
                self.breaker.record_failure(now_ms);
                return Err(err);
            }
        };

        let result = tokio::task::spawn_blocking(move || call_tool(builder))
            .await
            .map_err(|err| GatewayError::InternalError(format!("dispatch task panicked: {err}")))?;

        match result {
            Ok(payload) => {
                self.breaker.record_success();
                Ok(InvocationOutcome::Success { payload })
            }
            Err(err) => {
                self.breaker.record_failure(now_ms);
                Err(err)
            }
        }
    }

    async fn health_check(&self) -> LifecyclePhase {
        *self.phase.read().await
    }

    async fn drain(&self, _deadline_ms: i64) {
        *self.phase.write().await = LifecyclePhase::Closed;
    }
}

fn call_tool(builder: reqwest::blocking::RequestBuilder) -> Result<Value, GatewayError> {
    let response = builder
        .send()
        .map_err(|err| GatewayError::UpstreamError(format!("mcp request failed: {err}")))?
        .error_for_status()
        .map_err(|err| GatewayError::UpstreamError(format!("mcp server returned an error status: {err}")))?;

    let envelope: JsonRpcResponse = response
        .json()
        .map_err(|_| GatewayError::UpstreamError("mcp response is not valid json-rpc".to_string()))?;

    if let Some(error) = envelope.error {
        return Err(GatewayError::UpstreamError(format!("mcp tool call failed: {}", error.message)));
    }
    let result = envelope
        .result
        .ok_or_else(|| GatewayError::UpstreamError("mcp response missing result".to_string()))?;

    for item in result.content {
        if let ToolContent::Json { json } = item {
            return Ok(json);
        }
    }
    Err(GatewayError::UpstreamError(
        "mcp tool call returned no json content".to_string(),
    ))
}

fn current_unix_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on deterministic fixtures")]
mod tests {
    use gatekeeper_core::breaker::BreakerConfig;

    use super::McpAdapter;
    use super::McpAdapterConfig;
    use crate::auth::AuthScheme;

    fn config() -> McpAdapterConfig {
        McpAdapterConfig {
            endpoint: "https://mcp.example.com/rpc".to_string(),
            timeout_ms: 1_000,
            breaker: BreakerConfig {
                failure_threshold: 3,
                cooldown_ms: 1_000,
                half_open_probes: 1,
            },
        }
    }

    #[test]
    fn rejects_invalid_breaker_config() {
        let mut cfg = config();
        cfg.breaker.failure_threshold = 0;
        assert!(McpAdapter::new(cfg, AuthScheme::None).is_err());
    }

    #[test]
    fn builds_successfully_with_valid_config() {
        assert!(McpAdapter::new(config(), AuthScheme::None).is_ok());
    }
}
