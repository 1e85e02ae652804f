// gatekeeper-adapters/src/lib.rs
// ============================================================================
// Crate: gatekeeper-adapters
// Description: Adapter Dispatch — protocol adapters (HTTP, MCP, gRPC-over-
// HTTP), outbound authentication, retry/backoff, and the adapter registry.
// ============================================================================

//! Adapter Dispatch implementation for the Gatekeeper gateway.
//!
//! [`http::HttpAdapter`], [`mcp::McpAdapter`], and [`grpc::GrpcAdapter`] each
//! implement [`gatekeeper_core::interfaces::ProtocolAdapter`] and share a
//! [`gatekeeper_core::breaker::CircuitBreaker`] per spec.md §4.7's
//! "identical state machine" requirement. [`registry::AdapterRegistry`]
//! routes a resource's protocol to its registered adapter.
//! [`auth::AuthScheme`] attaches outbound credentials, including an OAuth2
//! client-credentials flow with single-flight refresh. [`retry::retry`]
//! applies exponential backoff with full jitter, gated on idempotency and
//! [`gatekeeper_core::error::GatewayError::is_retryable`].

pub mod auth;
pub mod grpc;
pub mod http;
pub mod mcp;
pub mod registry;
pub mod retry;

pub use auth::AuthScheme;
pub use auth::OAuth2Config;
pub use auth::OAuth2TokenCache;
pub use grpc::GrpcAdapter;
pub use http::HttpAdapter;
pub use http::HttpAdapterConfig;
pub use mcp::McpAdapter;
pub use mcp::McpAdapterConfig;
pub use registry::AdapterRegistry;
pub use retry::retry;
pub use retry::RetryConfig;
