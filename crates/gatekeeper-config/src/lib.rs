// gatekeeper-config/src/lib.rs
// ============================================================================
// Crate: gatekeeper-config
// Description: Strict, fail-closed configuration loading and validation for
// the Gatekeeper gateway.
// ============================================================================

//! Single [`config::GatewayConfig`] entry point covering every section of the
//! gateway: the two-tier decision cache, the Policy Decision Point deadline,
//! the default rate limiter budget, the shared circuit breaker and retry
//! policy, the local audit queue, SIEM sink fan-out, and the per-request
//! deadline. Nested sections reuse the runtime config types already owned by
//! their home crates ([`gatekeeper_core::breaker::BreakerConfig`],
//! [`gatekeeper_adapters::retry::RetryConfig`],
//! [`gatekeeper_audit::emitter::EmitterConfig`],
//! [`gatekeeper_audit::siem::SiemSinkConfig`],
//! [`gatekeeper_policy::pdp::PdpConfig`]) instead of re-declaring their
//! fields, so there is exactly one definition of each section's shape.

pub mod config;

pub use config::AuthConfig;
pub use config::ConfigError;
pub use config::DecisionCacheConfig;
pub use config::GatewayConfig;
pub use config::RateLimitConfig;
pub use config::RequestConfig;
pub use config::SiemSinkEntryConfig;
