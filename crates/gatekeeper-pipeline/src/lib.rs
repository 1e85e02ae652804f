// gatekeeper-pipeline/src/lib.rs
// ============================================================================
// Crate: gatekeeper-pipeline
// Description: The Authorization & Invocation Pipeline orchestrator.
// ============================================================================

//! Orchestrates the Gatekeeper gateway's fail-closed request path.
//!
//! [`pipeline::Gateway`] wires together [`gatekeeper_core::interfaces`]'
//! backend-agnostic traits — generic, not boxed, for the hot path — into
//! the eight-stage pipeline: Principal Resolver, Capability Lookup, Rate
//! Limiter, PDP (via [`gatekeeper_policy::pdp::PolicyDecisionPoint`]),
//! Parameter Filter, Cost Admission, Adapter Dispatch (via
//! [`gatekeeper_adapters::registry::AdapterRegistry`]), and Audit Emitter.
//!
//! [`principal_resolver::StaticPrincipalResolver`] and
//! [`capability_lookup::InMemoryCapabilityRegistry`] are the reference
//! implementations of the first two stages; [`parameter_filter`] implements
//! the fifth stage's redaction and response-truncation rules as free
//! functions the orchestrator calls directly rather than as a boxed trait,
//! since filtering has no pluggable backend. [`metrics`] provides the
//! telemetry hook every stage reports through.

pub mod capability_lookup;
pub mod metrics;
pub mod parameter_filter;
pub mod pipeline;
pub mod principal_resolver;

pub use capability_lookup::InMemoryCapabilityRegistry;
pub use metrics::NoopMetrics;
pub use metrics::PipelineMetricEvent;
pub use metrics::PipelineMetrics;
pub use metrics::PipelineOutcome;
pub use pipeline::Gateway;
pub use pipeline::GatewayRuntimeConfig;
pub use principal_resolver::CredentialRecord;
pub use principal_resolver::StaticPrincipalResolver;
