// gatekeeper-limits/src/lib.rs
// ============================================================================
// Crate: gatekeeper-limits
// Description: Rate Limiter and Cost Admission pipeline stages.
// ============================================================================

//! Rate limiting and cost admission for the Gatekeeper gateway.
//!
//! [`sliding_window::InMemorySlidingWindowLimiter`] implements
//! [`gatekeeper_core::interfaces::RateLimiterStore`] as a per-key sliding
//! log. [`composite::check_all`] composes a principal-scoped and a
//! capability-scoped window additively, per the spec's rate-limit
//! composition resolution (see `DESIGN.md`). [`cost::InMemoryCostLedger`]
//! is the separate, weighted-sum budget ceiling enforced by Cost Admission.

pub mod composite;
pub mod cost;
pub mod sliding_window;

pub use composite::check_all;
pub use composite::RateLimitScope;
pub use cost::CostOutcome;
pub use cost::InMemoryCostLedger;
pub use sliding_window::InMemorySlidingWindowLimiter;
