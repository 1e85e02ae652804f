// gatekeeper-core/src/lib.rs
// ============================================================================
// Crate: gatekeeper-core
// Description: Canonical data model, error taxonomy, and backend-agnostic
// interfaces shared by every Gatekeeper crate.
// ============================================================================

//! Canonical types for the Gatekeeper authorization and invocation gateway.
//!
//! This crate has no I/O of its own: it defines the shapes every other
//! `gatekeeper-*` crate builds against (principals, resources, capabilities,
//! actions, decisions, invocations, audit events, the shared circuit
//! breaker) and the traits (see [`interfaces`]) that let policy evaluation,
//! rate limiting, protocol dispatch, and audit fan-out be swapped without
//! touching the orchestrator in `gatekeeper-pipeline`.

pub mod action;
pub mod audit;
pub mod breaker;
pub mod decision;
pub mod error;
pub mod hashing;
pub mod identifiers;
pub mod interfaces;
pub mod invocation;
pub mod principal;
pub mod resource;
pub mod time;

pub use action::Action;
pub use action::Operation;
pub use audit::AuditEvent;
pub use breaker::BreakerConfig;
pub use breaker::BreakerState;
pub use breaker::CircuitBreaker;
pub use decision::Constraint;
pub use decision::Decision;
pub use decision::DecisionInput;
pub use decision::DecisionReason;
pub use decision::Effect;
pub use error::GatewayError;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use interfaces::FrameStream;
pub use invocation::InvocationOutcome;
pub use invocation::InvocationRequest;
pub use invocation::InvocationResult;
pub use invocation::TerminalStage;
pub use principal::Principal;
pub use principal::PrincipalType;
pub use principal::TrustLevel;
pub use resource::Capability;
pub use resource::Protocol;
pub use resource::Resource;
pub use resource::ResourceStatus;
pub use resource::Sensitivity;
pub use resource::StreamingMode;
pub use time::Timestamp;
