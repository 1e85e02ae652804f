// gatekeeper-core/src/interfaces/mod.rs
// ============================================================================
// Module: Gatekeeper Backend-Agnostic Interfaces
// Description: Traits implemented by pluggable backends for every pipeline
// stage (principal resolution, capability lookup, rate limiting, policy
// evaluation, protocol dispatch, audit fan-out).
// Purpose: Let `gatekeeper-pipeline` depend only on these traits so stores,
// evaluators, and adapters are swappable without touching the orchestrator.
// Dependencies: async_trait, crate::{action, audit, decision, identifiers,
// invocation, principal, resource, time, error}
// ============================================================================

//! ## Overview
//! Every trait here is implemented against `&self` and bounded `Send + Sync`
//! so implementations can be registered behind `Arc<dyn Trait>` in a
//! registry, mirroring the provider/sink registries this crate's conventions
//! descend from. Hot-path engines (`gatekeeper-pipeline::Gateway`) are
//! generic over these traits rather than boxing them, so the common case
//! pays no vtable cost; registries box only at the plugin-registration
//! boundary.

use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;

use crate::action::Action;
use crate::audit::AuditEvent;
use crate::decision::Decision;
use crate::decision::DecisionInput;
use crate::error::GatewayError;
use crate::identifiers::CapabilityId;
use crate::identifiers::PolicyVersion;
use crate::identifiers::ResourceId;
use crate::invocation::InvocationOutcome;
use crate::principal::Principal;
use crate::resource::Capability;
use crate::resource::Resource;
use crate::time::Timestamp;

/// A finite, non-restartable sequence of dispatch frames, as returned by
/// [`ProtocolAdapter::invoke_streaming`].
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<InvocationOutcome, GatewayError>> + Send>>;

/// Resolves an opaque credential into an authenticated [`Principal`].
///
/// # Invariants
/// - Must fail closed (`Err`) rather than return a reduced-trust principal
///   when resolution is ambiguous.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Resolves `credential` as of `at`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuthError`] when the credential is missing,
    /// malformed, or expired.
    async fn resolve(&self, credential: &str, at: Timestamp) -> Result<Principal, GatewayError>;
}

/// Looks up resources and capabilities by id.
///
/// # Invariants
/// - Returns [`GatewayError::NotFound`] for decommissioned resources, not a
///   stale cached copy.
pub trait CapabilityRegistry: Send + Sync {
    /// Resolves a resource/capability pair.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when either id is unknown or the
    /// resource is decommissioned.
    fn lookup(
        &self,
        resource_id: &ResourceId,
        capability_id: &CapabilityId,
    ) -> Result<(Resource, Capability), GatewayError>;
}

/// A single catalog change pushed by a [`ResourceCatalogSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogUpdate {
    /// A resource and its current capability set was added or replaced.
    Upsert(Resource, Vec<Capability>),
    /// A resource and all its capabilities were removed.
    Remove(ResourceId),
}

/// Pushes catalog updates to Capability Lookup as backends register or
/// deregister resources.
///
/// # Invariants
/// - Subscribers tolerate bounded lag (slow consumers may miss intermediate
///   updates but must eventually converge); unbounded buffering is
///   forbidden.
#[async_trait]
pub trait ResourceCatalogSource: Send + Sync {
    /// Awaits the next catalog update, or `None` once the source is closed.
    async fn next_update(&self) -> Option<CatalogUpdate>;
}

/// Outcome of a rate-limiter admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    /// The call is admitted; `remaining` calls are left in the window.
    Admitted {
        /// Calls remaining in the current window after this one.
        remaining: u64,
    },
    /// The call is rejected; retry after `retry_after_ms`.
    Limited {
        /// Milliseconds until the window resets enough to admit a call.
        retry_after_ms: i64,
    },
}

/// Per-key sliding-window rate limit admission and bookkeeping.
///
/// # Invariants
/// - `window_seconds == limit` boundary: a call that would make the count
///   exceed `limit` within the window is `Limited`, never `Admitted`.
#[async_trait]
pub trait RateLimiterStore: Send + Sync {
    /// Checks and, if admitted, records a call against `key` at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InternalError`] when the backing store is
    /// unreachable; callers must treat this as fail-closed (deny).
    async fn check_and_increment(
        &self,
        key: &str,
        window_seconds: u64,
        limit: u64,
        now_ms: i64,
    ) -> Result<RateLimitOutcome, GatewayError>;

    /// Releases a previously recorded call against `key`, used to compensate
    /// a prior `check_and_increment` when a *different* key in the same
    /// composite check (e.g. the capability-scoped window) turns out to be
    /// `Limited`. The default implementation is a no-op: stores that cannot
    /// cheaply roll back a count may tolerate a harmless, bounded
    /// over-count rather than implement true compensation.
    async fn release(&self, _key: &str, _now_ms: i64) {}
}

/// A tier of the two-tier decision cache (local in-process, or shared).
///
/// # Invariants
/// - Implementations never cache a fail-closed `Deny` produced by an
///   evaluator error or timeout (the orchestrator enforces this by simply
///   not calling `put` in that case).
pub trait DecisionCache: Send + Sync {
    /// Returns a cached decision for `key`, if present and unexpired as of
    /// `now_ms`.
    fn get(&self, key: &str, now_ms: i64) -> Option<Decision>;

    /// Stores `decision` under `key` with the given time-to-live.
    fn put(&self, key: String, decision: Decision, ttl_ms: i64, now_ms: i64);

    /// Invalidates every entry tagged with a policy version older than
    /// `current_version`, used when a policy bundle is replaced.
    fn invalidate_stale(&self, current_version: &PolicyVersion);
}

/// Evaluates a [`DecisionInput`] against the active policy bundle.
///
/// # Invariants
/// - Errors and timeouts are the caller's responsibility to convert into a
///   fail-closed `Deny`; this trait itself may return `Err`.
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Evaluates `input` as of `at`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InternalError`] on evaluator failure; the
    /// orchestrator must treat this as fail-closed, not retry-as-allow.
    async fn evaluate(&self, input: &DecisionInput, at: Timestamp) -> Result<Decision, GatewayError>;

    /// Returns the policy bundle version currently loaded.
    fn active_version(&self) -> PolicyVersion;
}

/// Lifecycle phase of a pluggable adapter or sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LifecyclePhase {
    /// Constructed but not yet accepting traffic.
    Init,
    /// Accepting traffic normally.
    Ready,
    /// No longer accepting new work; finishing in-flight work.
    Draining,
    /// Fully stopped.
    Closed,
}

/// Dispatches a validated [`Action`] to a backend over a specific protocol.
///
/// # Invariants
/// - `invoke` must honor the caller-supplied deadline and return
///   [`GatewayError::Timeout`] rather than block past it.
/// - `drain` must not accept new `invoke` calls once called, and must return
///   once all in-flight calls finish or `deadline_ms` elapses, whichever is
///   first.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Lists resources this adapter currently knows how to reach.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamError`] when discovery fails.
    async fn discover_resources(&self) -> Result<Vec<Resource>, GatewayError>;

    /// Lists capabilities for a previously discovered resource.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamError`] when the backend is
    /// unreachable, or [`GatewayError::NotFound`] when the resource is
    /// unknown to this adapter.
    async fn get_capabilities(&self, resource_id: &ResourceId) -> Result<Vec<Capability>, GatewayError>;

    /// Validates `action` against schema/shape expectations without
    /// dispatching it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ValidationError`] on schema mismatch.
    fn validate(&self, action: &Action, capability: &Capability) -> Result<(), GatewayError>;

    /// Dispatches `action` and awaits a unary result, honoring
    /// `deadline_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Timeout`], [`GatewayError::CircuitOpen`], or
    /// [`GatewayError::UpstreamError`] as appropriate.
    async fn invoke(&self, action: &Action, deadline_ms: i64) -> Result<InvocationOutcome, GatewayError>;

    /// Dispatches `action` as a streaming call, yielding frames cooperatively.
    ///
    /// The default implementation treats the adapter as unary-only: it
    /// awaits a single [`ProtocolAdapter::invoke`] and wraps the result as a
    /// one-frame stream. Adapters backing a [`crate::resource::StreamingMode`]
    /// other than `None` override this to yield multiple frames; the
    /// sequence is always finite and not restartable (spec.md §4.7).
    async fn invoke_streaming(&self, action: &Action, deadline_ms: i64) -> FrameStream {
        let result = self.invoke(action, deadline_ms).await;
        Box::pin(tokio_stream::once(result))
    }

    /// Reports adapter health for readiness/liveness surfacing.
    async fn health_check(&self) -> LifecyclePhase;

    /// Begins draining; no new `invoke` calls are accepted afterward.
    async fn drain(&self, deadline_ms: i64);
}

/// Accepts finalized audit events for durable storage and/or SIEM fan-out.
///
/// # Invariants
/// - `emit` must never block the request path for longer than a bounded
///   enqueue attempt; backpressure is handled by dropping the oldest queued
///   event, not by blocking the caller (see `gatekeeper-audit::emitter`).
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Accepts `event` for asynchronous processing.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InternalError`] only for a programming-error
    /// condition (e.g. a closed channel); ordinary backpressure is not an
    /// error.
    async fn emit(&self, event: AuditEvent) -> Result<(), GatewayError>;
}
