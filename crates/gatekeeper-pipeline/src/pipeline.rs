// gatekeeper-pipeline/src/pipeline.rs
// ============================================================================
// Module: Gateway Orchestrator
// Description: Composes the Principal Resolver, Capability Lookup, Rate
// Limiter, PDP, Parameter Filter, Cost Admission, Adapter Dispatch, and
// Audit Emitter into the strict, linear Authorization & Invocation
// Pipeline (spec.md §2).
// Purpose: Give every external caller (the out-of-scope HTTP/CLI layer) a
// single entry point that never needs to know the pipeline's internal
// stage order or failure semantics.
// Dependencies: gatekeeper_core, gatekeeper_policy, gatekeeper_limits,
// gatekeeper_adapters
// ============================================================================

//! ## Overview
//! `Gateway` is generic over every backend-agnostic trait in
//! [`gatekeeper_core::interfaces`] rather than boxing them, per that
//! module's own doc comment: the hot path pays no vtable cost, and the
//! [`gatekeeper_adapters::registry::AdapterRegistry`] is the one place
//! dynamic dispatch is paid, at the plugin-registration boundary. Every
//! `invoke` call runs the full linear pipeline (O1, spec.md §5) and emits
//! exactly one [`AuditEvent`] on every exit path, success or failure (I2),
//! regardless of which stage terminated the request.
//!
//! A request that fails before a stage resolves the corresponding entity
//! (principal, resource, capability, decision) still produces a complete
//! audit record: unresolved principals are recorded under a stable
//! `"unresolved"` placeholder id and `TrustLevel::Untrusted`, and an
//! unresolved resource/capability's sensitivity is recorded as
//! `Sensitivity::Critical` — the fail-closed default rather than a guess.
//! Every audit record's `parameters` field is passed through
//! [`crate::parameter_filter::filter_parameters`] regardless of which stage
//! produced it, so a raw secret can never appear in an audit record (I4),
//! even when the PDP itself denied the request before reaching the
//! Parameter Filter stage proper.

use std::sync::Arc;

use gatekeeper_adapters::registry::AdapterRegistry;
use gatekeeper_adapters::retry::retry;
use gatekeeper_adapters::retry::RetryConfig;
use gatekeeper_core::action::Action;
use gatekeeper_core::audit::AuditEvent;
use gatekeeper_core::decision::Decision;
use gatekeeper_core::decision::DecisionInput;
use gatekeeper_core::error::GatewayError;
use gatekeeper_core::hashing::hash_canonical_json;
use gatekeeper_core::hashing::HashDigest;
use gatekeeper_core::hashing::DEFAULT_HASH_ALGORITHM;
use gatekeeper_core::identifiers::PrincipalId;
use gatekeeper_core::interfaces::AuditSink;
use gatekeeper_core::interfaces::CapabilityRegistry;
use gatekeeper_core::interfaces::DecisionCache;
use gatekeeper_core::interfaces::LifecyclePhase;
use gatekeeper_core::interfaces::PolicyEvaluator;
use gatekeeper_core::interfaces::PrincipalResolver;
use gatekeeper_core::interfaces::RateLimitOutcome;
use gatekeeper_core::interfaces::RateLimiterStore;
use gatekeeper_core::invocation::InvocationOutcome;
use gatekeeper_core::invocation::InvocationRequest;
use gatekeeper_core::invocation::InvocationResult;
use gatekeeper_core::invocation::TerminalStage;
use gatekeeper_core::principal::Principal;
use gatekeeper_core::principal::TrustLevel;
use gatekeeper_core::resource::Capability;
use gatekeeper_core::resource::Protocol;
use gatekeeper_core::resource::Resource;
use gatekeeper_core::resource::Sensitivity;
use gatekeeper_core::time::Timestamp;
use gatekeeper_core::FrameStream;
use gatekeeper_limits::check_all;
use gatekeeper_limits::CostOutcome;
use gatekeeper_limits::InMemoryCostLedger;
use gatekeeper_limits::RateLimitScope;
use gatekeeper_policy::pdp::PdpConfig;
use gatekeeper_policy::pdp::PdpOutcome;
use gatekeeper_policy::pdp::PolicyDecisionPoint;

use crate::metrics::PipelineMetricEvent;
use crate::metrics::PipelineMetrics;
use crate::metrics::PipelineOutcome;
use crate::parameter_filter::apply_response_constraints;
use crate::parameter_filter::filter_parameters;

/// Placeholder principal id recorded in audit events for requests that never
/// resolved a principal.
const UNRESOLVED_PRINCIPAL_ID: &str = "unresolved";

/// Runtime tuning for the stages the `GatewayConfig` file does not already
/// own a dedicated section type for (rate-limit defaults, the request
/// deadline, and the cost-admission window).
#[derive(Debug, Clone, Copy)]
pub struct GatewayRuntimeConfig {
    /// Sliding-window width, in seconds, for the default principal- and
    /// capability-scoped rate limits.
    pub default_rate_window_seconds: u64,
    /// Call ceiling within `default_rate_window_seconds`.
    pub default_rate_limit: u64,
    /// Hard per-request deadline, in milliseconds (spec.md §6
    /// `request.deadline_ms`).
    pub request_deadline_ms: i64,
    /// Rolling window, in seconds, over which `Constraint::MaxCostUnits` is
    /// enforced for cost-bearing capabilities.
    pub cost_window_seconds: u64,
    /// Backoff policy for Adapter Dispatch retries (spec.md §4.7 line 88):
    /// applied to `discover_resources`/`get_capabilities` unconditionally and
    /// to `invoke` only when `Capability::idempotent` is set.
    pub retry: RetryConfig,
}

impl Default for GatewayRuntimeConfig {
    fn default() -> Self {
        Self {
            default_rate_window_seconds: 60,
            default_rate_limit: 1_000,
            request_deadline_ms: 30_000,
            cost_window_seconds: 86_400,
            retry: RetryConfig::default(),
        }
    }
}

/// The Authorization & Invocation Pipeline orchestrator.
///
/// # Invariants
/// - Stage order is strict (O1): Principal Resolver, Capability Lookup,
///   Rate Limiter, PDP, Parameter Filter, Cost Admission, Adapter Dispatch,
///   Audit Emitter.
/// - Exactly one `AuditEvent` is emitted per `invoke`/`invoke_streaming`
///   call (I2), on every exit path.
pub struct Gateway<PR, CR, RL, E, L, S, A, M>
where
    PR: PrincipalResolver,
    CR: CapabilityRegistry,
    RL: RateLimiterStore,
    E: PolicyEvaluator,
    L: DecisionCache,
    S: DecisionCache,
    A: AuditSink,
    M: PipelineMetrics,
{
    principal_resolver: Arc<PR>,
    capability_registry: Arc<CR>,
    rate_limiter: Arc<RL>,
    evaluator: Arc<E>,
    pdp: PolicyDecisionPoint<E, L, S>,
    cost_ledger: Arc<InMemoryCostLedger>,
    adapters: Arc<AdapterRegistry>,
    audit: Arc<A>,
    metrics: Arc<M>,
    config: GatewayRuntimeConfig,
}

/// A pipeline exit that is not a successful dispatch, carrying whatever
/// context was resolved before the terminating stage.
struct Rejection {
    terminal_stage: TerminalStage,
    principal: Option<Principal>,
    target: Option<(Resource, Capability)>,
    decision: Option<Decision>,
    error: GatewayError,
}

/// Context carried past every stage up to (and including) Cost Admission,
/// ready for Adapter Dispatch.
struct Prepared {
    principal: Principal,
    resource: Resource,
    capability: Capability,
    decision: Decision,
    filtered_action: Action,
}

impl<PR, CR, RL, E, L, S, A, M> Gateway<PR, CR, RL, E, L, S, A, M>
where
    PR: PrincipalResolver,
    CR: CapabilityRegistry,
    RL: RateLimiterStore,
    E: PolicyEvaluator,
    L: DecisionCache,
    S: DecisionCache,
    A: AuditSink,
    M: PipelineMetrics,
{
    /// Constructs a `Gateway` from its already-assembled stage
    /// implementations.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "one parameter per pipeline stage; a builder would only defer the same arity")]
    pub fn new(
        principal_resolver: Arc<PR>,
        capability_registry: Arc<CR>,
        rate_limiter: Arc<RL>,
        evaluator: Arc<E>,
        local_cache: Arc<L>,
        shared_cache: Arc<S>,
        pdp_config: PdpConfig,
        cost_ledger: Arc<InMemoryCostLedger>,
        adapters: Arc<AdapterRegistry>,
        audit: Arc<A>,
        metrics: Arc<M>,
        config: GatewayRuntimeConfig,
    ) -> Self {
        let pdp = PolicyDecisionPoint::new(Arc::clone(&evaluator), local_cache, shared_cache, pdp_config);
        Self {
            principal_resolver,
            capability_registry,
            rate_limiter,
            evaluator,
            pdp,
            cost_ledger,
            adapters,
            audit,
            metrics,
            config,
        }
    }

    /// Produces a `Decision` for `request` without dispatching it or
    /// emitting an audit record — the external `Authorize` operation
    /// (spec.md §6), distinct from `Invoke`.
    ///
    /// # Errors
    ///
    /// Returns the `GatewayError` of whichever stage up to and including the
    /// PDP rejected the request.
    pub async fn authorize(&self, request: &InvocationRequest) -> Result<Decision, GatewayError> {
        match self.prepare(request).await {
            Ok(prepared) => Ok(prepared.decision),
            Err(rejection) => Err(rejection.error),
        }
    }

    /// Runs the full pipeline for `request`: resolve, look up, rate limit,
    /// decide, filter, admit cost, dispatch, and always audit.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        match self.prepare(&request).await {
            Ok(prepared) => self.dispatch_and_finish(&request, prepared).await,
            Err(rejection) => self.finish(&request, Err(rejection)).await,
        }
    }

    /// Runs the full pre-dispatch pipeline, then dispatches `request` as a
    /// streaming call.
    ///
    /// The audit event this emits covers dispatch *initiation* only: a
    /// stream that starts successfully but later yields a failing frame is
    /// audited once, at start, as a success (spec.md §4.7's "gateway pipes
    /// frames to the caller while splitting an audit stream" is the
    /// out-of-scope HTTP layer's responsibility for per-frame audit detail).
    ///
    /// # Errors
    ///
    /// Returns the rejecting stage's `GatewayError` when the request is
    /// rejected before dispatch begins.
    pub async fn invoke_streaming(&self, request: InvocationRequest) -> Result<FrameStream, GatewayError> {
        let prepared = match self.prepare(&request).await {
            Ok(prepared) => prepared,
            Err(rejection) => {
                let result = self.finish(&request, Err(rejection)).await;
                let message = match result.outcome {
                    InvocationOutcome::Rejected { code, message } => format!("{code}: {message}"),
                    InvocationOutcome::Success { .. } => "rejected before dispatch".to_string(),
                };
                return Err(GatewayError::InternalError(message));
            }
        };
        let adapter = self.adapters.require(prepared.resource.protocol)?;
        let deadline_ms = self.config.request_deadline_ms;
        let stream = adapter.invoke_streaming(&prepared.filtered_action, deadline_ms).await;

        let outcome = InvocationOutcome::Success {
            payload: serde_json::json!({ "streaming": true }),
        };
        self.finish(
            &request,
            Ok(PreparedOutcome {
                prepared,
                outcome,
            }),
        )
        .await;
        Ok(stream)
    }

    /// Aggregates `discover_resources` across every registered adapter.
    ///
    /// # Errors
    ///
    /// Returns the first adapter error encountered.
    pub async fn list_resources(&self) -> Result<Vec<Resource>, GatewayError> {
        let mut resources = Vec::new();
        for protocol in [Protocol::Mcp, Protocol::Http, Protocol::Grpc] {
            if let Some(adapter) = self.adapters.get(protocol) {
                let discovered = retry(self.config.retry, true, {
                    let adapter = Arc::clone(&adapter);
                    move || {
                        let adapter = Arc::clone(&adapter);
                        async move { adapter.discover_resources().await }
                    }
                })
                .await?;
                resources.extend(discovered);
            }
        }
        Ok(resources)
    }

    /// Lists capabilities for `resource` via the adapter bound to its
    /// protocol.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamError`] when no adapter is registered
    /// for the resource's protocol, or the adapter's own discovery error.
    pub async fn list_capabilities(&self, resource: &Resource) -> Result<Vec<Capability>, GatewayError> {
        let adapter = self.adapters.require(resource.protocol)?;
        let resource_id = resource.id.clone();
        retry(self.config.retry, true, {
            let adapter = Arc::clone(&adapter);
            move || {
                let adapter = Arc::clone(&adapter);
                let resource_id = resource_id.clone();
                async move { adapter.get_capabilities(&resource_id).await }
            }
        })
        .await
    }

    /// Reports the health of every registered adapter, keyed by protocol.
    pub async fn health_check_all(&self) -> std::collections::BTreeMap<Protocol, LifecyclePhase> {
        self.adapters.health_check_all().await
    }

    /// Drains every registered adapter, refusing new invocations and
    /// waiting for in-flight work up to `deadline_ms`.
    pub async fn drain(&self, deadline_ms: i64) {
        self.adapters.drain_all(deadline_ms).await;
    }

    /// Runs Principal Resolver through Cost Admission, the stages common to
    /// both `invoke` and `invoke_streaming`.
    ///
    /// A non-positive `request_deadline_ms` rejects with `Timeout` before any
    /// stage runs (spec.md §8 boundary behavior).
    async fn prepare(&self, request: &InvocationRequest) -> Result<Prepared, Rejection> {
        if self.config.request_deadline_ms <= 0 {
            return Err(Rejection {
                terminal_stage: TerminalStage::PrincipalResolver,
                principal: None,
                target: None,
                decision: None,
                error: GatewayError::Timeout { elapsed_ms: 0 },
            });
        }

        let received_at = request.received_at;

        let principal = self
            .principal_resolver
            .resolve(&request.credential, received_at)
            .await
            .map_err(|error| Rejection {
                terminal_stage: TerminalStage::PrincipalResolver,
                principal: None,
                target: None,
                decision: None,
                error,
            })?;

        let (resource, capability) = self
            .capability_registry
            .lookup(&request.action.resource_id, &request.action.capability_id)
            .map_err(|error| Rejection {
                terminal_stage: TerminalStage::CapabilityLookup,
                principal: Some(principal.clone()),
                target: None,
                decision: None,
                error,
            })?;

        let now_ms = received_at.as_unix_millis().unwrap_or(0);
        let scopes = [
            RateLimitScope {
                key: format!("principal:{}", principal.id),
                window_seconds: self.config.default_rate_window_seconds,
                limit: self.config.default_rate_limit,
            },
            RateLimitScope {
                key: format!("capability:{}:{}", resource.id, capability.id),
                window_seconds: self.config.default_rate_window_seconds,
                limit: self.config.default_rate_limit,
            },
        ];
        match check_all(self.rate_limiter.as_ref(), &scopes, now_ms).await {
            Ok(RateLimitOutcome::Admitted { .. }) => {}
            Ok(RateLimitOutcome::Limited { retry_after_ms }) => {
                return Err(Rejection {
                    terminal_stage: TerminalStage::RateLimiter,
                    principal: Some(principal),
                    target: Some((resource, capability)),
                    decision: None,
                    error: GatewayError::RateLimited { retry_after_ms },
                });
            }
            Err(error) => {
                return Err(Rejection {
                    terminal_stage: TerminalStage::RateLimiter,
                    principal: Some(principal),
                    target: Some((resource, capability)),
                    decision: None,
                    error,
                });
            }
        }

        let decision_input = DecisionInput {
            principal_id: principal.id.clone(),
            trust_level: principal.trust_level,
            role: principal.role.clone(),
            teams: principal.teams.iter().cloned().collect(),
            resource_id: resource.id.clone(),
            capability_id: capability.id.clone(),
            operation: request.action.operation,
            sensitivity: capability.sensitivity,
            attributes: principal
                .attributes
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|value| (key.clone(), value.to_string())))
                .collect(),
            policy_version: self.evaluator.active_version(),
        };
        let decision = match self.pdp.decide(&decision_input, received_at).await {
            PdpOutcome::Decided(decision) if decision.is_allowed() => decision,
            PdpOutcome::Decided(decision) => {
                let error = GatewayError::Denied(decision.reason.explanation.clone());
                return Err(Rejection {
                    terminal_stage: TerminalStage::Pdp,
                    principal: Some(principal),
                    target: Some((resource, capability)),
                    decision: Some(decision),
                    error,
                });
            }
            PdpOutcome::EvaluationFailed { decision, error } => {
                return Err(Rejection {
                    terminal_stage: TerminalStage::Pdp,
                    principal: Some(principal),
                    target: Some((resource, capability)),
                    decision: Some(decision),
                    error,
                });
            }
        };

        let filtered_parameters = filter_parameters(&request.action.parameters, &decision.constraints);
        let filtered_action = Action {
            resource_id: resource.id.clone(),
            capability_id: capability.id.clone(),
            operation: request.action.operation,
            parameters: filtered_parameters,
        };

        if capability.cost_bearing {
            if let Some(max_units) = decision.constraints.iter().find_map(|constraint| match constraint {
                gatekeeper_core::decision::Constraint::MaxCostUnits(units) => Some(*units),
                _ => None,
            }) {
                let key = format!("principal:{}", principal.id);
                match self
                    .cost_ledger
                    .check_and_consume(&key, self.config.cost_window_seconds, max_units, 1, now_ms)
                {
                    Ok(CostOutcome::Admitted { .. }) => {}
                    Ok(CostOutcome::Exceeded { retry_after_ms }) => {
                        return Err(Rejection {
                            terminal_stage: TerminalStage::CostAdmission,
                            principal: Some(principal),
                            target: Some((resource, capability)),
                            decision: Some(decision),
                            error: GatewayError::BudgetExceeded(format!(
                                "cost budget exceeded, retry after {retry_after_ms}ms"
                            )),
                        });
                    }
                    Err(error) => {
                        return Err(Rejection {
                            terminal_stage: TerminalStage::CostAdmission,
                            principal: Some(principal),
                            target: Some((resource, capability)),
                            decision: Some(decision),
                            error,
                        });
                    }
                }
            }
        }

        Ok(Prepared {
            principal,
            resource,
            capability,
            decision,
            filtered_action,
        })
    }

    /// Dispatches `prepared` through the adapter registered for its
    /// resource's protocol, then finalizes the result with exactly one
    /// audit event.
    async fn dispatch_and_finish(&self, request: &InvocationRequest, prepared: Prepared) -> InvocationResult {
        let adapter = match self.adapters.require(prepared.resource.protocol) {
            Ok(adapter) => adapter,
            Err(error) => {
                return self
                    .finish(
                        request,
                        Err(Rejection {
                            terminal_stage: TerminalStage::AdapterDispatch,
                            principal: Some(prepared.principal),
                            target: Some((prepared.resource, prepared.capability)),
                            decision: Some(prepared.decision),
                            error,
                        }),
                    )
                    .await;
            }
        };

        if let Err(error) = adapter.validate(&prepared.filtered_action, &prepared.capability) {
            return self
                .finish(
                    request,
                    Err(Rejection {
                        terminal_stage: TerminalStage::AdapterDispatch,
                        principal: Some(prepared.principal),
                        target: Some((prepared.resource, prepared.capability)),
                        decision: Some(prepared.decision),
                        error,
                    }),
                )
                .await;
        }

        let deadline_ms = self.config.request_deadline_ms;
        let idempotent = prepared.capability.idempotent;
        let retry_config = self.config.retry;
        let invoke_result = retry(retry_config, idempotent, {
            let adapter = Arc::clone(&adapter);
            let action = prepared.filtered_action.clone();
            move || {
                let adapter = Arc::clone(&adapter);
                let action = action.clone();
                async move { adapter.invoke(&action, deadline_ms).await }
            }
        })
        .await;
        match invoke_result {
            Ok(InvocationOutcome::Success { payload }) => {
                let payload = apply_response_constraints(payload, &prepared.decision.constraints);
                self.finish(
                    request,
                    Ok(PreparedOutcome {
                        prepared,
                        outcome: InvocationOutcome::Success { payload },
                    }),
                )
                .await
            }
            Ok(rejected @ InvocationOutcome::Rejected { .. }) => {
                self.finish(
                    request,
                    Ok(PreparedOutcome {
                        prepared,
                        outcome: rejected,
                    }),
                )
                .await
            }
            Err(error) => {
                self.finish(
                    request,
                    Err(Rejection {
                        terminal_stage: TerminalStage::AdapterDispatch,
                        principal: Some(prepared.principal),
                        target: Some((prepared.resource, prepared.capability)),
                        decision: Some(prepared.decision),
                        error,
                    }),
                )
                .await
            }
        }
    }

    /// Builds the `InvocationResult`, emits exactly one `AuditEvent`, and
    /// records metrics, regardless of which stage produced `outcome`.
    async fn finish(&self, request: &InvocationRequest, outcome: Result<PreparedOutcome, Rejection>) -> InvocationResult {
        let received_at = request.received_at;
        let completed_at = now_unix_millis();

        let (terminal_stage, principal, target, decision, invocation_outcome, outcome_code) = match outcome {
            Ok(PreparedOutcome { prepared, outcome }) => (
                TerminalStage::AdapterDispatch,
                Some(prepared.principal),
                Some((prepared.resource, prepared.capability)),
                Some(prepared.decision),
                outcome,
                "success",
            ),
            Err(rejection) => {
                let outcome_code = rejection.error.code();
                let message = rejection.error.to_string();
                (
                    rejection.terminal_stage,
                    rejection.principal,
                    rejection.target,
                    rejection.decision,
                    InvocationOutcome::Rejected {
                        code: outcome_code.to_string(),
                        message,
                    },
                    outcome_code,
                )
            }
        };

        let redacted_parameters = decision
            .as_ref()
            .map_or_else(|| filter_parameters(&request.action.parameters, &Default::default()), |decision| {
                filter_parameters(&request.action.parameters, &decision.constraints)
            });

        let principal_id = principal.as_ref().map_or_else(
            || PrincipalId::new(UNRESOLVED_PRINCIPAL_ID),
            |principal| principal.id.clone(),
        );
        let trust_level = principal.as_ref().map_or(TrustLevel::Untrusted, |principal| principal.trust_level);
        let sensitivity = target.as_ref().map_or(Sensitivity::Critical, |(_, capability)| capability.sensitivity);

        let event = AuditEvent {
            id: gatekeeper_core::identifiers::AuditEventId::new(format!("audit-{}", request.request_id)),
            request_id: request.request_id.clone(),
            correlation_id: request.correlation_id.clone(),
            principal_id,
            trust_level,
            resource_id: request.action.resource_id.clone(),
            capability_id: request.action.capability_id.clone(),
            operation: request.action.operation,
            sensitivity,
            effect: decision.as_ref().map(|decision| decision.effect),
            matched_policies: decision.as_ref().map_or_else(Vec::new, |decision| decision.reason.matched_policies.clone()),
            terminal_stage,
            outcome_code: outcome_code.to_string(),
            parameters: redacted_parameters.clone(),
            content_hash: content_hash_for(request, outcome_code, &redacted_parameters),
            received_at,
            completed_at,
            latency_ms: AuditEvent::compute_latency_ms(&received_at, &completed_at),
            retention_until: None,
        };

        let metric_event = PipelineMetricEvent {
            terminal_stage,
            resource_id: target.as_ref().map(|(resource, _)| resource.id.clone()),
            capability_id: target.as_ref().map(|(_, capability)| capability.id.clone()),
            outcome: if matches!(invocation_outcome, InvocationOutcome::Success { .. }) {
                PipelineOutcome::Success
            } else {
                PipelineOutcome::Error
            },
            outcome_code,
        };
        let latency = event.latency_ms.map_or(std::time::Duration::ZERO, |millis| {
            std::time::Duration::from_millis(u64::try_from(millis.max(0)).unwrap_or(0))
        });
        self.metrics.record_request(metric_event.clone());
        self.metrics.record_latency(metric_event, latency);

        let _ = self.audit.emit(event).await;

        InvocationResult {
            request_id: request.request_id.clone(),
            terminal_stage,
            decision,
            outcome: invocation_outcome,
            completed_at,
        }
    }
}

/// A successful dispatch outcome paired with its resolved stage context, for
/// `finish`'s shared success/rejection path.
struct PreparedOutcome {
    prepared: Prepared,
    outcome: InvocationOutcome,
}

/// Returns the current wall-clock time as a `Timestamp::UnixMillis`.
///
/// This is the one place the pipeline driver reads the system clock; every
/// other component receives timestamps as explicit arguments (see
/// `gatekeeper_core::time`).
fn now_unix_millis() -> Timestamp {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    Timestamp::UnixMillis(i64::try_from(millis).unwrap_or(i64::MAX))
}

/// Computes the audit content hash over the caller-visible fields that do
/// not already include it.
fn content_hash_for(request: &InvocationRequest, outcome_code: &str, parameters: &serde_json::Map<String, serde_json::Value>) -> HashDigest {
    let basis = serde_json::json!({
        "request_id": request.request_id.as_str(),
        "resource_id": request.action.resource_id.as_str(),
        "capability_id": request.action.capability_id.as_str(),
        "operation": request.action.operation,
        "outcome_code": outcome_code,
        "parameters": parameters,
    });
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, &basis)
        .unwrap_or_else(|_| HashDigest::new(DEFAULT_HASH_ALGORITHM, request.request_id.as_str().as_bytes()))
}
