// gatekeeper-audit/src/siem.rs
// ============================================================================
// Module: SIEM Fan-out
// Description: Batches finalized audit events to one or more downstream SIEM
// sinks (HTTP Event Collector-shaped endpoints), with compression, retry,
// and a per-sink circuit breaker.
// Purpose: Implement spec.md §4.8's SIEM fan-out contract.
// Dependencies: gatekeeper_core (breaker), gatekeeper_adapters (retry, auth),
// flate2, reqwest::blocking
// ============================================================================

//! ## Overview
//! Reuses [`gatekeeper_core::breaker::CircuitBreaker`] directly — spec.md
//! §4.8 states the SIEM breaker is "identical state machine to §4.7" — and
//! [`gatekeeper_adapters::retry::retry`] for the exponential-backoff-with-
//! jitter retry policy, so the two fan-out paths (adapter dispatch, SIEM)
//! never drift into two implementations of the same mechanism. A SIEM sink
//! outage is absorbed here: a failed batch is dropped (not requeued forever)
//! once retries are exhausted, and only a drop counter is incremented,
//! matching §4.8's "new events still enter the local queue... drops are
//! counted, not surfaced as request errors."

use std::io::Write;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use gatekeeper_adapters::auth::AuthScheme;
use gatekeeper_adapters::retry::retry;
use gatekeeper_adapters::retry::RetryConfig;
use gatekeeper_core::audit::AuditEvent;
use gatekeeper_core::breaker::BreakerConfig;
use gatekeeper_core::breaker::CircuitBreaker;
use gatekeeper_core::error::GatewayError;
use gatekeeper_core::identifiers::SinkId;
use reqwest::blocking::Client;

/// Configuration for a single SIEM sink.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SiemSinkConfig {
    /// Stable identifier for this sink, used in diagnostics.
    pub id: SinkId,
    /// HTTP endpoint accepting batched JSON event arrays.
    pub endpoint: String,
    /// Maximum events per batch.
    pub batch_size: usize,
    /// Maximum time between flushes, in milliseconds, even below `batch_size`.
    pub flush_ms: u64,
    /// Gzip the payload once its uncompressed size exceeds this many bytes.
    pub compression_threshold_bytes: usize,
    /// Retry policy for a failed batch POST.
    pub retry: RetryConfig,
    /// Circuit breaker configuration for this sink.
    pub breaker: BreakerConfig,
}

/// Diagnostics snapshot for a SIEM sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SiemSinkStats {
    /// Batches successfully delivered.
    pub batches_sent: u64,
    /// Batches dropped after retries were exhausted or the breaker was open.
    pub batches_dropped: u64,
}

/// A single SIEM sink: an HTTP endpoint plus its breaker and auth scheme.
pub struct SiemSink {
    config: SiemSinkConfig,
    client: Client,
    auth: AuthScheme,
    breaker: Arc<CircuitBreaker>,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl SiemSink {
    /// Creates a new SIEM sink.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InternalError`] when the HTTP client cannot
    /// be built or the breaker/retry configuration is invalid.
    pub fn new(config: SiemSinkConfig, auth: AuthScheme) -> Result<Self, GatewayError> {
        config
            .breaker
            .validate()
            .map_err(|err| GatewayError::InternalError(format!("invalid breaker config: {err}")))?;
        config
            .retry
            .validate()
            .map_err(GatewayError::InternalError)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.flush_ms.max(1_000)))
            .build()
            .map_err(|_| GatewayError::InternalError("http client build failed".to_string()))?;
        let breaker = Arc::new(CircuitBreaker::new(config.breaker));
        Ok(Self {
            config,
            client,
            auth,
            breaker,
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Sends one batch of events, retrying per `config.retry` and gated on
    /// the sink's circuit breaker. A failure after retries are exhausted is
    /// absorbed here (counted as dropped), never propagated to the caller.
    pub async fn send_batch(&self, events: &[AuditEvent]) {
        if events.is_empty() {
            return;
        }
        let now_ms = current_unix_millis();
        if !self.breaker.try_acquire(now_ms) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let body = match encode_payload(events, self.config.compression_threshold_bytes) {
            Ok(body) => body,
            Err(_) => {
                self.breaker.record_failure(now_ms);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let client = self.client.clone();
        let endpoint = self.config.endpoint.clone();
        let auth = self.auth.clone();
        let retry_config = self.config.retry;

        let outcome = retry(retry_config, true, move || {
            let client = client.clone();
            let endpoint = endpoint.clone();
            let auth = auth.clone();
            let body = body.clone();
            async move { post_batch(&client, &endpoint, &auth, body).await }
        })
        .await;

        match outcome {
            Ok(()) => {
                self.breaker.record_success();
                self.sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.breaker.record_failure(now_ms);
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Returns a snapshot of this sink's delivery diagnostics.
    #[must_use]
    pub fn stats(&self) -> SiemSinkStats {
        SiemSinkStats {
            batches_sent: self.sent.load(Ordering::Relaxed),
            batches_dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
struct EncodedPayload {
    bytes: Vec<u8>,
    gzipped: bool,
}

fn encode_payload(events: &[AuditEvent], threshold_bytes: usize) -> Result<EncodedPayload, GatewayError> {
    let json = serde_json::to_vec(events)
        .map_err(|_| GatewayError::InternalError("failed to serialize audit batch".to_string()))?;
    if json.len() <= threshold_bytes {
        return Ok(EncodedPayload {
            bytes: json,
            gzipped: false,
        });
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|err| GatewayError::InternalError(format!("gzip encode failed: {err}")))?;
    let bytes = encoder
        .finish()
        .map_err(|err| GatewayError::InternalError(format!("gzip finish failed: {err}")))?;
    Ok(EncodedPayload { bytes, gzipped: true })
}

async fn post_batch(
    client: &Client,
    endpoint: &str,
    auth: &AuthScheme,
    payload: EncodedPayload,
) -> Result<(), GatewayError> {
    let client = client.clone();
    let endpoint = endpoint.to_string();
    let mut builder = client
        .post(&endpoint)
        .header("content-type", "application/json");
    if payload.gzipped {
        builder = builder.header("content-encoding", "gzip");
    }
    builder = auth.apply(builder).await?;
    let builder = builder.body(payload.bytes);

    tokio::task::spawn_blocking(move || {
        builder
            .send()
            .map_err(|err| GatewayError::UpstreamError(format!("siem post failed: {err}")))?
            .error_for_status()
            .map_err(|err| GatewayError::UpstreamError(format!("siem sink returned an error status: {err}")))?;
        Ok(())
    })
    .await
    .map_err(|err| GatewayError::InternalError(format!("siem dispatch task panicked: {err}")))?
}

fn current_unix_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
