// gatekeeper-adapters/src/retry.rs
// ============================================================================
// Module: Adapter Retry
// Description: Exponential backoff with jitter for dispatch retries.
// Purpose: Retry only idempotent capabilities against transient upstream
// failures, bounded by a maximum attempt count and delay ceiling.
// Dependencies: gatekeeper_core, rand, tokio::time
// ============================================================================

//! ## Overview
//! `retry` never retries a non-idempotent capability (the caller must check
//! `Capability::idempotent` before calling it) and never retries an error
//! for which `GatewayError::is_retryable()` is false, so a policy `Denied`
//! or `ValidationError` is never masked as a transient failure.

use std::time::Duration;

use gatekeeper_core::error::GatewayError;
use rand::Rng;

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay between attempts, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Minimum permitted `max_attempts`.
    pub const MIN_MAX_ATTEMPTS: u32 = 1;

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message when a field is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts < Self::MIN_MAX_ATTEMPTS {
            return Err(format!(
                "max_attempts must be >= {}",
                Self::MIN_MAX_ATTEMPTS
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err("base_delay_ms must not exceed max_delay_ms".to_string());
        }
        Ok(())
    }

    /// Returns the backoff delay before attempt number `attempt` (1-indexed
    /// retry count, i.e. `1` is the delay before the first retry), with full
    /// jitter in `[0, computed_delay]`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let computed = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        let jittered = rand::thread_rng().gen_range(0..=computed.max(1));
        Duration::from_millis(jittered)
    }
}

/// Retries `operation` up to `config.max_attempts` times when it is
/// idempotent-safe and the error returned is retryable.
///
/// # Errors
///
/// Returns the last error encountered once attempts are exhausted, or
/// immediately on the first non-retryable error.
pub async fn retry<T, F, Fut>(
    config: RetryConfig,
    idempotent: bool,
    mut operation: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if idempotent && err.is_retryable() && attempt < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on deterministic fixtures")]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use gatekeeper_core::error::GatewayError;

    use super::retry;
    use super::RetryConfig;

    fn config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[tokio::test]
    async fn retries_idempotent_transient_failures_until_success() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, GatewayError> = retry(config(), true, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(GatewayError::UpstreamError("transient".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_non_idempotent_operations() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, GatewayError> = retry(config(), false, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::UpstreamError("transient".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn never_retries_non_retryable_errors() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, GatewayError> = retry(config(), true, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::ValidationError("bad input".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
