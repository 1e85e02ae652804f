// gatekeeper-limits/src/composite.rs
// ============================================================================
// Module: Composite Rate Limiting
// Description: Evaluates multiple independent rate-limit scopes for one
// request (principal-scoped and capability-scoped) and requires all to pass.
// Purpose: Implement the spec's Open Question resolution: per-principal and
// per-capability limits are additive — a request is admitted only if it is
// within *both* windows.
// Dependencies: gatekeeper_core::interfaces::RateLimiterStore
// ============================================================================

//! ## Overview
//! Checks are applied in order; the first `Limited` scope short-circuits and
//! every already-admitted scope is released to compensate (best-effort, see
//! `RateLimiterStore::release`'s default no-op note). This keeps a capability
//! hot-spot from silently burning through an unrelated principal's budget
//! when the capability-scoped check is the one that ultimately denies.

use gatekeeper_core::error::GatewayError;
use gatekeeper_core::interfaces::RateLimitOutcome;
use gatekeeper_core::interfaces::RateLimiterStore;

/// One rate-limit scope to check as part of a composite admission decision.
#[derive(Debug, Clone)]
pub struct RateLimitScope {
    /// Store key identifying this scope (e.g. `"principal:{id}"`).
    pub key: String,
    /// Sliding window width in seconds.
    pub window_seconds: u64,
    /// Maximum admitted calls within the window.
    pub limit: u64,
}

/// Checks every scope in order, requiring all to admit.
///
/// # Errors
///
/// Returns the first store error encountered; already-admitted scopes are
/// released before returning.
///
/// Returns the most restrictive `retry_after_ms` among scopes that denied,
/// i.e. the first one encountered, when any scope is `Limited`.
pub async fn check_all<S: RateLimiterStore + ?Sized>(
    store: &S,
    scopes: &[RateLimitScope],
    now_ms: i64,
) -> Result<RateLimitOutcome, GatewayError> {
    let mut admitted_keys: Vec<&str> = Vec::with_capacity(scopes.len());
    let mut min_remaining = u64::MAX;

    for scope in scopes {
        match store
            .check_and_increment(&scope.key, scope.window_seconds, scope.limit, now_ms)
            .await
        {
            Ok(RateLimitOutcome::Admitted { remaining }) => {
                admitted_keys.push(&scope.key);
                min_remaining = min_remaining.min(remaining);
            }
            Ok(limited @ RateLimitOutcome::Limited { .. }) => {
                for key in &admitted_keys {
                    store.release(key, now_ms).await;
                }
                return Ok(limited);
            }
            Err(err) => {
                for key in &admitted_keys {
                    store.release(key, now_ms).await;
                }
                return Err(err);
            }
        }
    }

    Ok(RateLimitOutcome::Admitted {
        remaining: min_remaining,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "tests assert on deterministic fixtures")]
mod tests {
    use gatekeeper_core::interfaces::RateLimitOutcome;

    use super::check_all;
    use super::RateLimitScope;
    use crate::sliding_window::InMemorySlidingWindowLimiter;

    #[tokio::test]
    async fn all_scopes_must_admit() {
        let store = InMemorySlidingWindowLimiter::new();
        let scopes = vec![
            RateLimitScope {
                key: "principal:u1".to_string(),
                window_seconds: 60,
                limit: 5,
            },
            RateLimitScope {
                key: "capability:c1".to_string(),
                window_seconds: 60,
                limit: 1,
            },
        ];
        let first = check_all(&store, &scopes, 0).await.expect("ok");
        assert!(matches!(first, RateLimitOutcome::Admitted { .. }));

        let second = check_all(&store, &scopes, 0).await.expect("ok");
        assert!(matches!(second, RateLimitOutcome::Limited { .. }));
    }

    #[tokio::test]
    async fn denial_releases_already_admitted_scopes() {
        let store = InMemorySlidingWindowLimiter::new();
        let scopes = vec![
            RateLimitScope {
                key: "principal:u1".to_string(),
                window_seconds: 60,
                limit: 1,
            },
            RateLimitScope {
                key: "capability:c1".to_string(),
                window_seconds: 60,
                limit: 0,
            },
        ];
        let denied = check_all(&store, &scopes, 0).await.expect("ok");
        assert!(matches!(denied, RateLimitOutcome::Limited { .. }));

        let principal_only = store
            .check_and_increment("principal:u1", 60, 1, 0)
            .await
            .expect("ok");
        assert!(
            matches!(principal_only, RateLimitOutcome::Admitted { .. }),
            "the principal scope's increment must have been released after the capability scope denied"
        );
    }
}
