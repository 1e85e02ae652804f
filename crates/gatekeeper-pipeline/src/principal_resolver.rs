// gatekeeper-pipeline/src/principal_resolver.rs
// ============================================================================
// Module: Static Principal Resolver
// Description: PrincipalResolver implementation backed by a pre-registered
// credential-to-principal table.
// Purpose: Provide the pluggable-in-place reference resolver; production
// deployments swap in a real token-validation resolver behind the same
// trait without touching the pipeline.
// Dependencies: gatekeeper_core
// ============================================================================

//! ## Overview
//! Credentials are opaque strings to this resolver (spec.md §4.1: "Pure; no
//! external calls on the hot path"); signature/issuer/audience validation is
//! the responsibility of whatever populates the table (e.g. a JWKS-backed
//! loader), which is out of scope for the core pipeline. Expiry is checked
//! strictly: a credential expiring exactly at `at` is rejected (spec.md §8
//! boundary behavior), independent of the ±60s issuer clock-skew tolerance
//! spec.md §4.1 describes for signature verification, which this resolver
//! does not perform.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gatekeeper_core::error::GatewayError;
use gatekeeper_core::interfaces::PrincipalResolver;
use gatekeeper_core::principal::Principal;
use gatekeeper_core::time::Timestamp;

/// A single registered credential and the principal it resolves to.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    /// Principal this credential authenticates as.
    pub principal: Principal,
    /// Expiry timestamp, when the credential is time-bounded.
    pub expires_at: Option<Timestamp>,
}

/// A [`PrincipalResolver`] backed by a static, pre-registered credential
/// table.
///
/// # Invariants
/// - Unregistered and expired credentials both fail closed with
///   `GatewayError::AuthError`.
#[derive(Debug, Clone, Default)]
pub struct StaticPrincipalResolver {
    records: BTreeMap<String, CredentialRecord>,
}

impl StaticPrincipalResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `credential`, replacing any prior registration.
    pub fn register(&mut self, credential: impl Into<String>, record: CredentialRecord) {
        self.records.insert(credential.into(), record);
    }
}

#[async_trait]
impl PrincipalResolver for StaticPrincipalResolver {
    async fn resolve(&self, credential: &str, at: Timestamp) -> Result<Principal, GatewayError> {
        let record = self
            .records
            .get(credential)
            .ok_or_else(|| GatewayError::AuthError("unknown credential".to_string()))?;

        if let Some(expires_at) = record.expires_at {
            if let (Some(now_ms), Some(expiry_ms)) = (at.as_unix_millis(), expires_at.as_unix_millis()) {
                if now_ms >= expiry_ms {
                    return Err(GatewayError::AuthError("credential expired".to_string()));
                }
            }
        }

        Ok(record.principal.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on deterministic fixtures")]
mod tests {
    use gatekeeper_core::identifiers::PrincipalId;
    use gatekeeper_core::principal::PrincipalType;
    use gatekeeper_core::principal::TrustLevel;

    use super::CredentialRecord;
    use super::StaticPrincipalResolver;
    use gatekeeper_core::interfaces::PrincipalResolver;
    use gatekeeper_core::time::Timestamp;

    fn sample_principal() -> gatekeeper_core::principal::Principal {
        gatekeeper_core::principal::Principal {
            id: PrincipalId::new("u1"),
            principal_type: PrincipalType::Human,
            role: "developer".to_string(),
            teams: vec!["t1".to_string()],
            trust_level: TrustLevel::Trusted,
            attributes: std::collections::BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn unknown_credential_fails_closed() {
        let resolver = StaticPrincipalResolver::new();
        let err = resolver.resolve("missing", Timestamp::Logical(0)).await.unwrap_err();
        assert_eq!(err.code(), "auth_error");
    }

    #[tokio::test]
    async fn token_expiring_exactly_at_now_is_rejected() {
        let mut resolver = StaticPrincipalResolver::new();
        resolver.register(
            "tok",
            CredentialRecord {
                principal: sample_principal(),
                expires_at: Some(Timestamp::UnixMillis(1_000)),
            },
        );
        let err = resolver.resolve("tok", Timestamp::UnixMillis(1_000)).await.unwrap_err();
        assert_eq!(err.code(), "auth_error");

        let ok = resolver.resolve("tok", Timestamp::UnixMillis(999)).await.unwrap();
        assert_eq!(ok.id, PrincipalId::new("u1"));
    }
}
