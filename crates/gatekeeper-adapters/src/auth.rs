// gatekeeper-adapters/src/auth.rs
// ============================================================================
// Module: Adapter Authentication
// Description: Outbound authentication schemes applied to backend requests.
// Purpose: Attach credentials to a request builder for every scheme the
// spec names, including an OAuth2 client-credentials flow with a
// single-flight token cache.
// Dependencies: base64, reqwest::blocking, tokio::sync::Mutex
// ============================================================================

//! ## Overview
//! `AuthScheme::apply` is the single seam every adapter calls before
//! dispatch. The OAuth2 variant's token cache is a `tokio::sync::Mutex`
//! guarding the cached token: a refresh holds the lock for the duration of
//! the token-endpoint call, so concurrent callers queue behind the first
//! refresher and observe the freshly cached token rather than each issuing
//! their own refresh (single-flight by construction, not by an additional
//! coordination primitive).

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use gatekeeper_core::error::GatewayError;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use serde::Deserialize;
use tokio::sync::Mutex;

/// An outbound authentication scheme.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// No authentication.
    None,
    /// HTTP Basic authentication.
    Basic {
        /// Basic auth username.
        username: String,
        /// Basic auth password.
        password: String,
    },
    /// Bearer token authentication with a static token.
    Bearer {
        /// Static bearer token.
        token: String,
    },
    /// API key sent as a request header.
    ApiKeyHeader {
        /// Header name.
        header_name: String,
        /// API key value.
        value: String,
    },
    /// API key sent as a query parameter.
    ApiKeyQuery {
        /// Query parameter name.
        param_name: String,
        /// API key value.
        value: String,
    },
    /// OAuth2 client-credentials grant with a cached, auto-refreshed token.
    OAuth2ClientCredentials {
        /// Shared token cache and refresh state.
        cache: std::sync::Arc<OAuth2TokenCache>,
    },
}

impl AuthScheme {
    /// Applies this scheme to `builder`, returning the augmented builder.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamError`] when an OAuth2 token refresh
    /// fails.
    pub async fn apply(&self, builder: RequestBuilder) -> Result<RequestBuilder, GatewayError> {
        match self {
            Self::None => Ok(builder),
            Self::Basic { username, password } => {
                Ok(builder.basic_auth(username, Some(password)))
            }
            Self::Bearer { token } => Ok(builder.bearer_auth(token)),
            Self::ApiKeyHeader { header_name, value } => Ok(builder.header(header_name, value)),
            Self::ApiKeyQuery { param_name, value } => Ok(builder.query(&[(param_name, value)])),
            Self::OAuth2ClientCredentials { cache } => {
                let token = cache.token().await?;
                Ok(builder.bearer_auth(token))
            }
        }
    }
}

/// Configuration for an OAuth2 client-credentials token endpoint.
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Token endpoint URL.
    pub token_url: String,
    /// OAuth2 client id.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Optional space-delimited scope string.
    pub scope: Option<String>,
    /// Seconds of safety margin subtracted from the token's reported
    /// lifetime before it is considered expired.
    pub refresh_skew_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

const fn default_expires_in() -> u64 {
    300
}

struct CachedToken {
    access_token: String,
    expires_at: std::time::Instant,
}

/// Shared, single-flight OAuth2 client-credentials token cache.
pub struct OAuth2TokenCache {
    config: OAuth2Config,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl OAuth2TokenCache {
    /// Creates a new cache for the given OAuth2 configuration.
    #[must_use]
    pub fn new(config: OAuth2Config, client: Client) -> Self {
        Self {
            config,
            client,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid access token, refreshing it if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamError`] when the token endpoint call
    /// fails or returns an unparsable body.
    pub async fn token(&self) -> Result<String, GatewayError> {
        let mut guard = self.cached.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > std::time::Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let config = self.config.clone();
        let client = self.client.clone();
        let response = tokio::task::spawn_blocking(move || {
            let mut form = vec![
                ("grant_type", "client_credentials".to_string()),
                ("client_id", config.client_id.clone()),
                ("client_secret", config.client_secret.clone()),
            ];
            if let Some(scope) = &config.scope {
                form.push(("scope", scope.clone()));
            }
            client
                .post(&config.token_url)
                .header(
                    "Authorization",
                    format!(
                        "Basic {}",
                        BASE64_STANDARD.encode(format!("{}:{}", config.client_id, config.client_secret))
                    ),
                )
                .form(&form)
                .send()
                .and_then(reqwest::blocking::Response::error_for_status)
                .and_then(|resp| resp.json::<TokenResponse>())
        })
        .await
        .map_err(|err| GatewayError::InternalError(format!("token refresh task panicked: {err}")))?
        .map_err(|err| GatewayError::UpstreamError(format!("oauth2 token refresh failed: {err}")))?;

        let lifetime = Duration::from_secs(
            response
                .expires_in
                .saturating_sub(self.config.refresh_skew_seconds)
                .max(1),
        );
        *guard = Some(CachedToken {
            access_token: response.access_token.clone(),
            expires_at: std::time::Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }
}
