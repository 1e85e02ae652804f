// gatekeeper-config/src/config.rs
// ============================================================================
// Module: Gatekeeper Configuration
// Description: Configuration loading and validation for the Gatekeeper
// gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits,
// mirroring the teacher's `decision-gate-config` section/validate/load shape.
// Dependencies: gatekeeper-core, gatekeeper-adapters, gatekeeper-audit,
// gatekeeper-policy, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. Missing or invalid configuration fails closed: [`GatewayConfig`]
//! never silently clamps an out-of-range value, it rejects it from
//! [`GatewayConfig::validate`] before the gateway ever starts routing
//! traffic. Runtime config structs already owned by other crates
//! ([`BreakerConfig`], [`RetryConfig`], [`EmitterConfig`], [`SiemSinkConfig`],
//! [`PdpConfig`]) are reused directly as nested fields rather than
//! re-specified here, so there is exactly one definition of each section's
//! shape and its own `validate()` (breaker, retry) is the one this crate's
//! `validate()` calls into.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use gatekeeper_adapters::retry::RetryConfig;
use gatekeeper_audit::emitter::EmitterConfig;
use gatekeeper_audit::siem::SiemSinkConfig;
use gatekeeper_core::breaker::BreakerConfig;
use gatekeeper_core::identifiers::SinkId;
use gatekeeper_policy::pdp::PdpConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "gatekeeper.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "GATEKEEPER_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Default decision cache entry TTL, in seconds.
pub const DEFAULT_DECISION_CACHE_TTL_SECONDS: u64 = 300;
/// Minimum allowed decision cache entry TTL, in seconds.
pub const MIN_DECISION_CACHE_TTL_SECONDS: u64 = 1;
/// Maximum allowed decision cache entry TTL, in seconds.
pub const MAX_DECISION_CACHE_TTL_SECONDS: u64 = 86_400;
/// Default decision cache local-tier capacity, in entries.
pub const DEFAULT_DECISION_CACHE_LOCAL_CAPACITY: usize = 10_000;
/// Minimum allowed decision cache local-tier capacity, in entries.
pub const MIN_DECISION_CACHE_LOCAL_CAPACITY: usize = 1;
/// Maximum allowed decision cache local-tier capacity, in entries.
pub const MAX_DECISION_CACHE_LOCAL_CAPACITY: usize = 1_000_000;

/// Default PDP evaluation deadline, in milliseconds.
pub const DEFAULT_PDP_TIMEOUT_MS: i64 = 1_000;
/// Minimum allowed PDP evaluation deadline, in milliseconds.
pub const MIN_PDP_TIMEOUT_MS: i64 = 1;
/// Maximum allowed PDP evaluation deadline, in milliseconds.
pub const MAX_PDP_TIMEOUT_MS: i64 = 60_000;

/// Default rate limit window, in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;
/// Minimum allowed rate limit window, in seconds.
pub const MIN_RATE_LIMIT_WINDOW_SECONDS: u64 = 1;
/// Maximum allowed rate limit window, in seconds.
pub const MAX_RATE_LIMIT_WINDOW_SECONDS: u64 = 86_400;
/// Default rate limit request budget per window.
pub const DEFAULT_RATE_LIMIT_LIMIT: u64 = 1_000;
/// Minimum allowed rate limit request budget per window.
pub const MIN_RATE_LIMIT_LIMIT: u64 = 1;
/// Maximum allowed rate limit request budget per window.
pub const MAX_RATE_LIMIT_LIMIT: u64 = 10_000_000;

/// Default request-handling deadline, in milliseconds.
pub const DEFAULT_REQUEST_DEADLINE_MS: u64 = 30_000;
/// Minimum allowed request-handling deadline, in milliseconds.
pub const MIN_REQUEST_DEADLINE_MS: u64 = 1;
/// Maximum allowed request-handling deadline, in milliseconds.
pub const MAX_REQUEST_DEADLINE_MS: u64 = 600_000;

/// Maximum number of configured SIEM sinks.
pub const MAX_SIEM_SINKS: usize = 32;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level Gatekeeper gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Two-tier decision cache configuration.
    #[serde(default)]
    pub decision_cache: DecisionCacheConfig,
    /// Policy Decision Point evaluation deadline and cache TTLs.
    #[serde(default)]
    pub pdp: PdpConfig,
    /// Default rate limiter window and request budget.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Circuit breaker configuration shared by dispatch and SIEM fan-out.
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Retry policy shared by dispatch and SIEM fan-out.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Local audit queue configuration.
    #[serde(default)]
    pub audit: EmitterConfig,
    /// SIEM sink configuration, keyed by sink name.
    #[serde(default)]
    pub siem: BTreeMap<String, SiemSinkEntryConfig>,
    /// Per-request handling configuration.
    #[serde(default)]
    pub request: RequestConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            decision_cache: DecisionCacheConfig::default(),
            pdp: PdpConfig::default(),
            rate_limit: RateLimitConfig::default(),
            breaker: BreakerConfig::default(),
            retry: RetryConfig::default(),
            audit: EmitterConfig::default(),
            siem: BTreeMap::new(),
            request: RequestConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// an explicit `path`, then the `GATEKEEPER_CONFIG` environment
    /// variable, then `gatekeeper.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path is invalid, the file cannot be
    /// read or exceeds [`MAX_CONFIG_FILE_SIZE`], the content is not valid
    /// UTF-8 or TOML, or the parsed configuration fails [`Self::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any section is out of range or
    /// internally inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.decision_cache.validate()?;
        self.pdp
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("pdp: {err}")))?;
        if !(MIN_PDP_TIMEOUT_MS..=MAX_PDP_TIMEOUT_MS).contains(&self.pdp.evaluation_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "pdp.evaluation_timeout_ms must be between {MIN_PDP_TIMEOUT_MS} and \
                 {MAX_PDP_TIMEOUT_MS}"
            )));
        }
        self.rate_limit.validate()?;
        self.breaker
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("breaker: {err}")))?;
        self.retry
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("retry: {err}")))?;
        self.audit
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("audit: {err}")))?;
        if self.siem.len() > MAX_SIEM_SINKS {
            return Err(ConfigError::Invalid(format!(
                "siem: at most {MAX_SIEM_SINKS} sinks are allowed, got {}",
                self.siem.len()
            )));
        }
        for (name, sink) in &self.siem {
            sink.validate(name)?;
        }
        self.request.validate()?;
        Ok(())
    }
}

/// Decision cache TTL and local-tier capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCacheConfig {
    /// Cache entry time-to-live, in seconds, applied to both tiers.
    pub ttl_seconds: u64,
    /// Maximum number of entries held in the local (in-process) tier.
    pub local_capacity: usize,
}

impl Default for DecisionCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_DECISION_CACHE_TTL_SECONDS,
            local_capacity: DEFAULT_DECISION_CACHE_LOCAL_CAPACITY,
        }
    }
}

impl DecisionCacheConfig {
    /// Validates the decision cache TTL and local-tier capacity ranges.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DECISION_CACHE_TTL_SECONDS..=MAX_DECISION_CACHE_TTL_SECONDS)
            .contains(&self.ttl_seconds)
        {
            return Err(ConfigError::Invalid(format!(
                "decision_cache.ttl_seconds must be between {MIN_DECISION_CACHE_TTL_SECONDS} and \
                 {MAX_DECISION_CACHE_TTL_SECONDS}"
            )));
        }
        if !(MIN_DECISION_CACHE_LOCAL_CAPACITY..=MAX_DECISION_CACHE_LOCAL_CAPACITY)
            .contains(&self.local_capacity)
        {
            return Err(ConfigError::Invalid(format!(
                "decision_cache.local_capacity must be between \
                 {MIN_DECISION_CACHE_LOCAL_CAPACITY} and {MAX_DECISION_CACHE_LOCAL_CAPACITY}"
            )));
        }
        Ok(())
    }
}

/// Default rate limiter window and request budget, applied to a capability
/// that does not declare its own limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Default sliding window width, in seconds.
    pub default_window_seconds: u64,
    /// Default request budget per window.
    pub default_limit: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            default_limit: DEFAULT_RATE_LIMIT_LIMIT,
        }
    }
}

impl RateLimitConfig {
    /// Validates the default rate limit window and request budget ranges.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_RATE_LIMIT_WINDOW_SECONDS..=MAX_RATE_LIMIT_WINDOW_SECONDS)
            .contains(&self.default_window_seconds)
        {
            return Err(ConfigError::Invalid(format!(
                "rate_limit.default_window_seconds must be between \
                 {MIN_RATE_LIMIT_WINDOW_SECONDS} and {MAX_RATE_LIMIT_WINDOW_SECONDS}"
            )));
        }
        if !(MIN_RATE_LIMIT_LIMIT..=MAX_RATE_LIMIT_LIMIT).contains(&self.default_limit) {
            return Err(ConfigError::Invalid(format!(
                "rate_limit.default_limit must be between {MIN_RATE_LIMIT_LIMIT} and \
                 {MAX_RATE_LIMIT_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Per-request handling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Overall deadline for a single request, in milliseconds, spanning
    /// principal resolution through adapter dispatch and audit enqueue.
    pub deadline_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            deadline_ms: DEFAULT_REQUEST_DEADLINE_MS,
        }
    }
}

impl RequestConfig {
    /// Validates the request deadline range.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_REQUEST_DEADLINE_MS..=MAX_REQUEST_DEADLINE_MS).contains(&self.deadline_ms) {
            return Err(ConfigError::Invalid(format!(
                "request.deadline_ms must be between {MIN_REQUEST_DEADLINE_MS} and \
                 {MAX_REQUEST_DEADLINE_MS}"
            )));
        }
        Ok(())
    }
}

/// Configuration for a single named SIEM sink.
///
/// Wraps [`SiemSinkConfig`] (whose `id` is filled in from the TOML map key,
/// not duplicated in the file) with an [`AuthConfig`] describing how to
/// authenticate to it; the gateway wiring layer turns this into a runtime
/// `gatekeeper_adapters::auth::AuthScheme` (see `SiemSinkEntryConfig::sink_config`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiemSinkEntryConfig {
    /// HTTP endpoint accepting batched JSON event arrays.
    pub endpoint: String,
    /// Authentication scheme used against `endpoint`.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Maximum events per batch.
    #[serde(default = "default_siem_batch_size")]
    pub batch_size: usize,
    /// Maximum time between flushes, in milliseconds, even below `batch_size`.
    #[serde(default = "default_siem_flush_ms")]
    pub flush_ms: u64,
    /// Gzip the payload once its uncompressed size exceeds this many bytes.
    #[serde(default = "default_compression_threshold_bytes")]
    pub compression_threshold_bytes: usize,
    /// Retry policy for a failed batch POST.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Circuit breaker configuration for this sink.
    #[serde(default)]
    pub breaker: BreakerConfig,
}

/// Default `SiemSinkEntryConfig::batch_size`.
const fn default_siem_batch_size() -> usize {
    100
}

/// Default `SiemSinkEntryConfig::flush_ms`.
const fn default_siem_flush_ms() -> u64 {
    1_000
}

/// Default `SiemSinkEntryConfig::compression_threshold_bytes`.
const fn default_compression_threshold_bytes() -> usize {
    8 * 1024
}

impl SiemSinkEntryConfig {
    /// Validates this sink entry, prefixing error messages with `siem.{name}`.
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("siem.{name}.endpoint must be non-empty")));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(format!("siem.{name}.batch_size must be >= 1")));
        }
        self.retry
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("siem.{name}.retry: {err}")))?;
        self.breaker
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("siem.{name}.breaker: {err}")))?;
        Ok(())
    }

    /// Builds the runtime [`SiemSinkConfig`] for this entry, stamping in
    /// `name` as the sink's [`SinkId`].
    #[must_use]
    pub fn sink_config(&self, name: &str) -> SiemSinkConfig {
        SiemSinkConfig {
            id: SinkId::new(name),
            endpoint: self.endpoint.clone(),
            batch_size: self.batch_size,
            flush_ms: self.flush_ms,
            compression_threshold_bytes: self.compression_threshold_bytes,
            retry: self.retry,
            breaker: self.breaker,
        }
    }
}

/// Authentication scheme for a SIEM sink, serialized form of
/// `gatekeeper_adapters::auth::AuthScheme`.
///
/// Kept as a plain data enum rather than reusing `AuthScheme` directly: the
/// runtime type's `OAuth2ClientCredentials` variant holds a live token
/// cache (`Arc<OAuth2TokenCache>`, backed by a `Mutex` and an HTTP client)
/// that cannot round-trip through TOML. Construction of the runtime
/// `AuthScheme` from this config belongs to the crate that owns the HTTP
/// client (`gatekeeper-pipeline`/`gatekeeper-cli`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication.
    #[default]
    None,
    /// HTTP Basic authentication.
    Basic {
        /// Basic auth username.
        username: String,
        /// Basic auth password.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// Bearer token value.
        token: String,
    },
    /// Static API key sent as a request header.
    ApiKeyHeader {
        /// Header name.
        header_name: String,
        /// Header value.
        value: String,
    },
    /// Static API key sent as a query parameter.
    ApiKeyQuery {
        /// Query parameter name.
        param_name: String,
        /// Query parameter value.
        value: String,
    },
    /// OAuth2 client-credentials grant with an auto-refreshed token.
    OAuth2ClientCredentials {
        /// Token endpoint URL.
        token_url: String,
        /// OAuth2 client id.
        client_id: String,
        /// OAuth2 client secret.
        client_secret: String,
        /// Optional space-delimited scope string.
        #[serde(default)]
        scope: Option<String>,
        /// Seconds of safety margin subtracted from the token's reported
        /// lifetime before it is considered expired.
        #[serde(default = "default_refresh_skew_seconds")]
        refresh_skew_seconds: u64,
    },
}

/// Default `AuthConfig::OAuth2ClientCredentials::refresh_skew_seconds`.
const fn default_refresh_skew_seconds() -> u64 {
    30
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit argument, the
/// `GATEKEEPER_CONFIG` environment variable, or the default filename.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    validate_path_string("config path", &path.to_string_lossy())
}

/// Validates a path-shaped string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
