#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )
)]
// gatekeeper-cli/src/main.rs
// ============================================================================
// Module: Gatekeeper CLI Entry Point
// Description: Command dispatcher for configuration validation and for
// assembling/draining the gateway from a config file and a policy bundle.
// Purpose: Ambient surface only (spec.md's HTTP/REST surface remains out of
// scope): this binary never accepts inbound traffic itself.
// Dependencies: clap, gatekeeper_config, gatekeeper_pipeline,
// gatekeeper_policy, gatekeeper_adapters, gatekeeper_audit, tokio.
// ============================================================================

//! ## Overview
//! `gatekeeper config validate` loads and validates a [`GatewayConfig`]
//! without starting anything. `gatekeeper serve` additionally loads a
//! [`PolicyBundle`] and wires every pipeline stage's reference
//! implementation into a [`Gateway`], then idles until `SIGINT`/`SIGTERM`
//! and drains registered adapters. It registers no protocol adapters and
//! seeds an empty capability registry: populating the resource catalog and
//! credential table is a deployment concern left to the embedder, not this
//! CLI (spec.md's resource onboarding and identity-provider integration are
//! both out of scope).

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use gatekeeper_adapters::auth::AuthScheme;
use gatekeeper_adapters::auth::OAuth2Config;
use gatekeeper_adapters::auth::OAuth2TokenCache;
use gatekeeper_adapters::registry::AdapterRegistry;
use gatekeeper_audit::siem::SiemSink;
use gatekeeper_audit::AuditEmitter;
use gatekeeper_audit::InMemoryAuditStore;
use gatekeeper_config::AuthConfig;
use gatekeeper_config::GatewayConfig;
use gatekeeper_limits::InMemoryCostLedger;
use gatekeeper_limits::InMemorySlidingWindowLimiter;
use gatekeeper_pipeline::capability_lookup::InMemoryCapabilityRegistry;
use gatekeeper_pipeline::metrics::NoopMetrics;
use gatekeeper_pipeline::pipeline::GatewayRuntimeConfig;
use gatekeeper_pipeline::principal_resolver::StaticPrincipalResolver;
use gatekeeper_pipeline::Gateway;
use gatekeeper_policy::cache::LruTtlDecisionCache;
use gatekeeper_policy::engine::StaticPolicyEngine;
use gatekeeper_policy::PolicyBundle;
use reqwest::blocking::Client;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "gatekeeper",
    disable_help_subcommand = true,
    disable_version_flag = true,
    arg_required_else_help = true
)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration file utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Assemble the pipeline from a config file and policy bundle, then
    /// idle until shutdown.
    Serve(ServeCommand),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file without starting anything.
    Validate(ValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// Config file path (defaults to `gatekeeper.toml` or `GATEKEEPER_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config file path (defaults to `gatekeeper.toml` or `GATEKEEPER_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Path to a JSON-encoded policy bundle evaluated by the PDP.
    #[arg(long, value_name = "PATH")]
    policy_bundle: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        println_stdout(env!("CARGO_PKG_VERSION"))?;
        return Ok(ExitCode::SUCCESS);
    }

    match cli.command {
        Commands::Config { command: ConfigCommand::Validate(command) } => command_config_validate(&command),
        Commands::Serve(command) => command_serve(command).await,
    }
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes `config validate`.
fn command_config_validate(command: &ValidateCommand) -> CliResult<ExitCode> {
    match GatewayConfig::load(command.config.as_deref()) {
        Ok(_config) => {
            println_stdout("config ok")?;
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprintln_stderr(&format!("config invalid: {error}"))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes `serve`: assembles the pipeline, idles until a shutdown signal,
/// then drains every registered adapter.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = GatewayConfig::load(command.config.as_deref())
        .map_err(|error| CliError::new(format!("failed to load config: {error}")))?;
    let bundle = load_policy_bundle(&command.policy_bundle)?;

    let http_client = Client::new();
    let mut sinks = Vec::with_capacity(config.siem.len());
    for (name, entry) in &config.siem {
        let auth = build_auth_scheme(&entry.auth, &http_client);
        let sink = SiemSink::new(entry.sink_config(name), auth)
            .map_err(|error| CliError::new(format!("failed to build siem sink {name}: {error}")))?;
        sinks.push(Arc::new(sink));
    }

    let audit_store = Arc::new(InMemoryAuditStore::new());
    let audit = Arc::new(AuditEmitter::spawn_with_sinks(config.audit.clone(), audit_store, sinks));

    let request_deadline_ms =
        i64::try_from(config.request.deadline_ms).map_err(|_| CliError::new("request.deadline_ms overflows i64"))?;
    let runtime_config = GatewayRuntimeConfig {
        default_rate_window_seconds: config.rate_limit.default_window_seconds,
        default_rate_limit: config.rate_limit.default_limit,
        request_deadline_ms,
        cost_window_seconds: GatewayRuntimeConfig::default().cost_window_seconds,
        retry: config.retry,
    };

    let gateway = Gateway::new(
        Arc::new(StaticPrincipalResolver::new()),
        Arc::new(InMemoryCapabilityRegistry::new()),
        Arc::new(InMemorySlidingWindowLimiter::new()),
        Arc::new(StaticPolicyEngine::new(bundle)),
        Arc::new(LruTtlDecisionCache::new(config.decision_cache.local_capacity)),
        Arc::new(LruTtlDecisionCache::new(config.decision_cache.local_capacity)),
        config.pdp,
        Arc::new(InMemoryCostLedger::new()),
        Arc::new(AdapterRegistry::new()),
        audit,
        Arc::new(NoopMetrics),
        runtime_config,
    );

    eprintln_stderr("gatekeeper assembled, waiting for shutdown signal")?;
    tokio::signal::ctrl_c().await.map_err(|error| CliError::new(format!("failed to await shutdown signal: {error}")))?;
    eprintln_stderr("shutdown signal received, draining adapters")?;
    gateway.drain(request_deadline_ms).await;

    Ok(ExitCode::SUCCESS)
}

/// Loads a JSON-encoded [`PolicyBundle`] and validates its rules.
fn load_policy_bundle(path: &Path) -> CliResult<PolicyBundle> {
    let bytes = fs::read(path).map_err(|error| CliError::new(format!("failed to read policy bundle: {error}")))?;
    let bundle: PolicyBundle = serde_json::from_slice(&bytes)
        .map_err(|error| CliError::new(format!("failed to parse policy bundle: {error}")))?;
    bundle
        .validate()
        .map_err(|error| CliError::new(format!("invalid policy bundle: {error}")))?;
    Ok(bundle)
}

/// Converts a config-file [`AuthConfig`] into a runtime [`AuthScheme`].
///
/// Split out of `gatekeeper-config` because the `OAuth2ClientCredentials`
/// variant needs a live `reqwest::blocking::Client` to build its token
/// cache, which cannot round-trip through TOML (see
/// `gatekeeper_config::config::AuthConfig`'s own doc comment).
fn build_auth_scheme(config: &AuthConfig, client: &Client) -> AuthScheme {
    match config {
        AuthConfig::None => AuthScheme::None,
        AuthConfig::Basic { username, password } => AuthScheme::Basic {
            username: username.clone(),
            password: password.clone(),
        },
        AuthConfig::Bearer { token } => AuthScheme::Bearer { token: token.clone() },
        AuthConfig::ApiKeyHeader { header_name, value } => AuthScheme::ApiKeyHeader {
            header_name: header_name.clone(),
            value: value.clone(),
        },
        AuthConfig::ApiKeyQuery { param_name, value } => AuthScheme::ApiKeyQuery {
            param_name: param_name.clone(),
            value: value.clone(),
        },
        AuthConfig::OAuth2ClientCredentials { token_url, client_id, client_secret, scope, refresh_skew_seconds } => {
            let oauth_config = OAuth2Config {
                token_url: token_url.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                scope: scope.clone(),
                refresh_skew_seconds: *refresh_skew_seconds,
            };
            AuthScheme::OAuth2ClientCredentials {
                cache: Arc::new(OAuth2TokenCache::new(oauth_config, client.clone())),
            }
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn println_stdout(message: &str) -> CliResult<()> {
    use std::io::Write;
    writeln!(std::io::stdout(), "{message}").map_err(|error| CliError::new(format!("failed to write stdout: {error}")))
}

/// Writes a line to stderr.
fn eprintln_stderr(message: &str) -> CliResult<()> {
    use std::io::Write;
    writeln!(std::io::stderr(), "{message}").map_err(|error| CliError::new(format!("failed to write stderr: {error}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = eprintln_stderr(message);
    ExitCode::FAILURE
}
