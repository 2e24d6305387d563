//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `CommandError` and `ConfigError` into user-facing
//! errors with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use sstation_config::ConfigError;
use sstation_core::{CommandError, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to Surveillance Station at {url}")]
    #[diagnostic(
        code(sstation::connection_failed),
        help(
            "Check that the appliance is reachable and the URL is right.\n\
             Reason: {reason}\n\
             Self-signed certificate? Set verify_ssl = false or ca_cert for this host."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("No host could be reached")]
    #[diagnostic(
        code(sstation::no_hosts),
        help("Every configured host failed to connect. Run with -v for details.")
    )]
    NoHosts,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(sstation::auth_failed),
        help(
            "Verify the username and password for this host.\n\
             The password can also come from SSTATION_<NAME>_PASSWORD."
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(sstation::not_found),
        help("Run: sstation {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Host '{name}' is not configured")]
    #[diagnostic(code(sstation::host_not_found), help("Configured hosts: {available}"))]
    HostNotFound { name: String, available: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(sstation::api_error))]
    Api { code: String, message: String },

    #[error("Operation '{operation}' is not supported by this appliance")]
    #[diagnostic(
        code(sstation::unsupported),
        help("The appliance does not advertise the Web API this command needs.")
    )]
    Unsupported { operation: String },

    #[error(transparent)]
    #[diagnostic(code(sstation::home_mode))]
    HomeMode(#[from] CommandError),

    // ── Configuration ────────────────────────────────────────────────
    #[error("No hosts configured")]
    #[diagnostic(
        code(sstation::no_config),
        help(
            "Add at least one [[hosts]] table to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(sstation::config))]
    Config(#[from] ConfigError),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sstation::validation))]
    Validation { field: String, reason: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(sstation::timeout),
        help("Increase the host's timeout or check appliance responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Serve ────────────────────────────────────────────────────────
    #[error("Could not listen on {addr}")]
    #[diagnostic(code(sstation::bind), help("Pick another address with --listen."))]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NoHosts => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::HostNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::HomeMode(CommandError::NotConfirmed { .. }) => exit_code::CONFLICT,
            Self::HomeMode(CommandError::UnknownHost { .. }) => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoConfig { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type,
                identifier,
                list_command: "cameras".into(),
            },

            CoreError::Unsupported { operation } => CliError::Unsupported { operation },

            CoreError::Api { message, code, .. } => CliError::Api {
                code: code.map_or_else(|| "http".into(), |c| c.to_string()),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Api {
                code: "internal".into(),
                message,
            },
        }
    }
}
