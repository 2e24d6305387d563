//! Configuration for sstation.
//!
//! A TOML file with a `[defaults]` table and one `[[hosts]]` table per
//! appliance, merged over built-in defaults and `SSTATION_` environment
//! variables, then translated into `sstation_core::HostConfig` values.
//! Each host is validated on its own so one bad entry never hides the rest.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sstation_core::config::{DEFAULT_HOST_NAME, DEFAULT_TIMEOUT};
use sstation_core::{HostConfig, Whitelist};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("host '{host}': invalid {field}: {reason}")]
    Validation {
        host: String,
        field: String,
        reason: String,
    },

    #[error("invalid {field}: {reason}")]
    Setting { field: String, reason: String },

    #[error("no password configured for host '{host}'")]
    NoCredentials { host: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub hosts: Vec<HostSection>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Seconds between entity polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Address the `serve` HTTP surface binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Default CLI output format.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            listen: default_listen(),
            output: default_output(),
        }
    }
}

fn default_poll_interval() -> u64 {
    30
}
fn default_listen() -> String {
    "127.0.0.1:8180".into()
}
fn default_output() -> String {
    "table".into()
}

/// One `[[hosts]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostSection {
    #[serde(default = "default_host_name")]
    pub name: String,

    /// DSM root URL (e.g. "https://nas.local:5001").
    pub url: String,

    pub username: String,

    /// Plaintext password. Prefer `password_env`.
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Camera names to expose; empty means all.
    #[serde(default)]
    pub whitelist: Vec<String>,

    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// Extra CA certificate (PEM) to trust.
    pub ca_cert: Option<PathBuf>,
}

fn default_host_name() -> String {
    DEFAULT_HOST_NAME.into()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_verify_ssl() -> bool {
    true
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("rs", "sstation", "sstation").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("sstation");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

fn extract(file: impl Provider) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(file)
        .merge(Env::prefixed("SSTATION_").split("__"));

    Ok(figment.extract()?)
}

/// Load the config from `path`, or from [`config_path`] when `None`.
///
/// An explicitly given path must exist; a missing default file just means
/// built-in defaults and no hosts.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::NotFound {
                path: p.to_path_buf(),
            });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };
    extract(Toml::file(path))
}

/// Parse a config from a TOML string (environment still applies).
pub fn load_config_str(toml: &str) -> Result<Config, ConfigError> {
    extract(Toml::string(toml))
}

impl Config {
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        if self.defaults.poll_interval == 0 {
            return Err(ConfigError::Setting {
                field: "defaults.poll_interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(Duration::from_secs(self.defaults.poll_interval))
    }

    /// Translate every `[[hosts]]` entry, reading passwords from the process
    /// environment. Results stay in file order.
    pub fn host_configs(&self) -> Vec<Result<HostConfig, ConfigError>> {
        self.host_configs_with(|key| std::env::var(key).ok())
    }

    /// As [`host_configs`](Self::host_configs) with a custom environment.
    pub fn host_configs_with<F>(&self, env: F) -> Vec<Result<HostConfig, ConfigError>>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.hosts
            .iter()
            .map(|host| host_to_config(host, &env))
            .collect()
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// `SSTATION_{NAME}_PASSWORD`, with the host name upper-cased and anything
/// but ASCII letters and digits replaced by `_`.
pub fn password_env_var(host_name: &str) -> String {
    let name: String = host_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("SSTATION_{name}_PASSWORD")
}

/// Resolve a host's password: `password_env`, then
/// `SSTATION_{NAME}_PASSWORD`, then the plaintext `password`.
pub fn resolve_password<F>(host: &HostSection, env: F) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1. Named env var
    if let Some(ref var) = host.password_env {
        if let Some(pw) = env(var) {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Conventional env var
    if let Some(pw) = env(&password_env_var(&host.name)) {
        return Ok(SecretString::from(pw));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = host.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        host: host.name.clone(),
    })
}

fn invalid(host: &HostSection, field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        host: host.name.clone(),
        field: field.into(),
        reason: reason.into(),
    }
}

/// Build a `HostConfig` from one `[[hosts]]` entry.
pub fn host_to_config<F>(host: &HostSection, env: F) -> Result<HostConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let url: url::Url = host
        .url
        .parse()
        .map_err(|e| invalid(host, "url", format!("{e}: {}", host.url)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(host, "url", format!("expected http or https, got {}", url.scheme())));
    }

    if host.username.trim().is_empty() {
        return Err(invalid(host, "username", "must not be empty"));
    }
    if host.timeout == 0 {
        return Err(invalid(host, "timeout", "must be greater than zero"));
    }

    let password = resolve_password(host, env)?;

    Ok(HostConfig {
        name: host.name.clone(),
        url,
        username: host.username.clone(),
        password,
        timeout: Duration::from_secs(host.timeout),
        whitelist: host.whitelist.iter().cloned().collect::<Whitelist>(),
        verify_ssl: host.verify_ssl,
        ca_cert: host.ca_cert.clone(),
    })
}
