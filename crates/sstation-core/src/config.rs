// ── Runtime host configuration ──
//
// These types describe *how* to reach one appliance. They carry credentials
// and connection tuning but never touch disk; `sstation-config` builds them
// from files and environment and hands them in.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use sstation_api::{TlsMode, TransportConfig};
use url::Url;

/// Host name used when the configuration does not give one.
pub const DEFAULT_HOST_NAME: &str = "SurveillanceStation";

/// Per-request timeout used when the configuration does not give one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for one Surveillance Station appliance.
///
/// Immutable once built. The `name` is the registry key.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub name: String,
    /// DSM root URL (e.g. `https://nas.local:5001`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// Per-request timeout; also bounds opening a live stream.
    pub timeout: Duration,
    /// Camera names to expose. Empty means every camera.
    pub whitelist: Whitelist,
    pub verify_ssl: bool,
    /// Extra CA certificate (PEM) trusted when `verify_ssl` is on.
    pub ca_cert: Option<PathBuf>,
}

impl HostConfig {
    /// A config with defaults for everything but the address and account.
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            name: DEFAULT_HOST_NAME.into(),
            url,
            username: username.into(),
            password,
            timeout: DEFAULT_TIMEOUT,
            whitelist: Whitelist::default(),
            verify_ssl: true,
            ca_cert: None,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from_verify(self.verify_ssl, self.ca_cert.clone()),
            timeout: self.timeout,
        }
    }
}

/// Allow-list of camera display names.
///
/// Applied once when camera entities are created, never on polls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist(BTreeSet<String>);

impl Whitelist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Whether a camera with this display name should become an entity.
    pub fn allows(&self, name: &str) -> bool {
        self.0.is_empty() || self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for Whitelist {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
