// Shared transport configuration for building reqwest::Client instances.
//
// The Web API client and the MJPEG stream client share TLS and timeout
// settings through this module. They differ only in how the timeout is
// applied: API calls get a whole-request timeout, live streams only a
// connect timeout (the body never ends).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("sstation/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode (api-level mirror of core's `verify_ssl` flag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed appliances).
    DangerAcceptInvalid,
}

impl TlsMode {
    /// Derive the mode from a host's `verify_ssl` flag and optional CA file.
    pub fn from_verify(verify_ssl: bool, ca_cert: Option<PathBuf>) -> Self {
        match (verify_ssl, ca_cert) {
            (false, _) => Self::DangerAcceptInvalid,
            (true, Some(path)) => Self::CustomCa(path),
            (true, None) => Self::System,
        }
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    /// Build the `reqwest::Client` used for request/response API calls.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.builder()?
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build a `reqwest::Client` for open-ended streaming bodies.
    ///
    /// Only connection establishment is bounded here; per-read deadlines
    /// are enforced by the consumer of the body.
    pub fn build_stream_client(&self) -> Result<reqwest::Client, Error> {
        self.builder()?
            .connect_timeout(self.timeout)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build stream client: {e}")))
    }

    fn builder(&self) -> Result<reqwest::ClientBuilder, Error> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        Ok(builder)
    }
}
