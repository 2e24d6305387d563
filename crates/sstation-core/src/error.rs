// ── Core error types ──
//
// User-facing errors from sstation-core. Consumers never match on HTTP
// statuses or envelope codes directly; the `From<sstation_api::Error>` impl
// translates transport-layer errors into these variants. Stream and
// control-action failures have their own types in `proxy` and `control`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to Surveillance Station at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Surveillance Station timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported by this appliance: {operation}")]
    Unsupported { operation: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Synology error code from the response envelope.
        code: Option<i64>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the failure is the appliance rejecting our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sstation_api::Error> for CoreError {
    fn from(err: sstation_api::Error) -> Self {
        use sstation_api::Error as ApiError;

        match err {
            ApiError::Authentication { message, .. } => CoreError::AuthenticationFailed { message },
            ApiError::SessionExpired { code } => CoreError::AuthenticationFailed {
                message: format!("Session expired (code {code}) and could not be renewed"),
            },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.origin().ascii_serialization())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Http { status, message } => CoreError::Api {
                message: format!("HTTP {status}: {message}"),
                code: None,
                status: Some(status),
            },
            ApiError::Api { code, message } => CoreError::Api {
                message,
                code: Some(code),
                status: None,
            },
            ApiError::CameraNotFound { camera_id } => CoreError::NotFound {
                entity_type: "Camera".into(),
                identifier: camera_id.to_string(),
            },
            ApiError::UnsupportedApi(api) => CoreError::Unsupported {
                operation: api.into(),
            },
            ApiError::Deserialization { message, .. } => CoreError::Api {
                message: format!("Unexpected response: {message}"),
                code: None,
                status: None,
            },
            ApiError::Stream(msg) => CoreError::Api {
                message: msg,
                code: None,
                status: None,
            },
            ApiError::FrameTooLarge { limit } => CoreError::Api {
                message: format!("MJPEG frame exceeds {limit} bytes"),
                code: None,
                status: None,
            },
            ApiError::Io(e) => CoreError::Internal(e.to_string()),
        }
    }
}
