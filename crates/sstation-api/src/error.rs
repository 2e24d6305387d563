use thiserror::Error;

/// Top-level error type for the `sstation-api` crate.
///
/// Covers every failure mode of the appliance Web API: authentication,
/// transport, the `{ success, data, error }` envelope, and MJPEG streaming.
/// `sstation-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, disabled account, 2FA required...).
    #[error("Authentication failed: {message}")]
    Authentication { code: Option<i64>, message: String },

    /// The session id is no longer accepted by the appliance.
    #[error("Session expired (code {code}) -- re-authentication required")]
    SessionExpired { code: i64 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, TLS, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status outside the API envelope.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // ── Web API ─────────────────────────────────────────────────────
    /// `success: false` envelope with a Synology error code.
    #[error("Surveillance Station API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The appliance answered but does not know this camera.
    #[error("Camera {camera_id} not found")]
    CameraNotFound { camera_id: u32 },

    /// The appliance does not advertise an API this client needs.
    #[error("API not available on this appliance: {0}")]
    UnsupportedApi(&'static str),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Streaming ───────────────────────────────────────────────────
    /// The upstream live stream is not usable (bad status, bad content type).
    #[error("Stream error: {0}")]
    Stream(String),

    /// A single multipart part grew past the frame limit.
    #[error("MJPEG frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },

    /// Byte-level I/O failure while reading the upstream body.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this error indicates the session has expired
    /// and a fresh login might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` if this is a transient network failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Extract the Synology error code, if available.
    pub fn api_error_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } | Self::SessionExpired { code } => Some(*code),
            Self::Authentication { code, .. } => *code,
            _ => None,
        }
    }
}

/// Codes that mean "your sid is no good", across all APIs.
pub(crate) const SESSION_ERROR_CODES: [i64; 4] = [105, 106, 107, 119];

/// Human-readable text for the common Synology error codes.
pub(crate) fn describe_code(code: i64) -> &'static str {
    match code {
        100 => "unknown error",
        101 => "invalid parameter",
        102 => "requested API does not exist",
        103 => "requested method does not exist",
        104 => "requested version does not support the functionality",
        105 => "insufficient user privilege",
        106 => "session timeout",
        107 => "session interrupted by duplicate login",
        119 => "session id not found",
        400 => "no such account or incorrect password",
        401 => "account disabled",
        402 => "permission denied",
        403 => "2-step verification code required",
        404 => "failed to authenticate 2-step verification code",
        _ => "unrecognized error",
    }
}
