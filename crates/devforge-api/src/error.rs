use thiserror::Error;

/// Top-level error type for the `devforge-api` crate.
///
/// Covers every failure mode across both API surfaces: the HTTP project
/// API and the WebSocket push topics. `devforge-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be built (TLS setup, bad CA file).
    #[error("HTTP client setup failed: {0}")]
    ClientBuild(String),

    // ── Backend API ─────────────────────────────────────────────────
    /// Non-2xx status or a `{success: false}` envelope.
    ///
    /// `status` is the HTTP status when the failure came from the
    /// transport layer; the message is the server's own text when it sent one.
    #[error("API request failed: {message}")]
    RequestFailed { status: Option<u16>, message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket handshake or read failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed by the peer with a non-normal code.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) => true,
            Self::RequestFailed { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::RequestFailed { status: Some(404), .. } => true,
            _ => false,
        }
    }

    /// The server-supplied message, if this error carries one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::RequestFailed { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::RequestFailed {
            status: Some(503),
            message: "backend warming up".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[test]
    fn envelope_failures_are_not_transient() {
        let err = Error::RequestFailed {
            status: None,
            message: "Project not found".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.server_message(), Some("Project not found"));
    }

    #[test]
    fn not_found_status_detected() {
        let err = Error::RequestFailed {
            status: Some(404),
            message: "HTTP error! status: 404".into(),
        };
        assert!(err.is_not_found());
    }
}
