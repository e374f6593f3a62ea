// ── Core error types ──
//
// User-facing errors from devforge-core. Consumers never see raw HTTP
// status codes or JSON parse failures; the `From<devforge_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

use crate::model::WorkspaceValidationError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Project not found: {identifier}")]
    ProjectNotFound { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} ({reason})")]
    Unsupported { operation: String, reason: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    #[error(transparent)]
    InvalidWorkspace(#[from] WorkspaceValidationError),

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound { .. } | Self::Api { status: Some(404), .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<devforge_api::Error> for CoreError {
    fn from(err: devforge_api::Error) -> Self {
        match err {
            devforge_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            devforge_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            devforge_api::Error::ClientBuild(message) => CoreError::Config { message },
            devforge_api::Error::RequestFailed { status, message } => {
                CoreError::Api { message, status }
            }
            devforge_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            devforge_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            devforge_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Unexpected response from backend: {message}"),
                status: None,
            },
        }
    }
}
