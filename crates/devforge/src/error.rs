//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use devforge_config::ConfigError;
use devforge_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the devforge backend at {url}")]
    #[diagnostic(
        code(devforge::connection_failed),
        help(
            "Check that the backend is running and accessible.\n\
             Reason: {reason}\n\
             Try: devforge --mock projects list"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(devforge::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(devforge::not_found),
        help("Run: devforge {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Operations ───────────────────────────────────────────────────
    #[error("Could not {action} project '{project}'")]
    #[diagnostic(
        code(devforge::operation_failed),
        help("Run with -v for the backend's reason.")
    )]
    OperationFailed { action: String, project: String },

    #[error("API error: {message}")]
    #[diagnostic(code(devforge::api_error))]
    Api { message: String, status: Option<u16> },

    #[error("'{operation}' is not available: {reason}")]
    #[diagnostic(code(devforge::unsupported))]
    Unsupported { operation: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(devforge::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid workspace file ({count} problem(s))")]
    #[diagnostic(code(devforge::invalid_workspace))]
    InvalidWorkspace {
        count: usize,
        #[help]
        details: String,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(devforge::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: devforge config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(devforge::config),
        help("Check the config file at: {path}")
    )]
    Config { message: String, path: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(devforge::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(devforge::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NotFound { .. }
            | Self::Api {
                status: Some(404), ..
            } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::InvalidWorkspace { .. }
            | Self::ProfileNotFound { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn project_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: "project".into(),
            identifier: identifier.into(),
            list_command: "projects list".into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::ProjectNotFound { identifier } => Self::project_not_found(identifier),
            CoreError::Unsupported { operation, reason } => Self::Unsupported { operation, reason },
            CoreError::OperationFailed { message } => Self::Api {
                message,
                status: None,
            },
            CoreError::InvalidWorkspace(e) => Self::InvalidWorkspace {
                count: e.issues.len(),
                details: e
                    .issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            },
            CoreError::Api { message, status } => Self::Api { message, status },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: available_profiles(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => Self::Config {
                message: other.to_string(),
                path: devforge_config::config_path().display().to_string(),
            },
        }
    }
}

fn available_profiles() -> String {
    let names: Vec<String> = devforge_config::load_config_or_default()
        .profiles
        .into_keys()
        .collect();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devforge_core::model::{WorkspaceIssue, WorkspaceValidationError};

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(CliError::project_not_found("x").exit_code(), exit_code::NOT_FOUND);
        assert_eq!(CliError::Timeout.exit_code(), exit_code::TIMEOUT);
        assert_eq!(
            CliError::from(CoreError::ConnectionFailed {
                url: "http://localhost:8080".into(),
                reason: "refused".into(),
            })
            .exit_code(),
            exit_code::CONNECTION
        );
        assert_eq!(
            CliError::from(CoreError::Api {
                message: "Project not found".into(),
                status: Some(404),
            })
            .exit_code(),
            exit_code::NOT_FOUND
        );
        assert_eq!(
            CliError::OperationFailed {
                action: "start".into(),
                project: "myblog".into(),
            }
            .exit_code(),
            exit_code::GENERAL
        );
    }

    #[test]
    fn workspace_issues_become_help_lines() {
        let core = CoreError::InvalidWorkspace(WorkspaceValidationError {
            issues: vec![
                WorkspaceIssue::MissingField("version".into()),
                WorkspaceIssue::NotAnArray("workspace.projects".into()),
            ],
        });
        let cli = CliError::from(core);
        assert_eq!(cli.exit_code(), exit_code::USAGE);
        let CliError::InvalidWorkspace { count, details } = cli else {
            panic!("expected workspace error");
        };
        assert_eq!(count, 2);
        assert_eq!(
            details,
            "Missing required field: version\nworkspace.projects must be an array"
        );
    }
}
