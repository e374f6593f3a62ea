// ── Domain model ──
//
// Wire types come from `devforge-api` unchanged; this module adds the
// draft type used for creation and workspace validation.

mod draft;
mod workspace;

pub use devforge_api::models::*;

pub use draft::{
    BackendDraft, ConfigDraft, DEFAULT_BACKEND_PORT, DEFAULT_FRONTEND_PORT, DEFAULT_PROJECT_NAME,
    DatabaseDraft, EnvironmentDraft, FrontendDraft, ProjectDraft,
};
pub use workspace::{
    ValidatedWorkspace, WorkspaceIssue, WorkspaceValidationError, validate_schema,
    validate_workspace_json, validate_workspace_value,
};
