// ── Workspace document validation ──
//
// Runs on the raw JSON so every structural problem is reported, not just
// the first one serde would trip over. Only a document that passes every
// check is decoded into the typed `WorkspaceSchema`.

use serde_json::Value;
use thiserror::Error;

use devforge_api::{WORKSPACE_SCHEMA_VERSION, WorkspaceSchema};

/// One failed check, addressed by a JSON-path-like location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceIssue {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("{0} must be a non-empty string")]
    EmptyString(String),

    #[error("Unsupported schema version: {0} (expected 2.0)")]
    UnsupportedVersion(String),

    #[error("{0} must be an array")]
    NotAnArray(String),

    #[error("{0}.provider must be one of: docker, vm")]
    InvalidProvider(String),

    #[error("{0}.port must be an integer between 1 and 65535")]
    InvalidPort(String),

    #[error("{0}.environment must map string keys to string values")]
    InvalidEnvironment(String),

    #[error("Malformed workspace document: {0}")]
    Malformed(String),

    #[error("Rejected by backend: {0}")]
    Rejected(String),
}

/// Every check a workspace document failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid workspace file: {}", summarize(.issues))]
pub struct WorkspaceValidationError {
    pub issues: Vec<WorkspaceIssue>,
}

fn summarize(issues: &[WorkspaceIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A document that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedWorkspace {
    pub schema: WorkspaceSchema,
    pub project_count: usize,
}

impl ValidatedWorkspace {
    pub fn summary(&self) -> String {
        format!(
            "Valid workspace file with {} project(s)",
            self.project_count
        )
    }
}

/// Validate a `workspace.json` string.
///
/// Invalid JSON is reported on its own; otherwise all checks run.
pub fn validate_workspace_json(json: &str) -> Result<ValidatedWorkspace, WorkspaceValidationError> {
    let value: Value = serde_json::from_str(json).map_err(|e| WorkspaceValidationError {
        issues: vec![WorkspaceIssue::InvalidJson(e.to_string())],
    })?;
    validate_workspace_value(value)
}

/// Validate an already-parsed document.
pub fn validate_workspace_value(
    value: Value,
) -> Result<ValidatedWorkspace, WorkspaceValidationError> {
    let issues = check_document(&value);
    if !issues.is_empty() {
        return Err(WorkspaceValidationError { issues });
    }

    let schema: WorkspaceSchema =
        serde_json::from_value(value).map_err(|e| WorkspaceValidationError {
            issues: vec![WorkspaceIssue::Malformed(e.to_string())],
        })?;
    let project_count = schema.project_count();
    Ok(ValidatedWorkspace {
        schema,
        project_count,
    })
}

/// Re-check a typed schema, e.g. one built in code or received from a backend.
pub fn validate_schema(schema: &WorkspaceSchema) -> Result<(), WorkspaceValidationError> {
    let value = serde_json::to_value(schema).map_err(|e| WorkspaceValidationError {
        issues: vec![WorkspaceIssue::Malformed(e.to_string())],
    })?;
    let issues = check_document(&value);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(WorkspaceValidationError { issues })
    }
}

// ── Checks ───────────────────────────────────────────────────────────

fn check_document(doc: &Value) -> Vec<WorkspaceIssue> {
    let mut issues = Vec::new();

    match doc.get("version") {
        None | Some(Value::Null) => issues.push(WorkspaceIssue::MissingField("version".into())),
        Some(Value::String(v)) if v == WORKSPACE_SCHEMA_VERSION => {}
        Some(other) => issues.push(WorkspaceIssue::UnsupportedVersion(display_scalar(other))),
    }

    let Some(workspace) = doc.get("workspace").filter(|w| w.is_object()) else {
        issues.push(WorkspaceIssue::MissingField("workspace".into()));
        return issues;
    };

    check_non_empty_string(workspace, "name", "workspace", &mut issues);

    match workspace.get("projects") {
        Some(Value::Array(projects)) => {
            for (i, project) in projects.iter().enumerate() {
                check_project(project, &format!("projects[{i}]"), &mut issues);
            }
        }
        _ => issues.push(WorkspaceIssue::NotAnArray("workspace.projects".into())),
    }

    issues
}

fn check_project(project: &Value, path: &str, issues: &mut Vec<WorkspaceIssue>) {
    check_non_empty_string(project, "name", path, issues);
    check_non_empty_string(project, "path", path, issues);

    match project.get("provider") {
        None | Some(Value::Null) => {}
        Some(Value::String(p)) if p == "docker" || p == "vm" => {}
        Some(_) => issues.push(WorkspaceIssue::InvalidProvider(path.to_owned())),
    }

    match project.get("services") {
        None | Some(Value::Null) => {}
        Some(Value::Array(services)) => {
            for (i, service) in services.iter().enumerate() {
                check_service(service, &format!("{path}.services[{i}]"), issues);
            }
        }
        Some(_) => issues.push(WorkspaceIssue::NotAnArray(format!("{path}.services"))),
    }

    match project.get("networks") {
        None | Some(Value::Null | Value::Array(_)) => {}
        Some(_) => issues.push(WorkspaceIssue::NotAnArray(format!("{path}.networks"))),
    }
}

fn check_service(service: &Value, path: &str, issues: &mut Vec<WorkspaceIssue>) {
    check_non_empty_string(service, "name", path, issues);
    check_non_empty_string(service, "type", path, issues);

    if let Some(port) = service.get("port").filter(|p| !p.is_null()) {
        let valid = port.as_u64().is_some_and(|p| (1..=65535).contains(&p));
        if !valid {
            issues.push(WorkspaceIssue::InvalidPort(path.to_owned()));
        }
    }

    match service.get("environment") {
        None | Some(Value::Null) => {}
        Some(Value::Object(env)) if env.values().all(Value::is_string) => {}
        Some(_) => issues.push(WorkspaceIssue::InvalidEnvironment(path.to_owned())),
    }
}

fn check_non_empty_string(parent: &Value, field: &str, path: &str, issues: &mut Vec<WorkspaceIssue>) {
    let location = format!("{path}.{field}");
    match parent.get(field) {
        None | Some(Value::Null) => issues.push(WorkspaceIssue::MissingField(location)),
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        Some(_) => issues.push(WorkspaceIssue::EmptyString(location)),
    }
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
