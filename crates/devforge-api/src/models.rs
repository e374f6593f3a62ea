// Wire types for the devforge backend.
//
// Project-facing types use camelCase on the wire. The workspace
// interchange document (`workspace.json`) is snake_case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Response envelope ───────────────────────────────────────────────

/// Standard `{success, data?, error?}` envelope wrapping every project API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

// ── Status & framework enums ────────────────────────────────────────

/// Lifecycle status shared by projects and their individual services.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProjectStatus {
    Running,
    Stopped,
    Error,
    Building,
    Starting,
    Stopping,
}

impl ProjectStatus {
    /// `true` while a transition is in flight.
    pub fn is_transitional(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping | Self::Building)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FrontendFramework {
    React,
    Nextjs,
    Vue,
    Angular,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendFramework {
    Fastapi,
    Flask,
    Django,
    Express,
    Nestjs,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DatabaseKind {
    Postgresql,
    Mysql,
    Mongodb,
    Redis,
    Sqlite,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnvironmentMode {
    #[default]
    Development,
    Staging,
    Production,
}

/// Service selector used by log topics and log endpoints.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Service {
    Frontend,
    Backend,
    Database,
}

// ── Project ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendService {
    pub url: String,
    pub port: u16,
    pub status: ProjectStatus,
    pub framework: FrontendFramework,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendService {
    pub url: String,
    pub port: u16,
    pub status: ProjectStatus,
    pub framework: BackendFramework,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseService {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub mode: EnvironmentMode,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub usage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<f64>,
}

impl ResourceUsage {
    pub fn new(usage: f64, limit: f64) -> Self {
        Self {
            usage,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: ResourceUsage,
    pub memory: ResourceUsage,
    pub disk: ResourceUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct ProjectConfig {
    pub auto_restart: bool,
    pub watch_files: bool,
    pub hot_reload: bool,
    pub ssl: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            auto_restart: true,
            watch_files: true,
            hot_reload: true,
            ssl: false,
        }
    }
}

/// Per-service ordered log lists carried on a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectLogs {
    #[serde(default)]
    pub frontend: Vec<LogEntry>,
    #[serde(default)]
    pub backend: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Vec<LogEntry>>,
}

impl ProjectLogs {
    pub fn get(&self, service: Service) -> &[LogEntry] {
        match service {
            Service::Frontend => &self.frontend,
            Service::Backend => &self.backend,
            Service::Database => self.database.as_deref().unwrap_or_default(),
        }
    }

    pub fn replace(&mut self, service: Service, logs: Vec<LogEntry>) {
        match service {
            Service::Frontend => self.frontend = logs,
            Service::Backend => self.backend = logs,
            Service::Database => self.database = Some(logs),
        }
    }
}

/// A multi-service development project as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: String,
    pub updated_at: String,
    pub frontend: FrontendService,
    pub backend: BackendService,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseService>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub config: ProjectConfig,
    #[serde(default)]
    pub logs: ProjectLogs,
}

impl Project {
    /// Set the top-level status and every service status together.
    pub fn set_status(&mut self, status: ProjectStatus) {
        self.status = status;
        self.frontend.status = status;
        self.backend.status = status;
        if let Some(db) = self.database.as_mut() {
            db.status = status;
        }
    }

    /// Ports this project binds, in frontend/backend/database order.
    pub fn ports(&self) -> Vec<u16> {
        let mut ports = vec![self.frontend.port, self.backend.port];
        if let Some(port) = self.database.as_ref().and_then(|db| db.port) {
            ports.push(port);
        }
        ports
    }
}

// ── Logs ────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

/// One immutable log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub level: LogLevel,
    pub source: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

// ── System stats ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    pub usage: f64,
    pub cores: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityStats {
    pub used: f64,
    pub total: f64,
    pub available: f64,
}

impl CapacityStats {
    pub fn new(used: f64, total: f64) -> Self {
        Self {
            used,
            total,
            available: total - used,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemResources {
    pub cpu: CpuStats,
    pub memory: CapacityStats,
    pub disk: CapacityStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConflict {
    pub port: u16,
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPorts {
    pub used: Vec<u16>,
    pub available: Vec<u16>,
    #[serde(default)]
    pub conflicts: Vec<PortConflict>,
}

/// Aggregate snapshot, recomputed wholesale on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_projects: usize,
    pub running_projects: usize,
    pub stopped_projects: usize,
    pub error_projects: usize,
    pub building_projects: usize,
    pub system_resources: SystemResources,
    pub network_ports: NetworkPorts,
}

// ── Project creation ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest<F> {
    pub framework: F,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseRequest {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Body of `POST /api/projects`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub frontend: ServiceRequest<FrontendFramework>,
    pub backend: ServiceRequest<BackendFramework>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseRequest>,
    pub environment: Environment,
    pub config: ProjectConfig,
}

// ── Workspace interchange (workspace.json) ──────────────────────────

pub const WORKSPACE_SCHEMA_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    #[default]
    Docker,
    Vm,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceService {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceNetwork {
    pub name: String,
    #[serde(default = "default_network_driver")]
    pub driver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
}

fn default_network_driver() -> String {
    "bridge".into()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub services: Vec<WorkspaceService>,
    #[serde(default)]
    pub networks: Vec<WorkspaceNetwork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub projects: Vec<WorkspaceProject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Versioned import/export unit. Handed verbatim to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSchema {
    pub version: String,
    pub workspace: WorkspaceDocument,
}

impl WorkspaceSchema {
    pub fn new(workspace: WorkspaceDocument) -> Self {
        Self {
            version: WORKSPACE_SCHEMA_VERSION.to_owned(),
            workspace,
        }
    }

    pub fn project_count(&self) -> usize {
        self.workspace.projects.len()
    }

    pub fn service_count(&self) -> usize {
        self.workspace.projects.iter().map(|p| p.services.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceImportRequest<'a> {
    pub workspace_data: &'a WorkspaceSchema,
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceImportResponse {
    pub workspace_id: String,
    pub project_count: usize,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceValidateResponse {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn project_json() -> Value {
        json!({
            "id": "p1",
            "name": "myblog",
            "status": "running",
            "createdAt": "2024-01-15T10:30:00Z",
            "updatedAt": "2024-01-20T14:22:00Z",
            "frontend": {
                "url": "http://myblog.local", "port": 3000, "status": "running",
                "framework": "nextjs", "buildCommand": "npm run build"
            },
            "backend": {
                "url": "http://api.myblog.local", "port": 8000, "status": "running",
                "framework": "fastapi"
            },
            "database": { "type": "postgresql", "status": "running", "port": 5432 },
            "environment": { "mode": "development", "variables": { "NODE_ENV": "development" } },
            "resources": {
                "cpu": { "usage": 15.5, "limit": 2 },
                "memory": { "usage": 512, "limit": 2048 },
                "disk": { "usage": 1024 }
            },
            "config": { "autoRestart": true, "watchFiles": true, "hotReload": true, "ssl": false },
            "logs": { "frontend": [], "backend": [] }
        })
    }

    #[test]
    fn project_decodes_camel_case() {
        let project: Project = serde_json::from_value(project_json()).unwrap();
        assert_eq!(project.frontend.framework, FrontendFramework::Nextjs);
        assert_eq!(project.frontend.build_command.as_deref(), Some("npm run build"));
        assert_eq!(project.database.as_ref().unwrap().kind, DatabaseKind::Postgresql);
        assert_eq!(project.resources.disk.limit, None);
        assert_eq!(project.ports(), vec![3000, 8000, 5432]);
    }

    #[test]
    fn set_status_moves_services_in_lockstep() {
        let mut project: Project = serde_json::from_value(project_json()).unwrap();
        project.set_status(ProjectStatus::Stopping);
        assert_eq!(project.status, ProjectStatus::Stopping);
        assert_eq!(project.frontend.status, ProjectStatus::Stopping);
        assert_eq!(project.backend.status, ProjectStatus::Stopping);
        assert_eq!(
            project.database.as_ref().unwrap().status,
            ProjectStatus::Stopping
        );
    }

    #[test]
    fn missing_database_logs_read_as_empty() {
        let project: Project = serde_json::from_value(project_json()).unwrap();
        assert!(project.logs.get(Service::Database).is_empty());
    }

    #[test]
    fn envelope_without_data() {
        let resp: ApiResponse<Project> =
            serde_json::from_str(r#"{"success":false,"error":"Project not found"}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.error.as_deref(), Some("Project not found"));
    }

    #[test]
    fn workspace_schema_uses_snake_case() {
        let schema = WorkspaceSchema::new(WorkspaceDocument {
            name: "demo".into(),
            projects: vec![WorkspaceProject {
                name: "api".into(),
                path: "./api".into(),
                services: vec![WorkspaceService {
                    name: "web".into(),
                    kind: "backend".into(),
                    dockerfile_path: Some("Dockerfile".into()),
                    ..WorkspaceService::default()
                }],
                ..WorkspaceProject::default()
            }],
            ..WorkspaceDocument::default()
        });
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["version"], "2.0");
        assert_eq!(value["workspace"]["projects"][0]["provider"], "docker");
        assert_eq!(
            value["workspace"]["projects"][0]["services"][0]["dockerfile_path"],
            "Dockerfile"
        );
        assert_eq!(schema.service_count(), 1);
    }

    #[test]
    fn service_selector_strings() {
        assert_eq!(Service::Database.as_ref(), "database");
        assert_eq!("backend".parse::<Service>().unwrap(), Service::Backend);
    }
}
