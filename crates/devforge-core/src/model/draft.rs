// ── Project drafts ──
//
// The partial project accepted by `ProjectStore::create_project`. Every
// field is optional; `into_project` merges it over structural defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use devforge_api::{
    BackendFramework, BackendService, CreateProjectRequest, DatabaseKind, DatabaseRequest,
    DatabaseService, Environment, EnvironmentMode, FrontendFramework, FrontendService, Project,
    ProjectConfig, ProjectLogs, ProjectStatus, ResourceUsage, Resources, ServiceRequest,
};

pub const DEFAULT_PROJECT_NAME: &str = "new-project";
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;
pub const DEFAULT_BACKEND_PORT: u16 = 8000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontendDraft {
    pub url: Option<String>,
    pub port: Option<u16>,
    pub framework: Option<FrontendFramework>,
    pub build_command: Option<String>,
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendDraft {
    pub url: Option<String>,
    pub port: Option<u16>,
    pub framework: Option<BackendFramework>,
    pub build_command: Option<String>,
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDraft {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentDraft {
    pub mode: Option<EnvironmentMode>,
    pub variables: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigDraft {
    pub auto_restart: Option<bool>,
    pub watch_files: Option<bool>,
    pub hot_reload: Option<bool>,
    pub ssl: Option<bool>,
}

/// Caller-supplied overrides for a new project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frontend: Option<FrontendDraft>,
    pub backend: Option<BackendDraft>,
    pub database: Option<DatabaseDraft>,
    pub environment: Option<EnvironmentDraft>,
    pub resources: Option<Resources>,
    pub config: Option<ConfigDraft>,
}

impl ProjectDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_PROJECT_NAME)
    }

    /// Merge over defaults into a complete, `stopped` project.
    pub fn into_project(self, id: String, now: String) -> Project {
        let name = self.name().to_owned();
        let frontend = self.frontend.unwrap_or_default();
        let backend = self.backend.unwrap_or_default();
        let environment = self.environment.unwrap_or_default();
        let config = merge_config(self.config);

        let frontend_framework = frontend.framework.unwrap_or(FrontendFramework::React);
        let backend_framework = backend.framework.unwrap_or(BackendFramework::Fastapi);
        let (fe_build, fe_start) = frontend_commands(frontend_framework);
        let (be_build, be_start) = backend_commands(backend_framework);

        let database = self.database.map(|db| DatabaseService {
            kind: db.kind,
            status: ProjectStatus::Stopped,
            port: db.port.or_else(|| default_database_port(db.kind)),
            connection_string: db.connection_string,
        });

        Project {
            id,
            description: Some(self.description.unwrap_or_default()),
            status: ProjectStatus::Stopped,
            created_at: now.clone(),
            updated_at: now,
            frontend: FrontendService {
                url: frontend
                    .url
                    .unwrap_or_else(|| format!("http://{name}.local")),
                port: frontend.port.unwrap_or(DEFAULT_FRONTEND_PORT),
                status: ProjectStatus::Stopped,
                framework: frontend_framework,
                build_command: Some(frontend.build_command.unwrap_or_else(|| fe_build.into())),
                start_command: Some(frontend.start_command.unwrap_or_else(|| fe_start.into())),
            },
            backend: BackendService {
                url: backend
                    .url
                    .unwrap_or_else(|| format!("http://api.{name}.local")),
                port: backend.port.unwrap_or(DEFAULT_BACKEND_PORT),
                status: ProjectStatus::Stopped,
                framework: backend_framework,
                build_command: Some(backend.build_command.unwrap_or_else(|| be_build.into())),
                start_command: Some(backend.start_command.unwrap_or_else(|| be_start.into())),
            },
            database,
            environment: Environment {
                mode: environment.mode.unwrap_or_default(),
                variables: environment.variables.unwrap_or_default(),
            },
            resources: self.resources.unwrap_or_else(default_resources),
            config,
            logs: ProjectLogs::default(),
            name,
        }
    }

    /// Request body for `POST /api/projects`.
    pub fn to_request(&self) -> CreateProjectRequest {
        let frontend = self.frontend.clone().unwrap_or_default();
        let backend = self.backend.clone().unwrap_or_default();
        let environment = self.environment.clone().unwrap_or_default();

        CreateProjectRequest {
            name: self.name().to_owned(),
            description: self.description.clone(),
            frontend: ServiceRequest {
                framework: frontend.framework.unwrap_or(FrontendFramework::React),
                port: frontend.port,
                build_command: frontend.build_command,
                start_command: frontend.start_command,
            },
            backend: ServiceRequest {
                framework: backend.framework.unwrap_or(BackendFramework::Fastapi),
                port: backend.port,
                build_command: backend.build_command,
                start_command: backend.start_command,
            },
            database: self.database.as_ref().map(|db| DatabaseRequest {
                kind: db.kind,
                port: db.port,
            }),
            environment: Environment {
                mode: environment.mode.unwrap_or_default(),
                variables: environment.variables.unwrap_or_default(),
            },
            config: merge_config(self.config),
        }
    }
}

fn merge_config(draft: Option<ConfigDraft>) -> ProjectConfig {
    let defaults = ProjectConfig::default();
    let draft = draft.unwrap_or_default();
    ProjectConfig {
        auto_restart: draft.auto_restart.unwrap_or(defaults.auto_restart),
        watch_files: draft.watch_files.unwrap_or(defaults.watch_files),
        hot_reload: draft.hot_reload.unwrap_or(defaults.hot_reload),
        ssl: draft.ssl.unwrap_or(defaults.ssl),
    }
}

fn default_resources() -> Resources {
    Resources {
        cpu: ResourceUsage::new(0.0, 2.0),
        memory: ResourceUsage::new(0.0, 2048.0),
        disk: ResourceUsage::new(0.0, 10240.0),
    }
}

/// `(build, start)` commands per frontend framework.
fn frontend_commands(framework: FrontendFramework) -> (&'static str, &'static str) {
    match framework {
        FrontendFramework::Vue => ("npm run build", "npm run serve"),
        FrontendFramework::React | FrontendFramework::Nextjs | FrontendFramework::Angular => {
            ("npm run build", "npm run dev")
        }
    }
}

/// `(build, start)` commands per backend framework.
fn backend_commands(framework: BackendFramework) -> (&'static str, &'static str) {
    match framework {
        BackendFramework::Fastapi => ("pip install -r requirements.txt", "uvicorn main:app --reload"),
        BackendFramework::Flask => ("pip install -r requirements.txt", "flask run"),
        BackendFramework::Django => (
            "pip install -r requirements.txt",
            "python manage.py runserver",
        ),
        BackendFramework::Express | BackendFramework::Nestjs => ("npm install", "npm run dev"),
    }
}

fn default_database_port(kind: DatabaseKind) -> Option<u16> {
    match kind {
        DatabaseKind::Postgresql => Some(5432),
        DatabaseKind::Mysql => Some(3306),
        DatabaseKind::Mongodb => Some(27017),
        DatabaseKind::Redis => Some(6379),
        DatabaseKind::Sqlite => None,
    }
}
