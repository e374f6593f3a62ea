// ── Mock simulator ──
//
// Deterministic stand-in for the backend: seed data, aggregate stats
// computed from the in-memory list, and workspace export/import against
// that list. Timed status transitions live in `transitions`.

mod transitions;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::error;

use crate::model::{
    BackendDraft, BackendFramework, CapacityStats, CpuStats, DatabaseDraft, DatabaseKind,
    EnvironmentDraft, FrontendDraft, FrontendFramework, NetworkPorts, PortConflict, Project,
    ProjectDraft, ProjectStatus, Provider, SystemResources, SystemStats, WorkspaceDocument,
    WorkspaceNetwork, WorkspaceProject, WorkspaceSchema, WorkspaceService,
};

pub use transitions::Transition;
pub(crate) use transitions::Transitions;

const SEED_JSON: &str = include_str!("seed.json");

/// Port ranges reported as "available" in mock stats.
const PORT_BASES: [u16; 3] = [3000, 8000, 5432];
const AVAILABLE_PER_BASE: usize = 3;

// ── Seed data ────────────────────────────────────────────────────────

/// The sample projects: `myblog` (running), `ecommerce-app` (stopped)
/// and `analytics-dashboard` (building).
pub fn seed_projects() -> Vec<Project> {
    match serde_json::from_str(SEED_JSON) {
        Ok(projects) => projects,
        Err(e) => {
            error!(error = %e, "mock seed data failed to parse");
            Vec::new()
        }
    }
}

// ── Stats ────────────────────────────────────────────────────────────

/// Recompute the aggregate snapshot from the current list.
pub fn system_stats(projects: &[Project]) -> SystemStats {
    let count = |status: ProjectStatus| projects.iter().filter(|p| p.status == status).count();

    let mut owners: BTreeMap<u16, Vec<String>> = BTreeMap::new();
    for project in projects {
        for port in project.ports() {
            owners.entry(port).or_default().push(project.name.clone());
        }
    }

    let used: Vec<u16> = owners.keys().copied().collect();
    let conflicts = owners
        .iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(port, names)| PortConflict {
            port: *port,
            projects: names.clone(),
        })
        .collect();
    let taken: BTreeSet<u16> = used.iter().copied().collect();
    let available = PORT_BASES
        .iter()
        .flat_map(|base| {
            (*base..=u16::MAX)
                .filter(|p| !taken.contains(p))
                .take(AVAILABLE_PER_BASE)
                .collect::<Vec<_>>()
        })
        .collect();

    SystemStats {
        total_projects: projects.len(),
        running_projects: count(ProjectStatus::Running),
        stopped_projects: count(ProjectStatus::Stopped),
        error_projects: count(ProjectStatus::Error),
        building_projects: count(ProjectStatus::Building),
        system_resources: SystemResources {
            cpu: CpuStats {
                usage: 35.2,
                cores: 8,
            },
            memory: CapacityStats::new(8192.0, 16384.0),
            disk: CapacityStats::new(102_400.0, 512_000.0),
        },
        network_ports: NetworkPorts {
            used,
            available,
            conflicts,
        },
    }
}

// ── Workspace export / import ────────────────────────────────────────

/// Build a workspace document describing `projects`.
///
/// Environment variables are only included with `include_secrets`.
pub fn export_workspace(projects: &[Project], include_secrets: bool, now: &str) -> WorkspaceSchema {
    WorkspaceSchema::new(WorkspaceDocument {
        id: None,
        name: "devforge".into(),
        description: Some("Exported from devforge mock data".into()),
        projects: projects
            .iter()
            .map(|p| workspace_project(p, include_secrets))
            .collect(),
        created_at: Some(now.to_owned()),
        updated_at: Some(now.to_owned()),
    })
}

fn workspace_project(project: &Project, include_secrets: bool) -> WorkspaceProject {
    let environment = if include_secrets {
        project.environment.variables.clone()
    } else {
        BTreeMap::new()
    };

    let mut services = vec![
        WorkspaceService {
            name: "frontend".into(),
            kind: project.frontend.framework.to_string(),
            port: Some(project.frontend.port),
            command: project.frontend.start_command.clone(),
            ..WorkspaceService::default()
        },
        WorkspaceService {
            name: "backend".into(),
            kind: project.backend.framework.to_string(),
            port: Some(project.backend.port),
            command: project.backend.start_command.clone(),
            environment,
            ..WorkspaceService::default()
        },
    ];
    if let Some(db) = &project.database {
        services.push(WorkspaceService {
            name: "database".into(),
            kind: db.kind.to_string(),
            port: db.port,
            ..WorkspaceService::default()
        });
    }

    let mut metadata = Map::new();
    if let Some(description) = &project.description {
        metadata.insert("description".into(), Value::String(description.clone()));
    }
    metadata.insert("status".into(), Value::String(project.status.to_string()));

    WorkspaceProject {
        id: Some(project.id.clone()),
        name: project.name.clone(),
        path: format!("./{}", project.name),
        provider: Provider::Docker,
        services,
        networks: vec![WorkspaceNetwork {
            name: format!("{}-net", project.name),
            driver: "bridge".into(),
            subnet: None,
        }],
        metadata: Some(metadata),
    }
}

/// Turn one workspace project into a draft for the store.
///
/// Services are matched by framework/database type first, then by name.
pub fn draft_from_workspace(project: &WorkspaceProject) -> ProjectDraft {
    let mut frontend = None;
    let mut backend = None;
    let mut database = None;
    let mut variables = BTreeMap::new();

    for service in &project.services {
        variables.extend(service.environment.clone());
        let kind = service.kind.to_ascii_lowercase();

        if let Ok(kind) = kind.parse::<DatabaseKind>() {
            database.get_or_insert(DatabaseDraft {
                kind,
                port: service.port,
                connection_string: None,
            });
        } else if let Ok(framework) = kind.parse::<FrontendFramework>() {
            frontend.get_or_insert(frontend_draft(service, Some(framework)));
        } else if let Ok(framework) = kind.parse::<BackendFramework>() {
            backend.get_or_insert(backend_draft(service, Some(framework)));
        } else if service.name == "frontend" || kind == "frontend" {
            frontend.get_or_insert(frontend_draft(service, None));
        } else if service.name == "backend" || kind == "backend" {
            backend.get_or_insert(backend_draft(service, None));
        }
    }

    let description = project
        .metadata
        .as_ref()
        .and_then(|m| m.get("description"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    ProjectDraft {
        name: Some(project.name.clone()),
        description,
        frontend,
        backend,
        database,
        environment: Some(EnvironmentDraft {
            mode: None,
            variables: Some(variables),
        }),
        resources: None,
        config: None,
    }
}

fn frontend_draft(service: &WorkspaceService, framework: Option<FrontendFramework>) -> FrontendDraft {
    FrontendDraft {
        port: service.port,
        framework,
        start_command: service.command.clone(),
        ..FrontendDraft::default()
    }
}

fn backend_draft(service: &WorkspaceService, framework: Option<BackendFramework>) -> BackendDraft {
    BackendDraft {
        port: service.port,
        framework,
        start_command: service.command.clone(),
        ..BackendDraft::default()
    }
}
