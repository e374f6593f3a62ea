//! Project command handlers.

use std::collections::{BTreeMap, HashMap};

use tabled::Tabled;
use tokio::signal;

use devforge_core::model::{
    BackendDraft, BackendFramework, DatabaseDraft, DatabaseKind, EnvironmentDraft,
    EnvironmentMode, FrontendDraft, FrontendFramework,
};
use devforge_core::{Project, ProjectDraft, ProjectStatus, ProjectStore};

use crate::cli::{
    BackendArg, CreateArgs, DatabaseArg, FrontendArg, GlobalOpts, LifecycleArgs, ModeArg,
    ProjectsArgs, ProjectsCommand, StatusArg,
};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Frontend")]
    frontend: String,
    #[tabled(rename = "Backend")]
    backend: String,
    #[tabled(rename = "Database")]
    database: String,
}

impl ProjectRow {
    fn new(p: &Project, color: bool) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            status: output::paint_status(p.status, color),
            frontend: format!("{} :{}", p.frontend.framework, p.frontend.port),
            backend: format!("{} :{}", p.backend.framework, p.backend.port),
            database: p.database.as_ref().map_or_else(
                || "-".into(),
                |db| match db.port {
                    Some(port) => format!("{} :{port}", db.kind),
                    None => db.kind.to_string(),
                },
            ),
        }
    }
}

fn detail(p: &Project, color: bool) -> String {
    let mut lines = vec![
        format!("ID:          {}", p.id),
        format!("Name:        {}", p.name),
        format!("Status:      {}", output::paint_status(p.status, color)),
        format!("Description: {}", p.description.as_deref().unwrap_or("-")),
        format!("Created:     {}", p.created_at),
        format!("Updated:     {}", p.updated_at),
        format!(
            "Frontend:    {} on {} ({}, {})",
            p.frontend.framework,
            p.frontend.port,
            p.frontend.url,
            output::paint_status(p.frontend.status, color)
        ),
        format!(
            "Backend:     {} on {} ({}, {})",
            p.backend.framework,
            p.backend.port,
            p.backend.url,
            output::paint_status(p.backend.status, color)
        ),
    ];
    if let Some(ref db) = p.database {
        lines.push(format!(
            "Database:    {} on {} ({})",
            db.kind,
            db.port.map_or_else(|| "-".into(), |port| port.to_string()),
            output::paint_status(db.status, color)
        ));
    }
    lines.push(format!("Mode:        {}", p.environment.mode));
    for key in p.environment.variables.keys() {
        lines.push(format!("  env        {key}"));
    }
    lines.push(format!(
        "Resources:   cpu {:.1}%  mem {:.0}MB  disk {:.0}MB",
        p.resources.cpu.usage, p.resources.memory.usage, p.resources.disk.usage
    ));
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    store: &ProjectStore,
    args: ProjectsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);

    match args.command {
        ProjectsCommand::List { status } => {
            let mut projects = store.get_projects().await?;
            if let Some(status) = status {
                let wanted = ProjectStatus::from(status);
                projects.retain(|p| p.status == wanted);
            }
            let out = output::render_list(
                global.output,
                &projects,
                |p| ProjectRow::new(p, color),
                |p| p.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProjectsCommand::Get { project } => {
            let p = util::resolve_project(store, &project).await?;
            let out = output::render_single(global.output, &p, |p| detail(p, color), |p| p.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProjectsCommand::Create(args) => {
            let draft = build_draft(args)?;
            let created = store.create_project(draft).await?;
            output::notice(&format!("Project {} created ({})", created.name, created.id), global.quiet);
            let out = output::render_single(
                global.output,
                &created,
                |p| detail(p, color),
                |p| p.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProjectsCommand::Start(args) => lifecycle(store, Action::Start, &args, global).await,
        ProjectsCommand::Stop(args) => lifecycle(store, Action::Stop, &args, global).await,
        ProjectsCommand::Restart(args) => lifecycle(store, Action::Restart, &args, global).await,

        ProjectsCommand::Delete { project } => {
            let p = util::resolve_project(store, &project).await?;
            if !util::confirm("delete", &format!("Delete project {} ({})?", p.name, p.id), global.yes)? {
                return Ok(());
            }
            if !store.delete_project(&p.id).await {
                return Err(CliError::OperationFailed {
                    action: "delete".into(),
                    project: p.name,
                });
            }
            output::notice(&format!("Project {} deleted", p.name), global.quiet);
            Ok(())
        }

        ProjectsCommand::Watch => watch(store, global, color).await,
    }
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Action {
    Start,
    Stop,
    Restart,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }

    fn target(self) -> ProjectStatus {
        match self {
            Self::Start | Self::Restart => ProjectStatus::Running,
            Self::Stop => ProjectStatus::Stopped,
        }
    }
}

async fn lifecycle(
    store: &ProjectStore,
    action: Action,
    args: &LifecycleArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let p = util::resolve_project(store, &args.project).await?;
    let accepted = match action {
        Action::Start => store.start_project(&p.id).await,
        Action::Stop => store.stop_project(&p.id).await,
        Action::Restart => store.restart_project(&p.id).await,
    };
    if !accepted {
        return Err(CliError::OperationFailed {
            action: action.verb().into(),
            project: p.name,
        });
    }

    if !args.wait {
        let status = store
            .projects()
            .iter()
            .find(|q| q.id == p.id)
            .map_or(p.status, |q| q.status);
        output::notice(&format!("Project {}: {status}", p.name), global.quiet);
        return Ok(());
    }

    match util::wait_for_status(store, &p.id, action.target(), global.quiet).await? {
        Some(settled) if settled.status == ProjectStatus::Error => Err(CliError::OperationFailed {
            action: action.verb().into(),
            project: settled.name,
        }),
        Some(settled) => {
            output::notice(&format!("Project {}: {}", settled.name, settled.status), global.quiet);
            Ok(())
        }
        None => Err(CliError::project_not_found(p.id)),
    }
}

// ── Watch ───────────────────────────────────────────────────────────

async fn watch(store: &ProjectStore, global: &GlobalOpts, color: bool) -> Result<(), CliError> {
    let initial = store.get_projects().await?;
    let out = output::render_list(
        global.output,
        &initial,
        |p| ProjectRow::new(p, color),
        |p| p.id.clone(),
    );
    output::print_output(&out, global.quiet);

    let mut seen: HashMap<String, (String, ProjectStatus)> = initial
        .iter()
        .map(|p| (p.id.clone(), (p.name.clone(), p.status)))
        .collect();
    let mut stream = store.watch();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => return Ok(()),
            changed = stream.changed() => {
                let Some(snapshot) = changed else {
                    return Ok(());
                };
                for line in diff_statuses(&mut seen, &snapshot, color) {
                    output::print_output(&line, global.quiet);
                }
            }
        }
    }
}

/// One line per added, removed or re-statused project; updates `seen`.
fn diff_statuses(
    seen: &mut HashMap<String, (String, ProjectStatus)>,
    snapshot: &[Project],
    color: bool,
) -> Vec<String> {
    let mut lines = Vec::new();
    for p in snapshot {
        match seen.insert(p.id.clone(), (p.name.clone(), p.status)) {
            None => lines.push(format!("+ {} ({})", p.name, output::paint_status(p.status, color))),
            Some((_, old)) if old != p.status => lines.push(format!(
                "  {}: {} -> {}",
                p.name,
                output::paint_status(old, color),
                output::paint_status(p.status, color)
            )),
            Some(_) => {}
        }
    }
    seen.retain(|id, (name, _)| {
        let present = snapshot.iter().any(|p| &p.id == id);
        if !present {
            lines.push(format!("- {name}"));
        }
        present
    });
    lines
}

// ── Draft building ──────────────────────────────────────────────────

fn build_draft(args: CreateArgs) -> Result<ProjectDraft, CliError> {
    if let Some(ref path) = args.from_file {
        let contents = util::read_file(path)?;
        return Ok(serde_json::from_str(&contents)?);
    }

    let variables = args
        .env
        .iter()
        .map(String::as_str)
        .map(util::parse_env_pair)
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(ProjectDraft {
        name: args.name,
        description: args.description,
        frontend: (args.frontend.is_some() || args.frontend_port.is_some()).then(|| FrontendDraft {
            framework: args.frontend.map(FrontendFramework::from),
            port: args.frontend_port,
            ..FrontendDraft::default()
        }),
        backend: (args.backend.is_some() || args.backend_port.is_some()).then(|| BackendDraft {
            framework: args.backend.map(BackendFramework::from),
            port: args.backend_port,
            ..BackendDraft::default()
        }),
        database: args.database.map(|kind| DatabaseDraft {
            kind: kind.into(),
            port: None,
            connection_string: None,
        }),
        environment: (args.mode.is_some() || !variables.is_empty()).then(|| EnvironmentDraft {
            mode: args.mode.map(EnvironmentMode::from),
            variables: (!variables.is_empty()).then_some(variables),
        }),
        ..ProjectDraft::default()
    })
}

// ── Arg → model conversions ─────────────────────────────────────────

impl From<StatusArg> for ProjectStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Running => Self::Running,
            StatusArg::Stopped => Self::Stopped,
            StatusArg::Error => Self::Error,
            StatusArg::Building => Self::Building,
            StatusArg::Starting => Self::Starting,
            StatusArg::Stopping => Self::Stopping,
        }
    }
}

impl From<FrontendArg> for FrontendFramework {
    fn from(arg: FrontendArg) -> Self {
        match arg {
            FrontendArg::React => Self::React,
            FrontendArg::Nextjs => Self::Nextjs,
            FrontendArg::Vue => Self::Vue,
            FrontendArg::Angular => Self::Angular,
        }
    }
}

impl From<BackendArg> for BackendFramework {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Fastapi => Self::Fastapi,
            BackendArg::Flask => Self::Flask,
            BackendArg::Django => Self::Django,
            BackendArg::Express => Self::Express,
            BackendArg::Nestjs => Self::Nestjs,
        }
    }
}

impl From<DatabaseArg> for DatabaseKind {
    fn from(arg: DatabaseArg) -> Self {
        match arg {
            DatabaseArg::Postgresql => Self::Postgresql,
            DatabaseArg::Mysql => Self::Mysql,
            DatabaseArg::Mongodb => Self::Mongodb,
            DatabaseArg::Redis => Self::Redis,
            DatabaseArg::Sqlite => Self::Sqlite,
        }
    }
}

impl From<ModeArg> for EnvironmentMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Development => Self::Development,
            ModeArg::Staging => Self::Staging,
            ModeArg::Production => Self::Production,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn create_args(name: &str) -> CreateArgs {
        CreateArgs {
            name: Some(name.into()),
            from_file: None,
            description: None,
            frontend: None,
            frontend_port: None,
            backend: None,
            backend_port: None,
            database: None,
            mode: None,
            env: Vec::new(),
        }
    }

    #[test]
    fn bare_name_leaves_sections_to_defaults() {
        let draft = build_draft(create_args("demo")).unwrap();
        assert_eq!(draft, ProjectDraft::named("demo"));
    }

    #[test]
    fn flags_fill_the_draft() {
        let mut args = create_args("shop");
        args.backend = Some(BackendArg::Express);
        args.backend_port = Some(4000);
        args.database = Some(DatabaseArg::Redis);
        args.env = vec!["API_KEY=abc".into()];

        let draft = build_draft(args).unwrap();
        let backend = draft.backend.unwrap();
        assert_eq!(backend.framework, Some(BackendFramework::Express));
        assert_eq!(backend.port, Some(4000));
        assert!(draft.frontend.is_none());
        assert_eq!(draft.database.unwrap().kind, DatabaseKind::Redis);
        let env = draft.environment.unwrap();
        assert_eq!(env.mode, None);
        assert_eq!(env.variables.unwrap()["API_KEY"], "abc");
    }

    #[test]
    fn status_diff_reports_changes_once() {
        let seed = devforge_core::simulator::seed_projects();
        let mut seen = HashMap::new();
        let added = diff_statuses(&mut seen, &seed, false);
        assert_eq!(added.len(), seed.len());

        let mut next = seed.clone();
        next[0].status = ProjectStatus::Stopping;
        next.pop();
        let lines = diff_statuses(&mut seen, &next, false);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(&format!("{} -> stopping", seed[0].status)));
        assert!(lines[1].starts_with("- "));

        assert!(diff_statuses(&mut seen, &next, false).is_empty());
    }
}
