//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use devforge_core::{Project, ProjectStatus, ProjectStore, StoreMode};

use crate::error::CliError;

const SETTLE_LIMIT: Duration = Duration::from_secs(120);
const REMOTE_POLL: Duration = Duration::from_secs(1);

/// Resolve a project identifier (ID or name) against the current list.
pub async fn resolve_project(store: &ProjectStore, identifier: &str) -> Result<Project, CliError> {
    let projects = store.get_projects().await?;
    projects
        .iter()
        .find(|p| p.id == identifier)
        .or_else(|| projects.iter().find(|p| p.name == identifier))
        .cloned()
        .ok_or_else(|| CliError::project_not_found(identifier))
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

pub fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Validation {
        field: "file".into(),
        reason: format!("cannot read {}: {e}", path.display()),
    })
}

/// Split a `KEY=VALUE` flag value.
pub fn parse_env_pair(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(CliError::Validation {
            field: "env".into(),
            reason: format!("expected KEY=VALUE, got '{raw}'"),
        }),
    }
}

/// Block until project `id` reaches `target` (or `error`), showing a spinner.
///
/// Returns `None` if the project disappears while waiting.
pub async fn wait_for_status(
    store: &ProjectStore,
    id: &str,
    target: ProjectStatus,
    quiet: bool,
) -> Result<Option<Project>, CliError> {
    let spinner = spinner(quiet);
    let mut stream = store.watch();
    let remote = store.mode() == Some(StoreMode::Remote);
    let deadline = tokio::time::Instant::now() + SETTLE_LIMIT;

    loop {
        let Some(project) = stream.latest().iter().find(|p| p.id == id).cloned() else {
            spinner.finish_and_clear();
            return Ok(None);
        };
        if project.status == target || project.status == ProjectStatus::Error {
            spinner.finish_and_clear();
            return Ok(Some(project));
        }
        spinner.set_message(format!("{}: {}", project.name, project.status));

        tokio::select! {
            changed = stream.changed() => {
                if changed.is_none() {
                    spinner.finish_and_clear();
                    return Ok(None);
                }
            }
            () = tokio::time::sleep(REMOTE_POLL), if remote => {
                // Refetch in case realtime updates are off or lagging.
                store.get_projects().await?;
            }
            () = tokio::time::sleep_until(deadline) => {
                spinner.finish_and_clear();
                return Err(CliError::Timeout);
            }
        }
    }
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
