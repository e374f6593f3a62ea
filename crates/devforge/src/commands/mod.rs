//! Command dispatch: bridges CLI args -> store calls -> output formatting.

pub mod config_cmd;
pub mod logs;
pub mod projects;
pub mod stats;
pub mod util;
pub mod workspace;

use devforge_core::{ForgeConfig, ProjectStore};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a store-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    store: &ProjectStore,
    config: &ForgeConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Projects(args) => projects::handle(store, args, global).await,
        Command::Logs(args) => logs::handle(store, config, args, global).await,
        Command::Stats => stats::handle(store, global).await,
        Command::Workspace(args) => workspace::handle(store, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
