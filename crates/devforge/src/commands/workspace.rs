//! Workspace file handlers: validate, export, import.

use devforge_core::ProjectStore;

use crate::cli::{GlobalOpts, WorkspaceArgs, WorkspaceCommand};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    store: &ProjectStore,
    args: WorkspaceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        WorkspaceCommand::Validate { file } => {
            let json = util::read_file(&file)?;
            let validated = store.validate_workspace(&json).await?;
            output::print_output(&validated.summary(), global.quiet);
            Ok(())
        }

        WorkspaceCommand::Export {
            file,
            include_secrets,
        } => {
            let schema = store.export_workspace(include_secrets).await?;
            // A workspace file is always JSON, whatever --output says.
            let json = output::render_json_pretty(&schema);
            match file {
                Some(path) => {
                    std::fs::write(&path, format!("{json}\n"))?;
                    output::notice(
                        &format!(
                            "Exported {} project(s) to {}",
                            schema.workspace.projects.len(),
                            path.display()
                        ),
                        global.quiet,
                    );
                }
                None => output::print_output(&json, global.quiet),
            }
            Ok(())
        }

        WorkspaceCommand::Import { file, overwrite } => {
            let json = util::read_file(&file)?;
            let validated = store.validate_workspace(&json).await?;
            if overwrite
                && !util::confirm(
                    "import --overwrite",
                    &format!(
                        "Replace existing projects with the {} in {}?",
                        validated.project_count,
                        file.display()
                    ),
                    global.yes,
                )?
            {
                return Ok(());
            }
            let response = store.import_workspace(&validated.schema, overwrite).await?;
            output::notice(&response.message, global.quiet);
            let out = output::render_single(
                global.output,
                &response,
                |r| format!("Workspace: {}\nProjects:  {}", r.workspace_id, r.project_count),
                |r| r.workspace_id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
