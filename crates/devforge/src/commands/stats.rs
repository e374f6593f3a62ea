//! System stats handler.

use devforge_core::{ProjectStore, SystemStats};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn join_ports(ports: &[u16]) -> String {
    if ports.is_empty() {
        return "-".into();
    }
    ports.iter().map(u16::to_string).collect::<Vec<_>>().join(", ")
}

fn detail(s: &SystemStats) -> String {
    let res = &s.system_resources;
    let mut lines = vec![
        format!(
            "Projects:  {} total, {} running, {} stopped, {} building, {} error",
            s.total_projects,
            s.running_projects,
            s.stopped_projects,
            s.building_projects,
            s.error_projects
        ),
        format!("CPU:       {:.1}% of {} cores", res.cpu.usage, res.cpu.cores),
        format!(
            "Memory:    {:.0} / {:.0} MB ({:.0} MB free)",
            res.memory.used, res.memory.total, res.memory.available
        ),
        format!(
            "Disk:      {:.0} / {:.0} MB ({:.0} MB free)",
            res.disk.used, res.disk.total, res.disk.available
        ),
        format!("Ports:     {}", join_ports(&s.network_ports.used)),
        format!("Free:      {}", join_ports(&s.network_ports.available)),
    ];
    for conflict in &s.network_ports.conflicts {
        lines.push(format!(
            "Conflict:  port {} shared by {}",
            conflict.port,
            conflict.projects.join(", ")
        ));
    }
    lines.join("\n")
}

pub async fn handle(store: &ProjectStore, global: &GlobalOpts) -> Result<(), CliError> {
    let stats = store.get_system_stats().await?;
    let out = output::render_single(global.output, &stats, detail, |s| {
        format!("{}/{}", s.running_projects, s.total_projects)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
