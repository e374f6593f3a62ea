//! Log command handler: one-shot fetch, optionally followed by the live topic.

use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

use devforge_core::{
    ConnectionState, ForgeConfig, LogEntry, LogLevel, LogStream, LogStreamEvent, ProjectStore,
    Service, StoreMode,
};

use crate::cli::{GlobalOpts, LevelArg, LogsArgs, OutputFormat, ServiceArg};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    store: &ProjectStore,
    config: &ForgeConfig,
    args: LogsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let project = util::resolve_project(store, &args.project).await?;
    let service = Service::from(args.service);
    let color = output::should_color(global.color);
    let filter = LogFilter::new(args.level.map(LogLevel::from), args.grep.as_deref());

    let mut entries = store.get_project_logs(&project.id, service).await;
    entries.retain(|e| filter.matches(e));
    if let Some(tail) = args.tail {
        let skip = entries.len().saturating_sub(tail);
        entries.drain(..skip);
    }

    if !args.follow {
        let out = output::render_list(
            global.output,
            &entries,
            |e| LogRow::new(e, color),
            |e| format_line(e, false),
        );
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    if store.mode() != Some(StoreMode::Remote) {
        return Err(CliError::Unsupported {
            operation: "logs --follow".into(),
            reason: "live logs need a reachable backend".into(),
        });
    }

    for entry in &entries {
        print_entry(entry, global, color);
    }
    follow(config, &project.id, service, &filter, global, color).await
}

// ── Filtering ───────────────────────────────────────────────────────

/// Level and substring filter shared by the one-shot and follow paths.
#[derive(Debug, Default)]
struct LogFilter {
    level: Option<LogLevel>,
    /// Lowercased search term.
    needle: Option<String>,
}

impl LogFilter {
    fn new(level: Option<LogLevel>, grep: Option<&str>) -> Self {
        Self {
            level,
            needle: grep
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(str::to_lowercase),
        }
    }

    fn matches(&self, entry: &LogEntry) -> bool {
        if self.level.is_some_and(|level| level != entry.level) {
            return false;
        }
        self.needle.as_deref().is_none_or(|needle| {
            entry.message.to_lowercase().contains(needle)
                || entry.source.to_lowercase().contains(needle)
        })
    }
}

// ── Follow ──────────────────────────────────────────────────────────

async fn follow(
    config: &ForgeConfig,
    project_id: &str,
    service: Service,
    filter: &LogFilter,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let stream = LogStream::new(&config.ws_url, project_id, service, &config.realtime)?;
    let mut events = stream.subscribe();
    let mut state = stream.watch_state();
    stream.connect();
    output::notice(&format!("Following {}", stream.url()), global.quiet);

    let result = loop {
        tokio::select! {
            _ = signal::ctrl_c() => break Ok(()),
            event = events.recv() => match event {
                Ok(LogStreamEvent::Entry(entry)) => {
                    if filter.matches(&entry) {
                        print_entry(&entry, global, color);
                    }
                }
                Ok(LogStreamEvent::Batch(batch)) => {
                    for entry in batch.iter().filter(|e| filter.matches(e)) {
                        print_entry(entry, global, color);
                    }
                }
                Ok(LogStreamEvent::Clear) => output::notice("-- log cleared --", global.quiet),
                Ok(LogStreamEvent::Unknown { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "log output fell behind; entries skipped");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *state.borrow_and_update();
                if let ConnectionState::Closed { clean: false } = current {
                    let reason = stream.error().unwrap_or_else(|| "connection lost".into());
                    output::notice(&format!("-- disconnected ({reason}), reconnecting --"), global.quiet);
                }
            }
        }
    };

    stream.disconnect();
    result
}

fn print_entry(entry: &LogEntry, global: &GlobalOpts, color: bool) {
    let line = match global.output {
        OutputFormat::Table | OutputFormat::Plain => format_line(entry, color),
        // One JSON document per line so the stream stays parseable.
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            serde_json::to_string(entry).unwrap_or_default()
        }
    };
    output::print_output(&line, global.quiet);
}

fn format_line(entry: &LogEntry, color: bool) -> String {
    format!(
        "{} {} [{}] {}",
        entry.timestamp,
        output::paint_level(entry.level, color),
        entry.source,
        entry.message
    )
}

#[derive(tabled::Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl LogRow {
    fn new(e: &LogEntry, color: bool) -> Self {
        Self {
            timestamp: e.timestamp.clone(),
            level: output::paint_level(e.level, color),
            source: e.source.clone(),
            message: e.message.clone(),
        }
    }
}

impl From<LevelArg> for LogLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Info => Self::Info,
            LevelArg::Warn => Self::Warn,
            LevelArg::Error => Self::Error,
            LevelArg::Debug => Self::Debug,
        }
    }
}

impl From<ServiceArg> for Service {
    fn from(arg: ServiceArg) -> Self {
        match arg {
            ServiceArg::Frontend => Self::Frontend,
            ServiceArg::Backend => Self::Backend,
            ServiceArg::Database => Self::Database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: LogLevel, source: &str, message: &str) -> LogEntry {
        LogEntry {
            id: "1".into(),
            timestamp: "2024-01-20T14:22:00Z".into(),
            level,
            source: source.into(),
            message: message.into(),
            metadata: None,
        }
    }

    #[test]
    fn grep_is_case_insensitive_over_message_and_source() {
        let filter = LogFilter::new(None, Some("UVICORN"));
        assert!(filter.matches(&entry(LogLevel::Info, "uvicorn", "started")));
        assert!(!filter.matches(&entry(LogLevel::Info, "vite", "started")));

        let filter = LogFilter::new(None, Some("Startup"));
        assert!(filter.matches(&entry(LogLevel::Info, "uvicorn", "Application startup complete.")));
    }

    #[test]
    fn level_and_grep_combine() {
        let filter = LogFilter::new(Some(LogLevel::Warn), Some("posts"));
        assert!(filter.matches(&entry(LogLevel::Warn, "uvicorn", "GET /api/posts took 1260 ms")));
        assert!(!filter.matches(&entry(LogLevel::Info, "uvicorn", "GET /api/posts")));
        assert!(!filter.matches(&entry(LogLevel::Warn, "uvicorn", "GET /api/users")));
    }

    #[test]
    fn blank_term_matches_everything() {
        let filter = LogFilter::new(None, Some("  "));
        assert!(filter.matches(&entry(LogLevel::Debug, "db", "anything")));
    }
}
