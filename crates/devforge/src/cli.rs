//! Clap derive structures for the `devforge` CLI.
//!
//! Defines the complete command tree, global flags, and shared value enums.
//! This file is also compiled by `build.rs`, so it depends on clap only.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// devforge -- manage local development environments
#[derive(Debug, Parser)]
#[command(
    name = "devforge",
    version,
    about = "Manage local development environments from the command line",
    long_about = "Start, stop and inspect frontend/backend/database projects run by the\n\
        devforge backend.\n\n\
        When the backend cannot be reached, commands run against a built-in\n\
        simulator seeded with sample projects.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "DEVFORGE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend HTTP URL (overrides profile)
    #[arg(long, env = "DEVFORGE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Backend WebSocket URL (overrides profile; derived from --api-url otherwise)
    #[arg(long, env = "DEVFORGE_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DEVFORGE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "DEVFORGE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "DEVFORGE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Never contact the backend; run against the built-in simulator
    #[arg(long, env = "DEVFORGE_FORCE_MOCK", global = true)]
    pub mock: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Domain value enums ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Running,
    Stopped,
    Error,
    Building,
    Starting,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceArg {
    Frontend,
    Backend,
    Database,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Info,
    Warn,
    Error,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrontendArg {
    React,
    Nextjs,
    Vue,
    Angular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Fastapi,
    Flask,
    Django,
    Express,
    Nestjs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatabaseArg {
    Postgresql,
    Mysql,
    Mongodb,
    Redis,
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Development,
    Staging,
    Production,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage projects and their lifecycle
    #[command(alias = "proj", alias = "p")]
    Projects(ProjectsArgs),

    /// Show or follow a project service's logs
    Logs(LogsArgs),

    /// Show system statistics and port usage
    Stats,

    /// Validate, export and import workspace files
    #[command(alias = "ws")]
    Workspace(WorkspaceArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PROJECTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ProjectsArgs {
    #[command(subcommand)]
    pub command: ProjectsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProjectsCommand {
    /// List projects
    #[command(alias = "ls")]
    List {
        /// Only show projects in this status
        #[arg(long, short = 's')]
        status: Option<StatusArg>,
    },

    /// Show project details
    Get {
        /// Project ID or name
        project: String,
    },

    /// Create a project
    Create(CreateArgs),

    /// Start a stopped project
    Start(LifecycleArgs),

    /// Stop a running project
    Stop(LifecycleArgs),

    /// Restart a project (stop, then start)
    Restart(LifecycleArgs),

    /// Delete a project
    #[command(alias = "rm")]
    Delete {
        /// Project ID or name
        project: String,
    },

    /// Print status changes as they happen (Ctrl-C to exit)
    Watch,
}

#[derive(Debug, Args)]
pub struct LifecycleArgs {
    /// Project ID or name
    pub project: String,

    /// Wait until the project settles in a non-transitional status
    #[arg(long, short = 'w')]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Project name
    #[arg(required_unless_present = "from_file")]
    pub name: Option<String>,

    /// Read the full project draft from a JSON file
    #[arg(long, short = 'F', conflicts_with = "name")]
    pub from_file: Option<PathBuf>,

    /// Free-form description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Frontend framework
    #[arg(long)]
    pub frontend: Option<FrontendArg>,

    /// Frontend port
    #[arg(long)]
    pub frontend_port: Option<u16>,

    /// Backend framework
    #[arg(long)]
    pub backend: Option<BackendArg>,

    /// Backend port
    #[arg(long)]
    pub backend_port: Option<u16>,

    /// Attach a database
    #[arg(long)]
    pub database: Option<DatabaseArg>,

    /// Environment mode
    #[arg(long)]
    pub mode: Option<ModeArg>,

    /// Environment variable (repeatable)
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE")]
    pub env: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Project ID or name
    pub project: String,

    /// Which service's log to show
    pub service: ServiceArg,

    /// Keep streaming new entries (Ctrl-C to exit)
    #[arg(long, short = 'f')]
    pub follow: bool,

    /// Only show the last N entries (after filtering)
    #[arg(long, short = 'n')]
    pub tail: Option<usize>,

    /// Only show entries at this level
    #[arg(long, short = 'l')]
    pub level: Option<LevelArg>,

    /// Only show entries whose message or source contains TERM (case-insensitive)
    #[arg(long, short = 'g', value_name = "TERM")]
    pub grep: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WORKSPACE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WorkspaceArgs {
    #[command(subcommand)]
    pub command: WorkspaceCommand,
}

#[derive(Debug, Subcommand)]
pub enum WorkspaceCommand {
    /// Check a workspace file and report every problem found
    Validate {
        /// Path to workspace.json
        file: PathBuf,
    },

    /// Export all projects as a workspace file
    Export {
        /// Write to this path instead of stdout
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,

        /// Include environment variables
        #[arg(long)]
        include_secrets: bool,
    },

    /// Import projects from a workspace file
    Import {
        /// Path to workspace.json
        file: PathBuf,

        /// Replace existing projects with the same name
        #[arg(long)]
        overwrite: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup (--yes accepts defaults)
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
