//! Shared configuration for the devforge CLI.
//!
//! TOML profiles naming backend endpoints, `[realtime]` and `[mock]`
//! sections, and translation to `devforge_core::ForgeConfig`. The CLI layers
//! its global flags on top of what is resolved here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use devforge_core::{ForgeConfig, MockConfig, RealtimeConfig, TlsVerification};

pub const DEFAULT_PROFILE: &str = "default";
const ENV_PREFIX: &str = "DEVFORGE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub realtime: RealtimeSection,

    #[serde(default)]
    pub mock: MockSection,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some(DEFAULT_PROFILE.into()),
            defaults: Defaults::default(),
            realtime: RealtimeSection::default(),
            mock: MockSection::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// `[realtime]`: WebSocket behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RealtimeSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_log_buffer_capacity")]
    pub log_buffer_capacity: usize,
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            log_buffer_capacity: default_log_buffer_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_reconnect_delay_ms() -> u64 {
    3000
}
fn default_log_buffer_capacity() -> usize {
    5000
}

/// `[mock]`: simulator timings used when the backend is unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MockSection {
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,

    #[serde(default = "default_stop_delay_ms")]
    pub stop_delay_ms: u64,

    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Seed the sample projects.
    #[serde(default = "default_true")]
    pub seed: bool,

    /// Never contact the backend.
    #[serde(default)]
    pub force: bool,
}

impl Default for MockSection {
    fn default() -> Self {
        Self {
            start_delay_ms: default_start_delay_ms(),
            stop_delay_ms: default_stop_delay_ms(),
            restart_delay_ms: default_restart_delay_ms(),
            seed: true,
            force: false,
        }
    }
}

fn default_start_delay_ms() -> u64 {
    3000
}
fn default_stop_delay_ms() -> u64 {
    2000
}
fn default_restart_delay_ms() -> u64 {
    1000
}

/// A named backend profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend HTTP root (e.g., "http://localhost:8080").
    pub api_url: String,

    /// WebSocket root. Derived from `api_url` when absent.
    pub ws_url: Option<String>,

    /// Override the request timeout (seconds).
    pub timeout: Option<u64>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override the insecure TLS setting.
    pub insecure: Option<bool>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: devforge_core::config::DEFAULT_API_URL.into(),
            ws_url: None,
            timeout: None,
            ca_cert: None,
            insecure: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "devforge", "devforge").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("devforge");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing files are fine), then `DEVFORGE_*` variables.
///
/// Nested keys use a double underscore: `DEVFORGE_REALTIME__ENABLED=false`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

/// Pick the profile named `requested`, else the configured default.
///
/// An unconfigured `default` profile resolves to the built-in localhost one.
pub fn resolve_profile(cfg: &Config, requested: Option<&str>) -> Result<(String, Profile), ConfigError> {
    let name = requested
        .or(cfg.default_profile.as_deref())
        .unwrap_or(DEFAULT_PROFILE)
        .to_owned();

    match cfg.profiles.get(&name) {
        Some(profile) => Ok((name, profile.clone())),
        None if name == DEFAULT_PROFILE => Ok((name, Profile::default())),
        None => Err(ConfigError::ProfileNotFound { name }),
    }
}

/// Derive the WebSocket root from an HTTP root: `http` → `ws`,
/// `https` → `wss`, path `/ws`.
pub fn derive_ws_url(api_url: &Url) -> Result<Url, ConfigError> {
    let scheme = match api_url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(ConfigError::Validation {
                field: "api_url".into(),
                reason: format!("unsupported scheme '{other}'"),
            });
        }
    };
    let mut ws = api_url.clone();
    ws.set_scheme(scheme).map_err(|()| ConfigError::Validation {
        field: "ws_url".into(),
        reason: format!("cannot derive from {api_url}"),
    })?;
    ws.set_path("/ws");
    ws.set_query(None);
    Ok(ws)
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e: url::ParseError| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

/// Build a `ForgeConfig` from the file's sections and one profile.
pub fn to_forge_config(cfg: &Config, profile: &Profile) -> Result<ForgeConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;
    let ws_url = match &profile.ws_url {
        Some(raw) => parse_url("ws_url", raw)?,
        None => derive_ws_url(&api_url)?,
    };

    let tls = if profile.insecure.unwrap_or(cfg.defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ForgeConfig {
        api_url,
        ws_url,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(cfg.defaults.timeout)),
        realtime: RealtimeConfig {
            enabled: cfg.realtime.enabled,
            reconnect_delay: Duration::from_millis(cfg.realtime.reconnect_delay_ms),
            log_buffer_capacity: cfg.realtime.log_buffer_capacity,
        },
        mock: MockConfig {
            start_delay: Duration::from_millis(cfg.mock.start_delay_ms),
            stop_delay: Duration::from_millis(cfg.mock.stop_delay_ms),
            restart_delay: Duration::from_millis(cfg.mock.restart_delay_ms),
            seed: cfg.mock.seed,
        },
        force_mock: cfg.mock.force,
    })
}
