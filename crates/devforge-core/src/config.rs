// ── Runtime configuration ──
//
// These types describe *where* the backend lives and how the store and
// simulator behave. They never touch disk: `devforge-config` (or a test)
// constructs a `ForgeConfig` and hands it in.

use std::time::Duration;

use devforge_api::{ReconnectConfig, TlsMode, TransportConfig};
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";

/// TLS verification strategy for the HTTP API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed local proxies).
    DangerAcceptInvalid,
}

/// Realtime (WebSocket) behaviour.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Wire the store to the `projects` topic in remote mode.
    pub enabled: bool,
    /// Fixed delay before reconnecting after an unclean close.
    pub reconnect_delay: Duration,
    /// Maximum entries kept by a log stream; oldest are evicted.
    pub log_buffer_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconnect_delay: Duration::from_millis(3000),
            log_buffer_capacity: 5000,
        }
    }
}

impl RealtimeConfig {
    pub fn reconnect(&self) -> ReconnectConfig {
        ReconnectConfig {
            auto_reconnect: true,
            delay: self.reconnect_delay,
        }
    }
}

/// Mock simulator timings and seeding.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// `starting` → `running`.
    pub start_delay: Duration,
    /// `stopping` → `stopped`.
    pub stop_delay: Duration,
    /// Pause between the stop and start halves of a restart.
    pub restart_delay: Duration,
    /// Seed the three sample projects on fallback.
    pub seed: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(3000),
            stop_delay: Duration::from_millis(2000),
            restart_delay: Duration::from_millis(1000),
            seed: true,
        }
    }
}

/// Configuration for one project store.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Backend HTTP root (e.g., `http://localhost:8080`).
    pub api_url: Url,
    /// WebSocket root; topics are appended (e.g., `ws://localhost:8080/ws`).
    pub ws_url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub realtime: RealtimeConfig,
    pub mock: MockConfig,
    /// Skip the backend check and start in mock mode.
    pub force_mock: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            api_url: parse_default_url(DEFAULT_API_URL),
            ws_url: parse_default_url(DEFAULT_WS_URL),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            realtime: RealtimeConfig::default(),
            mock: MockConfig::default(),
            force_mock: false,
        }
    }
}

impl ForgeConfig {
    /// A config that never contacts a backend.
    pub fn mock() -> Self {
        Self {
            force_mock: true,
            ..Self::default()
        }
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}

fn parse_default_url(raw: &str) -> Url {
    Url::parse(raw).expect("built-in default URL is valid")
}
