//! CLI configuration: thin wrapper around `devforge_config`.
//!
//! Adds resolution that layers `GlobalOpts` flag overrides (--api-url,
//! --ws-url, --timeout, --insecure, --mock) over the selected profile.

use devforge_core::ForgeConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use devforge_config::{Config, Profile, config_path, load_config, save_config};

/// Build the store configuration. Flags take priority over the profile.
pub fn forge_config(global: &GlobalOpts) -> Result<ForgeConfig, CliError> {
    let cfg = load_config()?;
    let (name, profile) = devforge_config::resolve_profile(&cfg, global.profile.as_deref())?;
    tracing::debug!(profile = %name, "resolved profile");

    let profile = apply_overrides(profile, global);
    let mut forge = devforge_config::to_forge_config(&cfg, &profile)?;
    forge.force_mock |= global.mock;
    Ok(forge)
}

fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref api_url) = global.api_url {
        profile.api_url.clone_from(api_url);
        // A profile's ws_url belongs to its own api_url.
        profile.ws_url = None;
    }
    if let Some(ref ws_url) = global.ws_url {
        profile.ws_url = Some(ws_url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    profile
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["devforge"];
        argv.extend_from_slice(args);
        argv.push("stats");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn base_profile() -> Profile {
        Profile {
            api_url: "http://forge.lan:8080".into(),
            ws_url: Some("ws://forge.lan:9000/ws".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn api_url_flag_drops_profile_ws_url() {
        let profile = apply_overrides(base_profile(), &global(&["--api-url", "https://other.dev"]));
        assert_eq!(profile.api_url, "https://other.dev");
        assert_eq!(profile.ws_url, None);

        let forge = devforge_config::to_forge_config(&Config::default(), &profile).unwrap();
        assert_eq!(forge.ws_url.as_str(), "wss://other.dev/ws");
    }

    #[test]
    fn explicit_flags_win() {
        let profile = apply_overrides(
            base_profile(),
            &global(&["--ws-url", "ws://x/ws", "--timeout", "4", "-k"]),
        );
        assert_eq!(profile.api_url, "http://forge.lan:8080");
        assert_eq!(profile.ws_url.as_deref(), Some("ws://x/ws"));
        assert_eq!(profile.timeout, Some(4));
        assert_eq!(profile.insecure, Some(true));
    }

    #[test]
    fn no_flags_keep_profile() {
        assert_eq!(apply_overrides(base_profile(), &global(&[])), base_profile());
    }
}
