//! Config subcommand handlers.

use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})")),
                |c| c.default_profile.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}

// ── Init ────────────────────────────────────────────────────────────

/// Add (or replace) a profile and make it the default. With `--yes` the
/// global flags and built-in defaults are used without prompting.
fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_path();
    let mut cfg = if path.exists() {
        config::load_config()?
    } else {
        Config::default()
    };

    let default_name = global
        .profile
        .clone()
        .unwrap_or_else(|| devforge_config::DEFAULT_PROFILE.into());
    let defaults = Profile::default();

    let (name, profile) = if global.yes {
        let profile = Profile {
            api_url: global.api_url.clone().unwrap_or(defaults.api_url),
            ws_url: global.ws_url.clone(),
            timeout: global.timeout,
            insecure: global.insecure.then_some(true),
            ca_cert: None,
        };
        (default_name, profile)
    } else {
        eprintln!("devforge configuration");
        eprintln!("  Config path: {}\n", path.display());
        let name: String = Input::new()
            .with_prompt("Profile name")
            .default(default_name)
            .interact_text()
            .map_err(prompt_err)?;
        (name, prompt_profile(global, defaults)?)
    };

    // Reject unusable URLs before anything is written.
    devforge_config::to_forge_config(&cfg, &profile)?;

    if cfg.profiles.contains_key(&name)
        && !crate::commands::util::confirm(
            "config init",
            &format!("Replace existing profile '{name}'?"),
            global.yes,
        )?
    {
        return Ok(());
    }

    cfg.profiles.insert(name.clone(), profile);
    cfg.default_profile = Some(name.clone());
    let written = config::save_config(&cfg)?;

    output::notice(
        &format!("Configuration written to {}\n  Default profile: {name}", written.display()),
        global.quiet,
    );
    Ok(())
}

fn prompt_profile(global: &GlobalOpts, defaults: Profile) -> Result<Profile, CliError> {
    let api_url: String = Input::new()
        .with_prompt("Backend URL")
        .default(global.api_url.clone().unwrap_or(defaults.api_url))
        .interact_text()
        .map_err(prompt_err)?;

    let ws_url: String = Input::new()
        .with_prompt("WebSocket URL (empty to derive from backend URL)")
        .default(global.ws_url.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    Ok(Profile {
        api_url,
        ws_url: (!ws_url.trim().is_empty()).then_some(ws_url),
        timeout: global.timeout,
        insecure: global.insecure.then_some(true),
        ca_cert: None,
    })
}
