//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

/// Keys accepted by `config set`.
const SETTABLE_KEYS: &str = "data_file, allocation_attempts, description";

fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "data_file" | "data-file" => {
            if value.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "data_file".into(),
                    reason: "path must not be empty".into(),
                });
            }
            profile.data_file = Some(PathBuf::from(value));
        }
        "allocation_attempts" | "allocation-attempts" => {
            let attempts: u32 = value.parse().map_err(|_| CliError::Validation {
                field: "allocation_attempts".into(),
                reason: "must be a positive number".into(),
            })?;
            if attempts == 0 {
                return Err(CliError::Validation {
                    field: "allocation_attempts".into(),
                    reason: "must be at least 1".into(),
                });
            }
            profile.allocation_attempts = Some(attempts);
        }
        "description" => profile.description = Some(value),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {SETTABLE_KEYS}"),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            let default_name = global.profile.clone().unwrap_or_else(|| "default".into());
            let default_file = global
                .data_file
                .clone()
                .unwrap_or_else(config::default_data_file);

            // --yes accepts every default without prompting
            let (profile_name, data_file) = if global.yes {
                (default_name, default_file)
            } else {
                output::hint(
                    global,
                    &format!("ipam configuration wizard\nConfig path: {}\n", config_path.display()),
                );
                let name: String = Input::new()
                    .with_prompt("Profile name")
                    .default(default_name)
                    .interact_text()
                    .map_err(prompt_err)?;
                let file: String = Input::new()
                    .with_prompt("Data file")
                    .default(default_file.display().to_string())
                    .interact_text()
                    .map_err(prompt_err)?;
                (name, PathBuf::from(file))
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    data_file: Some(data_file),
                    ..Profile::default()
                },
            );
            cfg.default_profile = Some(profile_name.clone());

            let written = config::save_config(&cfg)?;
            output::success(
                global,
                &format!("Configuration written to {}", written.display()),
            );
            output::hint(global, &format!("Active profile: {profile_name}"));
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                global.output,
                &cfg,
                |c: &Config| toml::to_string_pretty(c).unwrap_or_else(|_| format!("{c:#?}")),
                |c| c.active_profile_name(global.profile.as_deref()),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                output::hint(global, "No profiles configured. Run: ipam config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            cfg.require_profile(&name)?;
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::success(global, &format!("Default profile set to '{name}'"));
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_value(profile, &key, value)?;
            config::save_config(&cfg)?;
            output::success(global, &format!("Set {key} on profile '{profile_name}'"));
            Ok(())
        }
    }
}
