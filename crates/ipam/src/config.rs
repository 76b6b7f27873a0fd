//! CLI configuration: a thin wrapper around `ipam_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` overrides (`--profile`,
//! `--data-file`).

use ipam_core::IpamConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use ipam_config::{
    Config, Profile, config_path, default_data_file, load_config, load_config_or_default,
    save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Build the core configuration for this invocation.
///
/// An explicitly requested profile must exist. The implicit default profile
/// may be absent, in which case the default data file is used.
pub fn resolve_ipam_config(global: &GlobalOpts) -> Result<IpamConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = if global.profile.is_some() {
        Some(cfg.require_profile(&profile_name)?)
    } else {
        cfg.profiles.get(&profile_name)
    };

    tracing::debug!(profile = %profile_name, found = profile.is_some(), "resolved profile");
    Ok(ipam_config::profile_to_ipam_config(
        &cfg,
        profile,
        global.data_file.clone(),
    )?)
}
