//! Shared configuration for the `ipam` CLI.
//!
//! TOML profiles, platform paths, and translation to
//! `ipam_core::IpamConfig`. The CLI layers its `GlobalOpts` overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ipam_core::allocation::DEFAULT_MAX_ATTEMPTS;
use ipam_core::{IpamConfig, StoreConfig};

/// Environment variable that points at an alternate config file.
pub const CONFIG_PATH_ENV: &str = "IPAM_CONFIG";

/// File name of the data document when no profile names one.
pub const DEFAULT_DATA_FILE_NAME: &str = "ipam.json";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

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
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named data-file profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// The requested profile name, else the configured default, else `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// Known profile names, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Look up a profile, failing with the list of known names.
    pub fn require_profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_allocation_attempts")]
    pub allocation_attempts: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            allocation_attempts: default_allocation_attempts(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_allocation_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// A named profile: one data file and its tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// JSON document backing this profile. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,

    /// Override `defaults.allocation_attempts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_attempts: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "ipam", "ipam")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    for part in parts {
        p.push(part);
    }
    p
}

/// Resolve the config file path: `$IPAM_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || home_fallback(&[".config", "ipam", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Data file used when neither a flag nor the profile names one.
pub fn default_data_file() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "ipam", DEFAULT_DATA_FILE_NAME]),
        |dirs| dirs.data_dir().join(DEFAULT_DATA_FILE_NAME),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
///
/// Environment overrides use a double underscore as the path separator,
/// e.g. `IPAM_DEFAULTS__ALLOCATION_ATTEMPTS=8`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("IPAM_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or unreadable.
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

// ── Translation to core config ──────────────────────────────────────

/// Build an `IpamConfig` for a profile. `data_file` (from a flag) wins over
/// the profile's file, which wins over [`default_data_file`].
pub fn profile_to_ipam_config(
    cfg: &Config,
    profile: Option<&Profile>,
    data_file: Option<PathBuf>,
) -> Result<IpamConfig, ConfigError> {
    let attempts = profile
        .and_then(|p| p.allocation_attempts)
        .unwrap_or(cfg.defaults.allocation_attempts);
    if attempts == 0 {
        return Err(ConfigError::Validation {
            field: "allocation_attempts".into(),
            reason: "must be at least 1".into(),
        });
    }

    let path = data_file
        .or_else(|| profile.and_then(|p| p.data_file.clone()))
        .unwrap_or_else(default_data_file);
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            field: "data_file".into(),
            reason: "path must not be empty".into(),
        });
    }

    Ok(IpamConfig {
        store: StoreConfig::File { path },
        allocation_attempts: attempts,
    })
}
