//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use ipam_config::ConfigError;
use ipam_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const STORE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input ────────────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ipam::validation))]
    Validation { field: String, reason: String },

    #[error("{message}")]
    #[diagnostic(
        code(ipam::address_not_in_subnet),
        help("Run: ipam subnets find --contains <address> to see which subnets hold it")
    )]
    AddressNotInSubnet { message: String },

    #[error("DNS name '{name}' is outside every registered zone")]
    #[diagnostic(
        code(ipam::no_matching_zone),
        help(
            "Register the zone first: ipam zones create <zone> --mname <ns> --rname <mailbox>\n\
             Run: ipam zones list to see registered zones"
        )
    )]
    NoMatchingZone { name: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(ipam::not_found),
        help("Run: ipam {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(ipam::conflict))]
    Conflict { message: String },

    #[error("Subnet {subnet} has no free addresses")]
    #[diagnostic(
        code(ipam::subnet_exhausted),
        help("Release an address with: ipam addresses delete <id>, or use a larger subnet")
    )]
    SubnetExhausted { subnet: String },

    #[error("Could not claim an address in {subnet} after {attempts} attempts")]
    #[diagnostic(
        code(ipam::allocation_conflict),
        help(
            "Other writers kept taking the candidate address. Retry, or raise\n\
             allocation_attempts with: ipam config set allocation_attempts <n>"
        )
    )]
    AllocationConflict { subnet: String, attempts: u32 },

    // ── Storage ──────────────────────────────────────────────────────
    #[error("Data store failure: {message}")]
    #[diagnostic(
        code(ipam::store),
        help("Check that the data file exists, is readable, and holds an ipam document.")
    )]
    Store { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ipam::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ipam config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(ipam::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(ipam::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(ipam::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(ipam::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. }
            | Self::AddressNotInSubnet { .. }
            | Self::NoMatchingZone { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::SubnetExhausted { .. } | Self::AllocationConflict { .. } => {
                exit_code::CONFLICT
            }
            Self::Store { .. } => exit_code::STORE,
            Self::ProfileNotFound { .. }
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

fn list_command_for(entity_type: &str) -> &'static str {
    match entity_type.to_ascii_lowercase().as_str() {
        "address" => "addresses list",
        "dns zone" | "zone" => "zones list",
        _ => "subnets list",
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidAddress { input, reason } => CliError::Validation {
                field: format!("address '{input}'"),
                reason,
            },
            CoreError::InvalidCidr { input, reason } => CliError::Validation {
                field: format!("CIDR '{input}'"),
                reason,
            },
            CoreError::InvalidHostname { name, reason } => CliError::Validation {
                field: format!("hostname '{name}'"),
                reason,
            },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::NoMatchingZone { name } => CliError::NoMatchingZone { name },
            err @ CoreError::AddressNotInSubnet { .. } => CliError::AddressNotInSubnet {
                message: err.to_string(),
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: list_command_for(&entity_type).into(),
                resource_type: entity_type,
                identifier,
            },

            err @ (CoreError::AddressAlreadyAssigned { .. }
            | CoreError::DuplicateSubnet { .. }
            | CoreError::DuplicateName { .. }
            | CoreError::DuplicateZone { .. }) => CliError::Conflict {
                message: err.to_string(),
            },
            CoreError::SubnetExhausted { subnet } => CliError::SubnetExhausted { subnet },
            CoreError::AllocationConflict { subnet, attempts } => {
                CliError::AllocationConflict { subnet, attempts }
            }

            CoreError::Store { message } => CliError::Store { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::SubnetExhausted {
                    subnet: "10.0.0.0/30".into(),
                },
                exit_code::CONFLICT,
            ),
            (
                CoreError::NotFound {
                    entity_type: "Subnet".into(),
                    identifier: "9".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::InvalidCidr {
                    input: "10.0.0.0/33".into(),
                    reason: "prefix too long".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::DuplicateZone {
                    name: "example.com".into(),
                },
                exit_code::CONFLICT,
            ),
            (
                CoreError::Store {
                    message: "disk full".into(),
                },
                exit_code::STORE,
            ),
        ];
        for (core, code) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn not_found_points_at_the_right_list_command() {
        let err = CliError::from(CoreError::NotFound {
            entity_type: "Address".into(),
            identifier: "4".into(),
        });
        match err {
            CliError::NotFound { list_command, .. } => assert_eq!(list_command, "addresses list"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn missing_profile_lists_alternatives() {
        let err = CliError::from(ConfigError::ProfileNotFound {
            name: "prod".into(),
            available: vec!["lab".into(), "home".into()],
        });
        match err {
            CliError::ProfileNotFound { available, .. } => assert_eq!(available, "lab, home"),
            other => panic!("unexpected: {other}"),
        }
    }
}
