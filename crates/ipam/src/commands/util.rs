//! Shared helpers for command handlers.

use std::io::IsTerminal;

use ipam_core::{Ipam, Subnet, SubnetId};

use crate::error::CliError;

/// Resolve a subnet reference: a numeric id, a CIDR, or a subnet name.
///
/// Digits-only references are ids; anything with a `/` is a CIDR.
pub async fn resolve_subnet(ipam: &Ipam, reference: &str) -> Result<Subnet, CliError> {
    let reference = reference.trim();
    let subnet = if let Ok(id) = reference.parse::<u64>() {
        ipam.subnet(SubnetId::new(id)).await?
    } else if reference.contains('/') {
        ipam.subnet_by_cidr(reference).await?
    } else {
        ipam.subnet_by_name(reference).await?
    };
    Ok(subnet)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the action is refused.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
