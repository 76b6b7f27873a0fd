// ── Core error types ──
//
// User-facing errors from ipam-core. Storage backends report their own
// `StoreError`; the `From<StoreError>` impl translates uniqueness conflicts
// into the domain variants callers match on.

use thiserror::Error;

use crate::store::{Constraint, StoreError};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid IP address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("Invalid CIDR '{input}': {reason}")]
    InvalidCidr { input: String, reason: String },

    #[error("Invalid hostname '{name}': {reason}")]
    InvalidHostname { name: String, reason: String },

    #[error("DNS name '{name}' does not belong to any registered zone")]
    NoMatchingZone { name: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Address-space errors ─────────────────────────────────────────
    #[error("Address {address} is not within subnet {subnet}")]
    AddressNotInSubnet { address: String, subnet: String },

    #[error("Address {address} is already assigned")]
    AddressAlreadyAssigned { address: String },

    #[error("Subnet {subnet} has no free addresses")]
    SubnetExhausted { subnet: String },

    #[error("Could not claim an address in {subnet} after {attempts} attempts")]
    AllocationConflict { subnet: String, attempts: u32 },

    // ── Uniqueness errors ────────────────────────────────────────────
    #[error("Subnet {cidr} already exists")]
    DuplicateSubnet { cidr: String },

    #[error("Subnet name '{name}' is already in use")]
    DuplicateName { name: String },

    #[error("DNS zone '{name}' already exists")]
    DuplicateZone { name: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Storage errors (wrapped, not exposed raw) ────────────────────
    #[error("Store error: {message}")]
    Store { message: String },
}

impl CoreError {
    pub(crate) fn not_found(entity_type: &str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_owned(),
            identifier: identifier.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

// ── Conversion from storage errors ───────────────────────────────────

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { constraint, value } => match constraint {
                Constraint::SubnetNetwork => CoreError::DuplicateSubnet { cidr: value },
                Constraint::SubnetName => CoreError::DuplicateName { name: value },
                Constraint::AddressKey => CoreError::AddressAlreadyAssigned { address: value },
                Constraint::ZoneName => CoreError::DuplicateZone { name: value },
            },
            StoreError::NotFound { entity, id } => CoreError::NotFound {
                entity_type: entity.to_owned(),
                identifier: id,
            },
            other @ (StoreError::Io(_)
            | StoreError::Serialization(_)
            | StoreError::Corrupt { .. }) => CoreError::Store {
                message: other.to_string(),
            },
        }
    }
}
