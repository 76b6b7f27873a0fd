// ── Runtime configuration ──
//
// Describes which store to open and how hard allocation may retry. The CLI
// builds an `IpamConfig` from its config file and hands it in; the core
// never reads config files itself.

use crate::allocation::DEFAULT_MAX_ATTEMPTS;
use crate::store::StoreConfig;

/// Address listing page size when none is given.
pub const DEFAULT_PAGE_LIMIT: usize = 100;
/// Largest accepted address listing page.
pub const MAX_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpamConfig {
    /// Backend to open.
    pub store: StoreConfig,
    /// Scan-and-insert attempts before allocation gives up with a conflict.
    pub allocation_attempts: u32,
}

impl Default for IpamConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            allocation_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl IpamConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            store: StoreConfig::File { path: path.into() },
            ..Self::default()
        }
    }
}
