//! Storage layer.
//!
//! [`IpamStore`] is the seam between the address-space logic and whatever
//! keeps the rows. Two backends ship with the crate:
//!
//! - [`MemoryStore`]: sorted in-memory tables with unique indexes. The
//!   reference implementation every other backend is tested against.
//! - [`FileStore`]: a `MemoryStore` persisted to a JSON document that is
//!   atomically replaced after every write.
//!
//! The store enforces uniqueness (subnet network, subnet name, address key,
//! zone name) and is the final arbiter when two writers race.

mod file;
mod locks;
mod memory;

pub use file::FileStore;
pub use locks::SubnetGuard;
pub use memory::MemoryStore;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cidr::CidrBlock;
use crate::codec::AddressKey;
use crate::model::{
    AddressId, AddressPatch, DnsZone, IpAddress, NewAddress, NewSubnet, NewZone, Subnet, SubnetId,
    ZoneId,
};

/// Uniqueness constraints the store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Constraint {
    #[strum(to_string = "subnet network")]
    SubnetNetwork,
    #[strum(to_string = "subnet name")]
    SubnetName,
    #[strum(to_string = "address key")]
    AddressKey,
    #[strum(to_string = "zone name")]
    ZoneName,
}

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{constraint} already taken: {value}")]
    Conflict { constraint: Constraint, value: String },

    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt store document: {message}")]
    Corrupt { message: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Address listing filter. All present fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFilter {
    pub subnet_id: Option<SubnetId>,
    pub key: Option<AddressKey>,
    pub dns_name: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Backend-agnostic storage interface.
///
/// Listing methods return rows in a stable order: subnets by
/// (network key, prefix length), addresses by key, zones by name.
#[async_trait]
pub trait IpamStore: Send + Sync {
    // === Subnet operations ===

    async fn insert_subnet(&self, subnet: NewSubnet) -> Result<Subnet>;

    async fn get_subnet(&self, id: SubnetId) -> Result<Option<Subnet>>;

    /// Exact (family, network, prefix) match.
    async fn get_subnet_by_block(&self, block: &CidrBlock) -> Result<Option<Subnet>>;

    /// Case-sensitive name match.
    async fn get_subnet_by_name(&self, name: &str) -> Result<Option<Subnet>>;

    async fn list_subnets(&self) -> Result<Vec<Subnet>>;

    /// Delete a subnet together with its addresses. Returns the number of
    /// addresses removed, or `None` when the subnet does not exist.
    async fn delete_subnet(&self, id: SubnetId) -> Result<Option<usize>>;

    /// Serialize writers to one subnet's address set. The guard releases on drop.
    async fn lock_subnet(&self, id: SubnetId) -> SubnetGuard;

    // === Address operations ===

    /// Fails with [`StoreError::Conflict`] when the key is already assigned
    /// and [`StoreError::NotFound`] when the subnet is gone.
    async fn insert_address(&self, address: NewAddress) -> Result<IpAddress>;

    async fn get_address(&self, id: AddressId) -> Result<Option<IpAddress>>;

    async fn get_address_by_key(&self, key: AddressKey) -> Result<Option<IpAddress>>;

    async fn list_addresses(&self, filter: &AddressFilter) -> Result<Vec<IpAddress>>;

    /// Assigned keys in `[first, last]`, ascending, whichever subnet owns them.
    async fn assigned_keys(&self, first: AddressKey, last: AddressKey) -> Result<Vec<AddressKey>>;

    async fn count_assigned(&self, first: AddressKey, last: AddressKey) -> Result<u64>;

    async fn update_address(&self, id: AddressId, patch: AddressPatch) -> Result<Option<IpAddress>>;

    async fn delete_address(&self, id: AddressId) -> Result<bool>;

    // === Zone operations ===

    async fn insert_zone(&self, zone: NewZone) -> Result<DnsZone>;

    async fn get_zone(&self, id: ZoneId) -> Result<Option<DnsZone>>;

    async fn list_zones(&self) -> Result<Vec<DnsZone>>;

    /// Replace a zone wholesale. `None` when the id does not exist.
    async fn update_zone(&self, zone: DnsZone) -> Result<Option<DnsZone>>;

    async fn delete_zone(&self, id: ZoneId) -> Result<bool>;
}

/// Which backend to open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    File { path: PathBuf },
}

/// Open the configured backend.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn IpamStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreConfig::File { path } => Ok(Arc::new(FileStore::open(path).await?)),
    }
}
