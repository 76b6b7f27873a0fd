//! In-memory store.
//!
//! Rows live in ordered maps behind one `tokio::sync::RwLock`; secondary
//! indexes enforce the uniqueness constraints and give the listing order for
//! free. Ids are handed out from per-table counters and never reused.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::locks::{SubnetGuard, SubnetLocks};
use super::{AddressFilter, Constraint, IpamStore, Result, StoreError};
use crate::cidr::CidrBlock;
use crate::codec::{AddressFamily, AddressKey};
use crate::model::{
    AddressId, AddressPatch, DnsZone, IpAddress, NewAddress, NewSubnet, NewZone, Subnet, SubnetId,
    ZoneId,
};

/// Document format version written by [`Snapshot`].
pub(crate) const SNAPSHOT_VERSION: u32 = 1;

/// Network key first so iteration yields subnets in address order.
type BlockKey = (AddressKey, u8, AddressFamily);

fn block_key(block: &CidrBlock) -> BlockKey {
    (block.network_key(), block.prefix_len(), block.family())
}

// ── Serialized form ─────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LastIds {
    pub subnet: u64,
    pub address: u64,
    pub zone: u64,
}

/// Everything needed to rebuild the tables. Indexes are derived on load.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub version: u32,
    #[serde(default)]
    pub last_ids: LastIds,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default)]
    pub addresses: Vec<IpAddress>,
    #[serde(default)]
    pub zones: Vec<DnsZone>,
}

// ── Tables ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tables {
    last_ids: LastIds,
    subnets: BTreeMap<SubnetId, Subnet>,
    addresses: BTreeMap<AddressId, IpAddress>,
    zones: BTreeMap<ZoneId, DnsZone>,

    subnet_by_block: BTreeMap<BlockKey, SubnetId>,
    subnet_by_name: BTreeMap<String, SubnetId>,
    address_by_key: BTreeMap<AddressKey, AddressId>,
    zone_by_name: BTreeMap<String, ZoneId>,
}

impl Tables {
    fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Corrupt {
                message: format!(
                    "unsupported document version {} (expected {SNAPSHOT_VERSION})",
                    snapshot.version
                ),
            });
        }

        let corrupt = |err: StoreError| StoreError::Corrupt {
            message: err.to_string(),
        };
        let mut tables = Self::default();
        for subnet in snapshot.subnets {
            tables.put_subnet(subnet).map_err(corrupt)?;
        }
        for address in snapshot.addresses {
            tables.put_address(address).map_err(corrupt)?;
        }
        for zone in snapshot.zones {
            tables.put_zone(zone).map_err(corrupt)?;
        }

        // Never hand out an id that is already in the document.
        let highest = |id: Option<u64>| id.unwrap_or(0);
        tables.last_ids = LastIds {
            subnet: snapshot
                .last_ids
                .subnet
                .max(highest(tables.subnets.keys().next_back().map(|id| id.get()))),
            address: snapshot
                .last_ids
                .address
                .max(highest(tables.addresses.keys().next_back().map(|id| id.get()))),
            zone: snapshot
                .last_ids
                .zone
                .max(highest(tables.zones.keys().next_back().map(|id| id.get()))),
        };
        Ok(tables)
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            last_ids: self.last_ids,
            subnets: self.subnets.values().cloned().collect(),
            addresses: self.addresses.values().cloned().collect(),
            zones: self.zones.values().cloned().collect(),
        }
    }

    // ── Checked inserts shared by the live path and snapshot loading ──

    fn put_subnet(&mut self, subnet: Subnet) -> Result<()> {
        let key = block_key(&subnet.block);
        if self.subnet_by_block.contains_key(&key) {
            return Err(StoreError::Conflict {
                constraint: Constraint::SubnetNetwork,
                value: subnet.block.to_string(),
            });
        }
        if let Some(name) = &subnet.name {
            if self.subnet_by_name.contains_key(name) {
                return Err(StoreError::Conflict {
                    constraint: Constraint::SubnetName,
                    value: name.clone(),
                });
            }
            self.subnet_by_name.insert(name.clone(), subnet.id);
        }
        self.subnet_by_block.insert(key, subnet.id);
        self.subnets.insert(subnet.id, subnet);
        Ok(())
    }

    fn put_address(&mut self, address: IpAddress) -> Result<()> {
        if !self.subnets.contains_key(&address.subnet_id) {
            return Err(StoreError::NotFound {
                entity: "subnet",
                id: address.subnet_id.to_string(),
            });
        }
        let key = address.key();
        if self.address_by_key.contains_key(&key) {
            return Err(StoreError::Conflict {
                constraint: Constraint::AddressKey,
                value: address.address.to_string(),
            });
        }
        self.address_by_key.insert(key, address.id);
        self.addresses.insert(address.id, address);
        Ok(())
    }

    fn put_zone(&mut self, zone: DnsZone) -> Result<()> {
        let name = zone.lookup_key();
        if self.zone_by_name.contains_key(&name) {
            return Err(StoreError::Conflict {
                constraint: Constraint::ZoneName,
                value: zone.name.clone(),
            });
        }
        self.zone_by_name.insert(name, zone.id);
        self.zones.insert(zone.id, zone);
        Ok(())
    }

    fn next_id(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }
}

// ── MemoryStore ─────────────────────────────────────────────────────

/// In-memory [`IpamStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    locks: SubnetLocks,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn snapshot(&self) -> Snapshot {
        self.tables.read().await.to_snapshot()
    }

    /// Swap every table for the contents of `snapshot`. Subnet locks are
    /// kept, so in-flight lock holders stay valid.
    pub(crate) async fn replace(&self, snapshot: Snapshot) -> Result<()> {
        let tables = Tables::from_snapshot(snapshot)?;
        *self.tables.write().await = tables;
        Ok(())
    }
}

impl Snapshot {
    pub(crate) fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            last_ids: LastIds::default(),
            subnets: Vec::new(),
            addresses: Vec::new(),
            zones: Vec::new(),
        }
    }
}

#[async_trait]
impl IpamStore for MemoryStore {
    // === Subnet operations ===

    async fn insert_subnet(&self, new: NewSubnet) -> Result<Subnet> {
        let mut tables = self.tables.write().await;
        let mut last = tables.last_ids;
        let subnet = Subnet {
            id: SubnetId::new(Tables::next_id(&mut last.subnet)),
            name: new.name,
            description: new.description,
            block: new.block,
        };
        tables.put_subnet(subnet.clone())?;
        // Only consume the id once the row is in.
        tables.last_ids = last;
        Ok(subnet)
    }

    async fn get_subnet(&self, id: SubnetId) -> Result<Option<Subnet>> {
        Ok(self.tables.read().await.subnets.get(&id).cloned())
    }

    async fn get_subnet_by_block(&self, block: &CidrBlock) -> Result<Option<Subnet>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subnet_by_block
            .get(&block_key(block))
            .and_then(|id| tables.subnets.get(id))
            .cloned())
    }

    async fn get_subnet_by_name(&self, name: &str) -> Result<Option<Subnet>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subnet_by_name
            .get(name)
            .and_then(|id| tables.subnets.get(id))
            .cloned())
    }

    async fn list_subnets(&self) -> Result<Vec<Subnet>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subnet_by_block
            .values()
            .filter_map(|id| tables.subnets.get(id))
            .cloned()
            .collect())
    }

    async fn delete_subnet(&self, id: SubnetId) -> Result<Option<usize>> {
        let mut tables = self.tables.write().await;
        let Some(subnet) = tables.subnets.remove(&id) else {
            return Ok(None);
        };
        tables.subnet_by_block.remove(&block_key(&subnet.block));
        if let Some(name) = &subnet.name {
            tables.subnet_by_name.remove(name);
        }

        let orphaned: Vec<(AddressId, AddressKey)> = tables
            .addresses
            .values()
            .filter(|a| a.subnet_id == id)
            .map(|a| (a.id, a.key()))
            .collect();
        for (address_id, key) in &orphaned {
            tables.addresses.remove(address_id);
            tables.address_by_key.remove(key);
        }
        drop(tables);

        self.locks.forget(id);
        debug!(subnet_id = %id, cascaded = orphaned.len(), "subnet removed");
        Ok(Some(orphaned.len()))
    }

    async fn lock_subnet(&self, id: SubnetId) -> SubnetGuard {
        self.locks.acquire(id).await
    }

    // === Address operations ===

    async fn insert_address(&self, new: NewAddress) -> Result<IpAddress> {
        let mut tables = self.tables.write().await;
        let mut last = tables.last_ids;
        let record = IpAddress {
            id: AddressId::new(Tables::next_id(&mut last.address)),
            address: new.address,
            subnet_id: new.subnet_id,
            dns_name: new.dns_name,
            description: new.description,
        };
        tables.put_address(record.clone())?;
        tables.last_ids = last;
        Ok(record)
    }

    async fn get_address(&self, id: AddressId) -> Result<Option<IpAddress>> {
        Ok(self.tables.read().await.addresses.get(&id).cloned())
    }

    async fn get_address_by_key(&self, key: AddressKey) -> Result<Option<IpAddress>> {
        let tables = self.tables.read().await;
        Ok(tables
            .address_by_key
            .get(&key)
            .and_then(|id| tables.addresses.get(id))
            .cloned())
    }

    async fn list_addresses(&self, filter: &AddressFilter) -> Result<Vec<IpAddress>> {
        let tables = self.tables.read().await;
        let ids: Box<dyn Iterator<Item = &AddressId>> = match filter.key {
            Some(key) => Box::new(tables.address_by_key.get(&key).into_iter()),
            None => Box::new(tables.address_by_key.values()),
        };
        Ok(ids
            .filter_map(|id| tables.addresses.get(id))
            .filter(|a| filter.subnet_id.is_none_or(|s| a.subnet_id == s))
            .filter(|a| {
                filter
                    .dns_name
                    .as_deref()
                    .is_none_or(|name| a.dns_name.as_deref() == Some(name))
            })
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn assigned_keys(&self, first: AddressKey, last: AddressKey) -> Result<Vec<AddressKey>> {
        if first > last {
            return Ok(Vec::new());
        }
        let tables = self.tables.read().await;
        Ok(tables.address_by_key.range(first..=last).map(|(k, _)| *k).collect())
    }

    async fn count_assigned(&self, first: AddressKey, last: AddressKey) -> Result<u64> {
        if first > last {
            return Ok(0);
        }
        let tables = self.tables.read().await;
        let count = tables.address_by_key.range(first..=last).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn update_address(&self, id: AddressId, patch: AddressPatch) -> Result<Option<IpAddress>> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.addresses.get_mut(&id) else {
            return Ok(None);
        };
        patch.dns_name.apply(&mut record.dns_name);
        patch.description.apply(&mut record.description);
        Ok(Some(record.clone()))
    }

    async fn delete_address(&self, id: AddressId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.addresses.remove(&id) else {
            return Ok(false);
        };
        tables.address_by_key.remove(&record.key());
        Ok(true)
    }

    // === Zone operations ===

    async fn insert_zone(&self, new: NewZone) -> Result<DnsZone> {
        let mut tables = self.tables.write().await;
        let mut last = tables.last_ids;
        let zone = DnsZone {
            id: ZoneId::new(Tables::next_id(&mut last.zone)),
            name: new.name,
            description: new.description,
            soa: new.soa,
        };
        tables.put_zone(zone.clone())?;
        tables.last_ids = last;
        Ok(zone)
    }

    async fn get_zone(&self, id: ZoneId) -> Result<Option<DnsZone>> {
        Ok(self.tables.read().await.zones.get(&id).cloned())
    }

    async fn list_zones(&self) -> Result<Vec<DnsZone>> {
        let tables = self.tables.read().await;
        Ok(tables
            .zone_by_name
            .values()
            .filter_map(|id| tables.zones.get(id))
            .cloned()
            .collect())
    }

    async fn update_zone(&self, zone: DnsZone) -> Result<Option<DnsZone>> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.zones.get(&zone.id) else {
            return Ok(None);
        };
        let old_name = existing.lookup_key();
        let new_name = zone.lookup_key();
        if new_name != old_name {
            if tables.zone_by_name.contains_key(&new_name) {
                return Err(StoreError::Conflict {
                    constraint: Constraint::ZoneName,
                    value: zone.name,
                });
            }
            tables.zone_by_name.remove(&old_name);
            tables.zone_by_name.insert(new_name, zone.id);
        }
        tables.zones.insert(zone.id, zone.clone());
        Ok(Some(zone))
    }

    async fn delete_zone(&self, id: ZoneId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(zone) = tables.zones.remove(&id) else {
            return Ok(false);
        };
        tables.zone_by_name.remove(&zone.lookup_key());
        Ok(true)
    }
}
