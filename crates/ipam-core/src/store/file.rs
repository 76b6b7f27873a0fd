//! JSON-document store.
//!
//! The document on disk is the source of truth. Every operation takes an
//! advisory lock on a sibling `<file>.lock` (shared for reads, exclusive for
//! writes) and reloads the document into a [`MemoryStore`] before touching
//! it, so several processes can work on one file. A write serializes the
//! new state to a temp file in the same directory and renames it over the
//! target; if that fails the tables are rolled back to the loaded state.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use tempfile::NamedTempFile;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::locks::SubnetGuard;
use super::memory::{MemoryStore, Snapshot};
use super::{AddressFilter, IpamStore, Result, StoreError};
use crate::cidr::CidrBlock;
use crate::codec::AddressKey;
use crate::model::{
    AddressId, AddressPatch, DnsZone, IpAddress, NewAddress, NewSubnet, NewZone, Subnet, SubnetId,
    ZoneId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Held while a read runs against freshly loaded tables.
struct ReadSection<'a> {
    _doc: RwLockReadGuard<'a, ()>,
    _file: Option<File>,
}

/// Held while a mutation runs. `before` is the state loaded from disk.
struct WriteSection<'a> {
    _doc: RwLockWriteGuard<'a, ()>,
    _file: Option<File>,
    before: Snapshot,
}

/// [`IpamStore`] persisted to a JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    inner: MemoryStore,
    doc: RwLock<()>,
}

impl FileStore {
    /// Open `path`, or start empty when it does not exist yet. The file is
    /// only created on the first write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let store = Self {
            lock_path: lock_path_for(&path),
            path,
            inner: MemoryStore::new(),
            doc: RwLock::new(()),
        };
        // Surface unreadable or corrupt documents at open time.
        drop(store.begin_read().await?);
        info!(path = %store.path.display(), "opened store document");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn lock_file(&self, mode: LockMode) -> Result<Option<File>> {
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || acquire_file_lock(&lock_path, mode))
            .await
            .map_err(join_error)?
    }

    async fn reload(&self) -> Result<()> {
        let path = self.path.clone();
        let snapshot = tokio::task::spawn_blocking(move || read_document(&path))
            .await
            .map_err(join_error)??;
        if snapshot.is_none() {
            debug!(path = %self.path.display(), "store document absent, starting empty");
        }
        self.inner.replace(snapshot.unwrap_or_else(Snapshot::empty)).await
    }

    async fn begin_read(&self) -> Result<ReadSection<'_>> {
        let doc = self.doc.read().await;
        let file = self.lock_file(LockMode::Shared).await?;
        self.reload().await?;
        Ok(ReadSection {
            _doc: doc,
            _file: file,
        })
    }

    async fn begin_write(&self) -> Result<WriteSection<'_>> {
        let doc = self.doc.write().await;
        let file = self.lock_file(LockMode::Exclusive).await?;
        self.reload().await?;
        let before = self.inner.snapshot().await;
        Ok(WriteSection {
            _doc: doc,
            _file: file,
            before,
        })
    }

    /// Persist what was changed inside `section`, or put the tables back the
    /// way the section found them.
    async fn commit(&self, section: WriteSection<'_>) -> Result<()> {
        match self.persist().await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "store write failed, rolling back");
                self.inner.replace(section.before).await?;
                Err(err)
            }
        }
    }

    async fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.inner.snapshot().await)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(join_error)??;
        debug!(path = %self.path.display(), "store document written");
        Ok(())
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn join_error(err: tokio::task::JoinError) -> StoreError {
    StoreError::Io(std::io::Error::other(err))
}

/// Lock `lock_path`; the lock is released when the returned handle drops.
/// A shared lock on a directory that does not exist yet yields `None`:
/// there is no document to protect.
fn acquire_file_lock(lock_path: &Path, mode: LockMode) -> Result<Option<File>> {
    if mode == LockMode::Exclusive {
        std::fs::create_dir_all(parent_dir(lock_path))?;
    }
    let file = match OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)
    {
        Ok(file) => file,
        Err(e) if mode == LockMode::Shared && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    match mode {
        LockMode::Shared => FileExt::lock_shared(&file)?,
        LockMode::Exclusive => FileExt::lock_exclusive(&file)?,
    }
    Ok(Some(file))
}

fn read_document(path: &Path) -> Result<Option<Snapshot>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl IpamStore for FileStore {
    // === Subnet operations ===

    async fn insert_subnet(&self, subnet: NewSubnet) -> Result<Subnet> {
        let section = self.begin_write().await?;
        let subnet = self.inner.insert_subnet(subnet).await?;
        self.commit(section).await?;
        Ok(subnet)
    }

    async fn get_subnet(&self, id: SubnetId) -> Result<Option<Subnet>> {
        let _read = self.begin_read().await?;
        self.inner.get_subnet(id).await
    }

    async fn get_subnet_by_block(&self, block: &CidrBlock) -> Result<Option<Subnet>> {
        let _read = self.begin_read().await?;
        self.inner.get_subnet_by_block(block).await
    }

    async fn get_subnet_by_name(&self, name: &str) -> Result<Option<Subnet>> {
        let _read = self.begin_read().await?;
        self.inner.get_subnet_by_name(name).await
    }

    async fn list_subnets(&self) -> Result<Vec<Subnet>> {
        let _read = self.begin_read().await?;
        self.inner.list_subnets().await
    }

    async fn delete_subnet(&self, id: SubnetId) -> Result<Option<usize>> {
        let section = self.begin_write().await?;
        let removed = self.inner.delete_subnet(id).await?;
        if removed.is_some() {
            self.commit(section).await?;
        }
        Ok(removed)
    }

    async fn lock_subnet(&self, id: SubnetId) -> SubnetGuard {
        self.inner.lock_subnet(id).await
    }

    // === Address operations ===

    async fn insert_address(&self, address: NewAddress) -> Result<IpAddress> {
        let section = self.begin_write().await?;
        let record = self.inner.insert_address(address).await?;
        self.commit(section).await?;
        Ok(record)
    }

    async fn get_address(&self, id: AddressId) -> Result<Option<IpAddress>> {
        let _read = self.begin_read().await?;
        self.inner.get_address(id).await
    }

    async fn get_address_by_key(&self, key: AddressKey) -> Result<Option<IpAddress>> {
        let _read = self.begin_read().await?;
        self.inner.get_address_by_key(key).await
    }

    async fn list_addresses(&self, filter: &AddressFilter) -> Result<Vec<IpAddress>> {
        let _read = self.begin_read().await?;
        self.inner.list_addresses(filter).await
    }

    async fn assigned_keys(&self, first: AddressKey, last: AddressKey) -> Result<Vec<AddressKey>> {
        let _read = self.begin_read().await?;
        self.inner.assigned_keys(first, last).await
    }

    async fn count_assigned(&self, first: AddressKey, last: AddressKey) -> Result<u64> {
        let _read = self.begin_read().await?;
        self.inner.count_assigned(first, last).await
    }

    async fn update_address(&self, id: AddressId, patch: AddressPatch) -> Result<Option<IpAddress>> {
        let section = self.begin_write().await?;
        let updated = self.inner.update_address(id, patch).await?;
        if updated.is_some() {
            self.commit(section).await?;
        }
        Ok(updated)
    }

    async fn delete_address(&self, id: AddressId) -> Result<bool> {
        let section = self.begin_write().await?;
        let removed = self.inner.delete_address(id).await?;
        if removed {
            self.commit(section).await?;
        }
        Ok(removed)
    }

    // === Zone operations ===

    async fn insert_zone(&self, zone: NewZone) -> Result<DnsZone> {
        let section = self.begin_write().await?;
        let zone = self.inner.insert_zone(zone).await?;
        self.commit(section).await?;
        Ok(zone)
    }

    async fn get_zone(&self, id: ZoneId) -> Result<Option<DnsZone>> {
        let _read = self.begin_read().await?;
        self.inner.get_zone(id).await
    }

    async fn list_zones(&self) -> Result<Vec<DnsZone>> {
        let _read = self.begin_read().await?;
        self.inner.list_zones().await
    }

    async fn update_zone(&self, zone: DnsZone) -> Result<Option<DnsZone>> {
        let section = self.begin_write().await?;
        let updated = self.inner.update_zone(zone).await?;
        if updated.is_some() {
            self.commit(section).await?;
        }
        Ok(updated)
    }

    async fn delete_zone(&self, id: ZoneId) -> Result<bool> {
        let section = self.begin_write().await?;
        let removed = self.inner.delete_zone(id).await?;
        if removed {
            self.commit(section).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_subnet(cidr: &str) -> NewSubnet {
        NewSubnet {
            name: None,
            description: None,
            block: CidrBlock::parse(cidr).unwrap(),
        }
    }

    #[test]
    fn lock_file_sits_next_to_the_document() {
        assert_eq!(
            lock_path_for(Path::new("/srv/ipam/ipam.json")),
            PathBuf::from("/srv/ipam/ipam.json.lock")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_write_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        // The data directory is a dangling link: reads see no document, but
        // the write cannot create the directory.
        let data = dir.path().join("data");
        std::os::unix::fs::symlink(dir.path().join("nowhere"), &data).unwrap();

        let mut store = FileStore::open(data.join("ipam.json")).await.unwrap();
        store.lock_path = dir.path().join("ipam.lock");

        let err = store.insert_subnet(new_subnet("10.0.0.0/24")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)), "unexpected error: {err}");

        // Nothing leaked into the tables, including the id counter.
        assert!(store.inner.list_subnets().await.unwrap().is_empty());
        assert!(store.inner.snapshot().await.subnets.is_empty());

        std::fs::remove_file(&data).unwrap();
        std::fs::create_dir(&data).unwrap();
        let subnet = store.insert_subnet(new_subnet("10.0.0.0/24")).await.unwrap();
        assert_eq!(subnet.id, SubnetId::new(1));
        assert_eq!(store.list_subnets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_data_path_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data").join("ipam.json"))
            .await
            .unwrap();
        // A regular file where the data directory should be.
        std::fs::write(dir.path().join("data"), b"").unwrap();

        assert!(store.insert_subnet(new_subnet("10.0.0.0/24")).await.is_err());
        assert!(store.inner.list_subnets().await.unwrap().is_empty());
    }
}
