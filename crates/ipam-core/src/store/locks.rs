use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::SubnetId;

/// Held while a writer owns a subnet's address set.
pub type SubnetGuard = OwnedMutexGuard<()>;

/// Lazily created per-subnet async mutexes.
#[derive(Debug, Default)]
pub(crate) struct SubnetLocks {
    locks: DashMap<SubnetId, Arc<Mutex<()>>>,
}

impl SubnetLocks {
    pub(crate) async fn acquire(&self, id: SubnetId) -> SubnetGuard {
        // Clone out of the map before awaiting; the shard lock must not be held.
        let lock = Arc::clone(self.locks.entry(id).or_default().value());
        lock.lock_owned().await
    }

    pub(crate) fn forget(&self, id: SubnetId) {
        self.locks.remove(&id);
    }
}
