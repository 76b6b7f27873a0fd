// ── Address allocation ──
//
// Picks the lowest free key in a subnet's usable range and inserts it under
// the subnet's write lock. The scan walks the sorted list of keys already
// assigned in that range, so it costs O(assigned) no matter how large the
// subnet is. The store's unique index on address keys is the backstop: a
// conflict means a writer outside this lock (an overlapping subnet) got
// there first, and the engine rescans.

use tracing::{debug, info, warn};

use crate::cidr::CidrBlock;
use crate::codec::{Address, AddressKey};
use crate::error::CoreError;
use crate::model::{IpAddress, NewAddress, Subnet};
use crate::store::{Constraint, IpamStore, StoreError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Lowest usable key of `block` missing from `assigned`.
///
/// `assigned` must be sorted ascending without duplicates; keys outside the
/// usable range are ignored.
pub fn first_free(block: &CidrBlock, assigned: &[AddressKey]) -> Option<AddressKey> {
    let (first, last) = block.usable_range();
    let mut candidate = first;
    for &key in assigned.iter().skip_while(|k| **k < first) {
        if key > candidate {
            break;
        }
        if candidate == last {
            return None;
        }
        candidate = candidate.successor()?;
    }
    Some(candidate)
}

/// Optional fields attached to a new assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    pub dns_name: Option<String>,
    pub description: Option<String>,
}

pub struct AllocationEngine<'a> {
    store: &'a dyn IpamStore,
    max_attempts: u32,
}

impl<'a> AllocationEngine<'a> {
    pub fn new(store: &'a dyn IpamStore, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Claim the lowest free address in `subnet`.
    pub async fn allocate_next(
        &self,
        subnet: &Subnet,
        assignment: Assignment,
    ) -> Result<IpAddress, CoreError> {
        let block = subnet.block;
        let (first, last) = block.usable_range();

        for attempt in 1..=self.max_attempts {
            let _guard = self.store.lock_subnet(subnet.id).await;

            let assigned = self.store.assigned_keys(first, last).await?;
            debug!(
                subnet_id = %subnet.id,
                cidr = %block,
                assigned = assigned.len(),
                attempt,
                "scanning for a free address"
            );
            let Some(key) = first_free(&block, &assigned) else {
                return Err(CoreError::SubnetExhausted {
                    subnet: block.to_string(),
                });
            };
            let address = Address::from_key(key, block.family())?;

            let new = NewAddress {
                address,
                subnet_id: subnet.id,
                dns_name: assignment.dns_name.clone(),
                description: assignment.description.clone(),
            };
            match self.store.insert_address(new).await {
                Ok(record) => {
                    info!(subnet_id = %subnet.id, %address, attempt, "address allocated");
                    return Ok(record);
                }
                Err(StoreError::Conflict {
                    constraint: Constraint::AddressKey,
                    ..
                }) => {
                    warn!(
                        subnet_id = %subnet.id,
                        %address,
                        attempt,
                        "address claimed concurrently, rescanning"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CoreError::AllocationConflict {
            subnet: block.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Assign a caller-chosen address inside `subnet`.
    pub async fn register(
        &self,
        subnet: &Subnet,
        address: Address,
        assignment: Assignment,
    ) -> Result<IpAddress, CoreError> {
        if !subnet.block.contains_address(&address) {
            return Err(CoreError::AddressNotInSubnet {
                address: address.to_string(),
                subnet: subnet.block.to_string(),
            });
        }

        let _guard = self.store.lock_subnet(subnet.id).await;
        if self.store.get_address_by_key(address.key()).await?.is_some() {
            return Err(CoreError::AddressAlreadyAssigned {
                address: address.to_string(),
            });
        }

        let record = self
            .store
            .insert_address(NewAddress {
                address,
                subnet_id: subnet.id,
                dns_name: assignment.dns_name,
                description: assignment.description,
            })
            .await?;
        info!(subnet_id = %subnet.id, %address, "address registered");
        Ok(record)
    }
}
