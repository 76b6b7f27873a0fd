// ── Subnet index ──
//
// Subnet lookups over the store: exact by CIDR or name, containment by
// address, plus creation and utilization. Uniqueness is enforced by the
// store; this layer turns its conflicts into domain errors.

use tracing::{debug, info};

use crate::cidr::CidrBlock;
use crate::codec::Address;
use crate::error::CoreError;
use crate::model::{NewSubnet, Subnet, SubnetId, SubnetUsage};
use crate::store::IpamStore;

pub struct SubnetIndex<'a> {
    store: &'a dyn IpamStore,
}

impl<'a> SubnetIndex<'a> {
    pub fn new(store: &'a dyn IpamStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, new: NewSubnet) -> Result<Subnet, CoreError> {
        let subnet = self.store.insert_subnet(new).await?;
        info!(subnet_id = %subnet.id, cidr = %subnet.block, "subnet created");
        Ok(subnet)
    }

    pub async fn get(&self, id: SubnetId) -> Result<Subnet, CoreError> {
        self.store
            .get_subnet(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Subnet", id))
    }

    /// All subnets, by network key then prefix length.
    pub async fn list(&self) -> Result<Vec<Subnet>, CoreError> {
        Ok(self.store.list_subnets().await?)
    }

    /// Exact match on the canonical block. Host bits in `cidr` are ignored.
    pub async fn find_by_cidr(&self, cidr: &str) -> Result<Subnet, CoreError> {
        let block = CidrBlock::parse(cidr)?;
        self.store
            .get_subnet_by_block(&block)
            .await?
            .ok_or_else(|| CoreError::not_found("Subnet", block))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Subnet, CoreError> {
        self.store
            .get_subnet_by_name(name)
            .await?
            .ok_or_else(|| CoreError::not_found("Subnet", name))
    }

    /// Subnets of the address's family whose range holds it, most specific first.
    pub async fn list_containing(&self, address: &Address) -> Result<Vec<Subnet>, CoreError> {
        let mut matches: Vec<Subnet> = self
            .store
            .list_subnets()
            .await?
            .into_iter()
            .filter(|s| s.block.contains_address(address))
            .collect();
        matches.sort_by(|a, b| {
            b.prefix_length()
                .cmp(&a.prefix_length())
                .then_with(|| a.network_key().cmp(&b.network_key()))
        });
        debug!(%address, matches = matches.len(), "containment lookup");
        Ok(matches)
    }

    /// Remove a subnet and every address assigned in it.
    pub async fn delete(&self, id: SubnetId) -> Result<usize, CoreError> {
        let removed = self
            .store
            .delete_subnet(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Subnet", id))?;
        info!(subnet_id = %id, addresses = removed, "subnet deleted");
        Ok(removed)
    }

    pub async fn usage(&self, id: SubnetId) -> Result<SubnetUsage, CoreError> {
        let subnet = self.get(id).await?;
        let (first, last) = subnet.block.usable_range();
        let assigned = self.store.count_assigned(first, last).await?;
        let usable = subnet.block.usable_host_count();
        Ok(SubnetUsage {
            subnet_id: subnet.id,
            cidr: subnet.block.to_string(),
            usable,
            assigned,
            free: usable.saturating_sub(u128::from(assigned)),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cidr::HostCount;
    use crate::model::NewAddress;
    use crate::store::MemoryStore;

    async fn seed(store: &MemoryStore, cidr: &str, name: Option<&str>) -> Subnet {
        SubnetIndex::new(store)
            .create(NewSubnet {
                name: name.map(str::to_owned),
                description: None,
                block: CidrBlock::parse(cidr).unwrap(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicates_map_to_domain_errors() {
        let store = MemoryStore::new();
        seed(&store, "10.0.0.0/24", Some("lab")).await;
        let index = SubnetIndex::new(&store);

        let dup = index
            .create(NewSubnet {
                name: None,
                description: None,
                block: CidrBlock::parse("10.0.0.77/24").unwrap(),
            })
            .await;
        assert!(matches!(dup, Err(CoreError::DuplicateSubnet { ref cidr }) if cidr == "10.0.0.0/24"));

        let name = index
            .create(NewSubnet {
                name: Some("lab".into()),
                description: None,
                block: CidrBlock::parse("10.1.0.0/24").unwrap(),
            })
            .await;
        assert!(matches!(name, Err(CoreError::DuplicateName { .. })));
    }

    #[tokio::test]
    async fn exact_lookups() {
        let store = MemoryStore::new();
        let s = seed(&store, "192.168.1.0/24", Some("Office")).await;
        let index = SubnetIndex::new(&store);

        assert_eq!(index.find_by_cidr("192.168.1.5/24").await.unwrap().id, s.id);
        assert!(matches!(
            index.find_by_cidr("192.168.1.0/25").await,
            Err(CoreError::NotFound { .. })
        ));
        assert_eq!(index.find_by_name("Office").await.unwrap().id, s.id);
        assert!(matches!(
            index.find_by_name("office").await,
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            index.find_by_cidr("not-a-cidr").await,
            Err(CoreError::InvalidCidr { .. })
        ));
    }

    #[tokio::test]
    async fn containment_is_most_specific_first() {
        let store = MemoryStore::new();
        seed(&store, "10.0.0.0/8", None).await;
        seed(&store, "10.1.0.0/16", None).await;
        seed(&store, "10.1.2.0/24", None).await;
        seed(&store, "10.2.0.0/16", None).await;
        seed(&store, "::/0", None).await;

        let found: Vec<String> = SubnetIndex::new(&store)
            .list_containing(&Address::parse("10.1.2.3").unwrap())
            .await
            .unwrap()
            .iter()
            .map(|s| s.block.to_string())
            .collect();
        assert_eq!(found, ["10.1.2.0/24", "10.1.0.0/16", "10.0.0.0/8"]);
    }

    #[tokio::test]
    async fn delete_reports_cascade_and_missing() {
        let store = MemoryStore::new();
        let s = seed(&store, "10.0.0.0/24", None).await;
        store
            .insert_address(NewAddress {
                address: Address::parse("10.0.0.1").unwrap(),
                subnet_id: s.id,
                dns_name: None,
                description: None,
            })
            .await
            .unwrap();
        let index = SubnetIndex::new(&store);
        assert_eq!(index.delete(s.id).await.unwrap(), 1);
        assert!(matches!(index.delete(s.id).await, Err(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn usage_counts_usable_range_only() {
        let store = MemoryStore::new();
        let s = seed(&store, "10.0.0.0/29", None).await;
        for text in ["10.0.0.0", "10.0.0.1", "10.0.0.2"] {
            store
                .insert_address(NewAddress {
                    address: Address::parse(text).unwrap(),
                    subnet_id: s.id,
                    dns_name: None,
                    description: None,
                })
                .await
                .unwrap();
        }
        let usage = SubnetIndex::new(&store).usage(s.id).await.unwrap();
        assert_eq!(usage.usable, HostCount::Finite(6));
        assert_eq!(usage.assigned, 2);
        assert_eq!(usage.free, HostCount::Finite(4));
    }
}
