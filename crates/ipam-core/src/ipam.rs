// ── Ipam facade ──
//
// The single entry point for consumers. Writes go through `execute` with a
// typed `Command`; reads are direct methods. Every call reads current rows
// from the store, so concurrent handles over one store stay consistent.

use std::sync::Arc;

use tracing::{debug, info};

use crate::allocation::{AllocationEngine, Assignment};
use crate::cidr::CidrBlock;
use crate::codec::Address;
use crate::command::{
    Command, CommandResult, CreateAddressRequest, CreateSubnetRequest, CreateZoneRequest,
    UpdateAddressRequest, UpdateZoneRequest,
};
use crate::config::{DEFAULT_PAGE_LIMIT, IpamConfig, MAX_PAGE_LIMIT};
use crate::error::CoreError;
use crate::index::SubnetIndex;
use crate::model::{
    AddressId, AddressPatch, DnsZone, IpAddress, NewSubnet, NewZone, Soa, Subnet, SubnetId,
    SubnetUsage, ZoneId,
};
use crate::store::{AddressFilter, IpamStore, MemoryStore, open_store};
use crate::zone::{ZoneMatcher, validate_hostname, validate_soa};

/// Subnet lookup: exactly one criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubnetQuery {
    Cidr(String),
    Name(String),
    /// Every subnet holding this address, most specific first.
    Contains(String),
}

/// Address listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressQuery {
    pub subnet_id: Option<SubnetId>,
    /// Exact address, any textual form.
    pub address: Option<String>,
    pub dns_name: Option<String>,
    /// 1..=1000, default 100.
    pub limit: Option<usize>,
    pub offset: usize,
}

// ── Ipam ─────────────────────────────────────────────────────────

/// Cheaply cloneable handle over one store.
#[derive(Clone)]
pub struct Ipam {
    inner: Arc<IpamInner>,
}

struct IpamInner {
    config: IpamConfig,
    store: Arc<dyn IpamStore>,
}

impl Ipam {
    pub fn new(config: IpamConfig, store: Arc<dyn IpamStore>) -> Self {
        Self {
            inner: Arc::new(IpamInner { config, store }),
        }
    }

    /// Open the store named by `config`.
    pub async fn open(config: IpamConfig) -> Result<Self, CoreError> {
        let store = open_store(&config.store).await?;
        debug!(store = ?config.store, "store opened");
        Ok(Self::new(config, store))
    }

    /// Throwaway in-memory instance with default settings.
    pub fn in_memory() -> Self {
        Self::new(IpamConfig::in_memory(), Arc::new(MemoryStore::new()))
    }

    pub fn config(&self) -> &IpamConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn IpamStore> {
        &self.inner.store
    }

    fn index(&self) -> SubnetIndex<'_> {
        SubnetIndex::new(self.inner.store.as_ref())
    }

    fn engine(&self) -> AllocationEngine<'_> {
        AllocationEngine::new(
            self.inner.store.as_ref(),
            self.inner.config.allocation_attempts,
        )
    }

    // ── Command execution ────────────────────────────────────────

    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        debug!(command = ?cmd, "executing command");
        match cmd {
            Command::CreateSubnet(req) => self.create_subnet(req).await.map(CommandResult::Subnet),
            Command::DeleteSubnet { id } => {
                self.delete_subnet(id).await?;
                Ok(CommandResult::Ok)
            }
            Command::CreateAddress(req) => {
                self.create_address(req).await.map(CommandResult::Address)
            }
            Command::UpdateAddress { id, update } => self
                .update_address(id, update)
                .await
                .map(CommandResult::Address),
            Command::DeleteAddress { id } => {
                self.delete_address(id).await?;
                Ok(CommandResult::Ok)
            }
            Command::CreateZone(req) => self.create_zone(req).await.map(CommandResult::Zone),
            Command::UpdateZone { id, update } => {
                self.update_zone(id, update).await.map(CommandResult::Zone)
            }
            Command::DeleteZone { id } => {
                self.delete_zone(id).await?;
                Ok(CommandResult::Ok)
            }
        }
    }

    // ── Subnets ──────────────────────────────────────────────────

    pub async fn create_subnet(&self, req: CreateSubnetRequest) -> Result<Subnet, CoreError> {
        let block = CidrBlock::parse(&req.cidr)?;
        if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CoreError::validation("subnet name must not be blank"));
        }
        self.index()
            .create(NewSubnet {
                name: req.name,
                description: req.description,
                block,
            })
            .await
    }

    /// Returns the number of addresses removed with the subnet.
    pub async fn delete_subnet(&self, id: SubnetId) -> Result<usize, CoreError> {
        self.index().delete(id).await
    }

    pub async fn subnet(&self, id: SubnetId) -> Result<Subnet, CoreError> {
        self.index().get(id).await
    }

    pub async fn subnets(&self) -> Result<Vec<Subnet>, CoreError> {
        self.index().list().await
    }

    pub async fn subnet_by_cidr(&self, cidr: &str) -> Result<Subnet, CoreError> {
        self.index().find_by_cidr(cidr).await
    }

    pub async fn subnet_by_name(&self, name: &str) -> Result<Subnet, CoreError> {
        self.index().find_by_name(name).await
    }

    pub async fn subnets_containing(&self, address: &str) -> Result<Vec<Subnet>, CoreError> {
        let address = Address::parse(address)?;
        self.index().list_containing(&address).await
    }

    /// Zero or more matches; a miss is an empty list, not an error.
    pub async fn find_subnets(&self, query: &SubnetQuery) -> Result<Vec<Subnet>, CoreError> {
        let found = match query {
            SubnetQuery::Cidr(cidr) => self.subnet_by_cidr(cidr).await.map(|s| vec![s]),
            SubnetQuery::Name(name) => self.subnet_by_name(name).await.map(|s| vec![s]),
            SubnetQuery::Contains(address) => self.subnets_containing(address).await,
        };
        match found {
            Err(CoreError::NotFound { .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    pub async fn subnet_usage(&self, id: SubnetId) -> Result<SubnetUsage, CoreError> {
        self.index().usage(id).await
    }

    // ── Addresses ────────────────────────────────────────────────

    /// Register `req.address`, or allocate the next free one when it is absent.
    pub async fn create_address(&self, req: CreateAddressRequest) -> Result<IpAddress, CoreError> {
        let subnet = self.subnet(req.subnet_id).await?;
        let address = req.address.as_deref().map(Address::parse).transpose()?;
        if let Some(address) = &address {
            if !subnet.block.contains_address(address) {
                return Err(CoreError::AddressNotInSubnet {
                    address: address.to_string(),
                    subnet: subnet.block.to_string(),
                });
            }
        }
        if let Some(name) = &req.dns_name {
            self.validate_dns_name(name).await?;
        }

        let assignment = Assignment {
            dns_name: req.dns_name,
            description: req.description,
        };
        match address {
            Some(address) => self.engine().register(&subnet, address, assignment).await,
            None => self.engine().allocate_next(&subnet, assignment).await,
        }
    }

    pub async fn allocate_next(
        &self,
        subnet_id: SubnetId,
        assignment: Assignment,
    ) -> Result<IpAddress, CoreError> {
        self.create_address(CreateAddressRequest {
            subnet_id,
            address: None,
            dns_name: assignment.dns_name,
            description: assignment.description,
        })
        .await
    }

    pub async fn register(
        &self,
        subnet_id: SubnetId,
        address: &str,
        assignment: Assignment,
    ) -> Result<IpAddress, CoreError> {
        self.create_address(CreateAddressRequest {
            subnet_id,
            address: Some(address.to_owned()),
            dns_name: assignment.dns_name,
            description: assignment.description,
        })
        .await
    }

    pub async fn update_address(
        &self,
        id: AddressId,
        update: UpdateAddressRequest,
    ) -> Result<IpAddress, CoreError> {
        if update.dns_name.is_unchanged() && update.description.is_unchanged() {
            return Err(CoreError::validation("nothing to update"));
        }
        if let Some(name) = update.dns_name.as_set() {
            self.validate_dns_name(name).await?;
        }
        let record = self
            .inner
            .store
            .update_address(
                id,
                AddressPatch {
                    dns_name: update.dns_name,
                    description: update.description,
                },
            )
            .await?
            .ok_or_else(|| CoreError::not_found("Address", id))?;
        info!(address_id = %id, address = %record.address, "address updated");
        Ok(record)
    }

    pub async fn delete_address(&self, id: AddressId) -> Result<(), CoreError> {
        if !self.inner.store.delete_address(id).await? {
            return Err(CoreError::not_found("Address", id));
        }
        info!(address_id = %id, "address deleted");
        Ok(())
    }

    pub async fn address(&self, id: AddressId) -> Result<IpAddress, CoreError> {
        self.inner
            .store
            .get_address(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Address", id))
    }

    /// Filtered page of addresses, ordered by address key.
    pub async fn addresses(&self, query: &AddressQuery) -> Result<Vec<IpAddress>, CoreError> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(CoreError::validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        let address = query.address.as_deref().map(Address::parse).transpose()?;
        let filter = AddressFilter {
            subnet_id: query.subnet_id,
            key: address.map(|a| a.key()),
            dns_name: query.dns_name.clone(),
            offset: query.offset,
            limit: Some(limit),
        };
        let mut records = self.inner.store.list_addresses(&filter).await?;
        // Keys are shared across families; an exact lookup must match both.
        if let Some(address) = address {
            records.retain(|r| r.family() == address.family());
        }
        Ok(records)
    }

    // ── DNS zones ────────────────────────────────────────────────

    /// Check `name` against the zones as they are right now.
    pub async fn validate_dns_name(&self, name: &str) -> Result<(), CoreError> {
        ZoneMatcher::load(self.inner.store.as_ref())
            .await?
            .validate(name)
    }

    pub async fn create_zone(&self, req: CreateZoneRequest) -> Result<DnsZone, CoreError> {
        validate_hostname(&req.name)?;
        let soa = Soa::from(req.soa);
        validate_soa(&soa)?;
        let zone = self
            .inner
            .store
            .insert_zone(NewZone {
                name: req.name,
                description: req.description,
                soa,
            })
            .await?;
        info!(zone_id = %zone.id, zone = %zone.name, "zone created");
        Ok(zone)
    }

    pub async fn update_zone(
        &self,
        id: ZoneId,
        update: UpdateZoneRequest,
    ) -> Result<DnsZone, CoreError> {
        if update.is_empty() {
            return Err(CoreError::validation("nothing to update"));
        }
        let mut zone = self.zone(id).await?;
        if let Some(name) = update.name {
            validate_hostname(&name)?;
            zone.name = name;
        }
        if let Some(description) = update.description {
            zone.description = Some(description);
        }
        if let Some(soa) = update.soa {
            let soa = Soa::from(soa);
            validate_soa(&soa)?;
            zone.soa = soa;
        }
        let zone = self
            .inner
            .store
            .update_zone(zone)
            .await?
            .ok_or_else(|| CoreError::not_found("DNS zone", id))?;
        info!(zone_id = %id, zone = %zone.name, "zone updated");
        Ok(zone)
    }

    pub async fn delete_zone(&self, id: ZoneId) -> Result<(), CoreError> {
        if !self.inner.store.delete_zone(id).await? {
            return Err(CoreError::not_found("DNS zone", id));
        }
        info!(zone_id = %id, "zone deleted");
        Ok(())
    }

    pub async fn zone(&self, id: ZoneId) -> Result<DnsZone, CoreError> {
        self.inner
            .store
            .get_zone(id)
            .await?
            .ok_or_else(|| CoreError::not_found("DNS zone", id))
    }

    /// All zones, by name.
    pub async fn zones(&self) -> Result<Vec<DnsZone>, CoreError> {
        Ok(self.inner.store.list_zones().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::command::SoaRequest;
    use crate::model::Patch;

    async fn with_subnet(cidr: &str) -> (Ipam, SubnetId) {
        let ipam = Ipam::in_memory();
        let subnet = ipam
            .create_subnet(CreateSubnetRequest {
                cidr: cidr.into(),
                name: None,
                description: None,
            })
            .await
            .unwrap();
        (ipam, subnet.id)
    }

    #[tokio::test]
    async fn execute_routes_commands() {
        let ipam = Ipam::in_memory();
        let result = ipam
            .execute(Command::CreateSubnet(CreateSubnetRequest {
                cidr: "10.0.0.0/24".into(),
                name: Some("lab".into()),
                description: None,
            }))
            .await
            .unwrap();
        let CommandResult::Subnet(subnet) = result else {
            panic!("expected a subnet");
        };
        let deleted = ipam
            .execute(Command::DeleteSubnet { id: subnet.id })
            .await
            .unwrap();
        assert!(matches!(deleted, CommandResult::Ok));
        assert!(ipam.subnets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_subnet_name_is_rejected() {
        let ipam = Ipam::in_memory();
        let err = ipam
            .create_subnet(CreateSubnetRequest {
                cidr: "10.0.0.0/24".into(),
                name: Some("  ".into()),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn dns_names_are_checked_against_live_zones() {
        let (ipam, subnet_id) = with_subnet("10.0.0.0/24").await;
        let named = |name: &str| Assignment {
            dns_name: Some(name.into()),
            description: None,
        };

        assert!(matches!(
            ipam.allocate_next(subnet_id, named("web.example.com")).await,
            Err(CoreError::NoMatchingZone { .. })
        ));

        ipam.create_zone(CreateZoneRequest {
            name: "example.com".into(),
            description: None,
            soa: SoaRequest::new("ns1.example.com", "hostmaster.example.com"),
        })
        .await
        .unwrap();
        let record = ipam
            .allocate_next(subnet_id, named("web.example.com"))
            .await
            .unwrap();
        assert_eq!(record.dns_name.as_deref(), Some("web.example.com"));

        assert!(matches!(
            ipam.allocate_next(subnet_id, named("bad_name.example.com")).await,
            Err(CoreError::InvalidHostname { .. })
        ));
    }

    #[tokio::test]
    async fn register_outside_subnet_fails_before_dns_check() {
        let (ipam, subnet_id) = with_subnet("10.0.0.0/24").await;
        let err = ipam
            .register(
                subnet_id,
                "172.16.0.5",
                Assignment {
                    dns_name: Some("nowhere.example.net".into()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AddressNotInSubnet { .. }));
    }

    #[tokio::test]
    async fn address_updates_validate_and_clear() {
        let (ipam, subnet_id) = with_subnet("10.0.0.0/24").await;
        let record = ipam
            .register(subnet_id, "10.0.0.20", Assignment::default())
            .await
            .unwrap();

        assert!(matches!(
            ipam.update_address(record.id, UpdateAddressRequest::default()).await,
            Err(CoreError::ValidationFailed { .. })
        ));
        assert!(matches!(
            ipam.update_address(
                record.id,
                UpdateAddressRequest {
                    dns_name: Patch::Set("db.example.com".into()),
                    description: Patch::Unchanged,
                }
            )
            .await,
            Err(CoreError::NoMatchingZone { .. })
        ));

        let updated = ipam
            .update_address(
                record.id,
                UpdateAddressRequest {
                    dns_name: Patch::Clear,
                    description: Patch::Set("reserved".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("reserved"));
        assert_eq!(updated.address, record.address);
    }

    #[tokio::test]
    async fn address_listing_validates_limit() {
        let (ipam, _) = with_subnet("10.0.0.0/24").await;
        for limit in [0, 1001] {
            let query = AddressQuery {
                limit: Some(limit),
                ..AddressQuery::default()
            };
            assert!(matches!(
                ipam.addresses(&query).await,
                Err(CoreError::ValidationFailed { .. })
            ));
        }
    }

    #[tokio::test]
    async fn exact_address_lookup_respects_family() {
        let (ipam, subnet_id) = with_subnet("10.0.0.0/24").await;
        ipam.register(subnet_id, "10.0.0.5", Assignment::default())
            .await
            .unwrap();

        let v4 = AddressQuery {
            address: Some("10.0.0.5".into()),
            ..AddressQuery::default()
        };
        assert_eq!(ipam.addresses(&v4).await.unwrap().len(), 1);

        let aliased = AddressQuery {
            address: Some("::a00:5".into()),
            ..AddressQuery::default()
        };
        assert!(ipam.addresses(&aliased).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_subnets_returns_empty_on_miss() {
        let (ipam, _) = with_subnet("10.0.0.0/24").await;
        let miss = ipam
            .find_subnets(&SubnetQuery::Name("nope".into()))
            .await
            .unwrap();
        assert!(miss.is_empty());
        assert!(matches!(
            ipam.find_subnets(&SubnetQuery::Contains("garbage".into())).await,
            Err(CoreError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn zone_update_renames_and_replaces_soa() {
        let ipam = Ipam::in_memory();
        let zone = ipam
            .create_zone(CreateZoneRequest {
                name: "old.example.com".into(),
                description: Some("first".into()),
                soa: SoaRequest::new("ns1.example.com", "hostmaster.example.com"),
            })
            .await
            .unwrap();

        let mut soa = SoaRequest::new("ns2.example.com", "hostmaster.example.com");
        soa.serial = 2;
        let updated = ipam
            .update_zone(
                zone.id,
                UpdateZoneRequest {
                    name: Some("new.example.com".into()),
                    description: None,
                    soa: Some(soa),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "new.example.com");
        assert_eq!(updated.description.as_deref(), Some("first"));
        assert_eq!(updated.soa.serial, 2);
        assert_eq!(updated.soa.mname, "ns2.example.com");

        assert!(matches!(
            ipam.update_zone(
                zone.id,
                UpdateZoneRequest {
                    name: Some("single".into()),
                    ..UpdateZoneRequest::default()
                }
            )
            .await,
            Err(CoreError::InvalidHostname { .. })
        ));
    }
}
