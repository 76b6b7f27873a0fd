//! Address-space model and services behind the `ipam` CLI.
//!
//! This crate owns the domain logic for tracking subnets, address
//! assignments and the DNS zones that constrain their names:
//!
//! - **[`Ipam`]**: central facade. Writes go through
//!   [`execute()`](Ipam::execute) with a typed [`Command`]; reads are direct
//!   methods. Cheaply cloneable; every clone shares one store.
//!
//! - **Address model** ([`codec`], [`cidr`]): IPv4 and IPv6 mapped onto one
//!   order-preserving 128-bit [`AddressKey`]; [`CidrBlock`] derives masks,
//!   broadcast, usable range and exact [`HostCount`]s from a CIDR.
//!
//! - **[`SubnetIndex`]** and **[`AllocationEngine`]**: exact and containment
//!   lookups, and lowest-free-address allocation under a per-subnet lock with
//!   a bounded retry on uniqueness conflicts.
//!
//! - **[`ZoneMatcher`]**: hostname syntax plus suffix containment against
//!   the registered zones, read live on every check.
//!
//! - **Storage** ([`store`]): the [`IpamStore`] trait with an in-memory
//!   backend and a JSON-file backend.

pub mod allocation;
pub mod cidr;
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod index;
pub mod ipam;
pub mod model;
pub mod store;
pub mod zone;

// ── Primary re-exports ──────────────────────────────────────────────
pub use allocation::{AllocationEngine, Assignment};
pub use cidr::{CidrBlock, HostCount};
pub use codec::{Address, AddressFamily, AddressKey};
pub use command::requests::*;
pub use command::{Command, CommandResult};
pub use config::IpamConfig;
pub use error::CoreError;
pub use index::SubnetIndex;
pub use ipam::{AddressQuery, Ipam, SubnetQuery};
pub use store::{FileStore, IpamStore, MemoryStore, StoreConfig, StoreError};
pub use zone::ZoneMatcher;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AddressId, AddressView, DnsZone, IpAddress, Patch, Soa, Subnet, SubnetId, SubnetUsage,
    SubnetView, ZoneId,
};
