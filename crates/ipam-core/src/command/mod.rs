// ── Command API ──
//
// All write operations flow through a unified `Command` enum executed by
// `Ipam::execute`. Reads are plain methods on the facade.

pub mod requests;

use crate::model::{AddressId, DnsZone, IpAddress, Subnet, SubnetId, ZoneId};

pub use requests::{
    CreateAddressRequest, CreateSubnetRequest, CreateZoneRequest, SoaRequest,
    UpdateAddressRequest, UpdateZoneRequest,
};

/// All possible write operations against the address space.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Subnet operations ────────────────────────────────────────────
    CreateSubnet(CreateSubnetRequest),
    DeleteSubnet {
        id: SubnetId,
    },

    // ── Address operations ───────────────────────────────────────────
    CreateAddress(CreateAddressRequest),
    UpdateAddress {
        id: AddressId,
        update: UpdateAddressRequest,
    },
    DeleteAddress {
        id: AddressId,
    },

    // ── DNS zone operations ──────────────────────────────────────────
    CreateZone(CreateZoneRequest),
    UpdateZone {
        id: ZoneId,
        update: UpdateZoneRequest,
    },
    DeleteZone {
        id: ZoneId,
    },
}

/// Result of a successfully executed command.
#[derive(Debug, Clone)]
pub enum CommandResult {
    Ok,
    Subnet(Subnet),
    Address(IpAddress),
    Zone(DnsZone),
}
