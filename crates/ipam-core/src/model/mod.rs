// ── Domain model ──
//
// Records as the store keeps them, plus the read-side views that carry
// derived fields for output.

pub mod address;
pub mod entity_id;
pub mod subnet;
pub mod zone;

pub use address::{AddressPatch, AddressView, IpAddress, NewAddress, Patch};
pub use entity_id::{AddressId, SubnetId, ZoneId};
pub use subnet::{NewSubnet, Subnet, SubnetUsage, SubnetView};
pub use zone::{DnsZone, NewZone, Soa};
