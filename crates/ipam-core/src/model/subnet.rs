use serde::{Deserialize, Serialize};

use crate::cidr::{CidrBlock, HostCount};
use crate::codec::{AddressFamily, AddressKey};

use super::SubnetId;

/// A stored subnet. Only the canonical block is persisted; masks, broadcast
/// and host counts are derived from it on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: SubnetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub block: CidrBlock,
}

impl Subnet {
    pub fn family(&self) -> AddressFamily {
        self.block.family()
    }

    pub fn network_key(&self) -> AddressKey {
        self.block.network_key()
    }

    pub fn prefix_length(&self) -> u8 {
        self.block.prefix_len()
    }

    /// Human-facing label: the name when set, else the CIDR.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.block.to_string())
    }

    pub fn view(&self) -> SubnetView {
        SubnetView::from(self)
    }
}

/// Insert payload for a subnet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubnet {
    pub name: Option<String>,
    pub description: Option<String>,
    pub block: CidrBlock,
}

/// Read-side rendering of a subnet with every derived field filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetView {
    pub id: SubnetId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub family: AddressFamily,
    pub cidr: String,
    pub network: String,
    pub network_key: AddressKey,
    pub prefix_length: u8,
    pub netmask: String,
    pub broadcast: String,
    pub first_usable: String,
    pub last_usable: String,
    pub host_count: HostCount,
    pub usable_host_count: HostCount,
}

impl From<&Subnet> for SubnetView {
    fn from(subnet: &Subnet) -> Self {
        let block = &subnet.block;
        Self {
            id: subnet.id,
            name: subnet.name.clone(),
            description: subnet.description.clone(),
            family: block.family(),
            cidr: block.to_string(),
            network: block.network().to_string(),
            network_key: block.network_key(),
            prefix_length: block.prefix_len(),
            netmask: block.netmask().to_string(),
            broadcast: block.broadcast().to_string(),
            first_usable: block.first_usable_address().to_string(),
            last_usable: block.last_usable_address().to_string(),
            host_count: block.host_count(),
            usable_host_count: block.usable_host_count(),
        }
    }
}

/// Utilization summary for one subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetUsage {
    pub subnet_id: SubnetId,
    pub cidr: String,
    pub usable: HostCount,
    /// Keys in the usable range held by any subnet's address records.
    pub assigned: u64,
    pub free: HostCount,
}
