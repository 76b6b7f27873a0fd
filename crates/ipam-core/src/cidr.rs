// ── CIDR blocks ──
//
// Canonical network + prefix, and the metadata derived from it. All masks
// are family-relative: an IPv4 block never sets bits above bit 31.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::codec::{Address, AddressFamily, AddressKey};
use crate::error::CoreError;

/// Decimal rendering of 2^128, the size of the whole IPv6 space.
const FULL_IPV6_SPACE: &str = "340282366920938463463374607431768211456";

// ── HostCount ───────────────────────────────────────────────────────

/// An exact address count. IPv6 `/0` holds 2^128 addresses, one more than
/// `u128` can represent, so that case gets its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HostCount {
    Finite(u128),
    FullIpv6Space,
}

impl HostCount {
    /// `None` only for the full IPv6 space.
    pub fn to_u128(self) -> Option<u128> {
        match self {
            Self::Finite(n) => Some(n),
            Self::FullIpv6Space => None,
        }
    }

    pub fn saturating_sub(self, n: u128) -> Self {
        match self {
            Self::Finite(v) => Self::Finite(v.saturating_sub(n)),
            Self::FullIpv6Space if n == 0 => self,
            Self::FullIpv6Space => Self::Finite(u128::MAX - (n - 1)),
        }
    }

    /// Count of a block with `host_bits` free bits, as `2^host_bits`.
    fn power_of_two(host_bits: u8) -> Self {
        1u128
            .checked_shl(u32::from(host_bits))
            .map_or(Self::FullIpv6Space, Self::Finite)
    }
}

impl fmt::Display for HostCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{n}"),
            Self::FullIpv6Space => f.write_str(FULL_IPV6_SPACE),
        }
    }
}

impl Serialize for HostCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── CidrBlock ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBlock", into = "RawBlock")]
pub struct CidrBlock {
    network: AddressKey,
    prefix_len: u8,
    family: AddressFamily,
}

impl CidrBlock {
    /// Build a block from any address inside it. Host bits are cleared.
    pub fn new(address: Address, prefix_len: u8) -> Result<Self, CoreError> {
        let family = address.family();
        if prefix_len > family.bits() {
            return Err(CoreError::InvalidCidr {
                input: format!("{address}/{prefix_len}"),
                reason: format!(
                    "prefix length {prefix_len} exceeds {} for {family}",
                    family.bits()
                ),
            });
        }
        let network = AddressKey::new(address.key().value() & netmask(family, prefix_len));
        Ok(Self {
            network,
            prefix_len,
            family,
        })
    }

    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let invalid = |reason: String| CoreError::InvalidCidr {
            input: text.to_owned(),
            reason,
        };

        let (addr_part, prefix_part) = text
            .split_once('/')
            .ok_or_else(|| invalid("missing '/<prefix-length>'".into()))?;
        let address = Address::parse(addr_part)
            .map_err(|_| invalid(format!("'{addr_part}' is not a valid IP address")))?;
        if prefix_part.is_empty() || !prefix_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!("prefix length '{prefix_part}' is not a number")));
        }
        let prefix_len: u8 = prefix_part
            .parse()
            .map_err(|_| invalid(format!("prefix length '{prefix_part}' is out of range")))?;
        Self::new(address, prefix_len).map_err(|e| match e {
            CoreError::InvalidCidr { reason, .. } => invalid(reason),
            other => other,
        })
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn network_key(&self) -> AddressKey {
        self.network
    }

    pub fn netmask_key(&self) -> AddressKey {
        AddressKey::new(netmask(self.family, self.prefix_len))
    }

    pub fn broadcast_key(&self) -> AddressKey {
        AddressKey::new(self.network.value() | self.host_mask())
    }

    /// IPv4 blocks up to /30 reserve their network and broadcast addresses.
    /// /31, /32 and every IPv6 block are usable end to end.
    pub fn reserves_endpoints(&self) -> bool {
        self.family == AddressFamily::Ipv4 && self.prefix_len <= 30
    }

    pub fn first_usable(&self) -> AddressKey {
        if self.reserves_endpoints() {
            AddressKey::new(self.network.value() + 1)
        } else {
            self.network
        }
    }

    pub fn last_usable(&self) -> AddressKey {
        let broadcast = self.broadcast_key();
        if self.reserves_endpoints() {
            AddressKey::new(broadcast.value() - 1)
        } else {
            broadcast
        }
    }

    /// Inclusive `(first, last)` usable keys.
    pub fn usable_range(&self) -> (AddressKey, AddressKey) {
        (self.first_usable(), self.last_usable())
    }

    pub fn host_count(&self) -> HostCount {
        HostCount::power_of_two(self.family.bits() - self.prefix_len)
    }

    pub fn usable_host_count(&self) -> HostCount {
        if self.reserves_endpoints() {
            self.host_count().saturating_sub(2)
        } else {
            self.host_count()
        }
    }

    /// Range check only; callers that care about family use [`Self::contains_address`].
    pub fn contains(&self, key: AddressKey) -> bool {
        self.network <= key && key <= self.broadcast_key()
    }

    pub fn contains_address(&self, address: &Address) -> bool {
        address.family() == self.family && self.contains(address.key())
    }

    pub fn network(&self) -> Address {
        self.address_at(self.network)
    }

    pub fn netmask(&self) -> Address {
        self.address_at(self.netmask_key())
    }

    pub fn broadcast(&self) -> Address {
        self.address_at(self.broadcast_key())
    }

    pub fn first_usable_address(&self) -> Address {
        self.address_at(self.first_usable())
    }

    pub fn last_usable_address(&self) -> Address {
        self.address_at(self.last_usable())
    }

    fn host_mask(&self) -> u128 {
        self.family.max_key().value() & !netmask(self.family, self.prefix_len)
    }

    fn address_at(&self, key: AddressKey) -> Address {
        Address::from_masked_key(key, self.family)
    }
}

/// Family-relative netmask with the top `prefix_len` bits set.
fn netmask(family: AddressFamily, prefix_len: u8) -> u128 {
    let all_ones = family.max_key().value();
    all_ones
        .checked_shl(u32::from(family.bits() - prefix_len))
        .unwrap_or(0)
        & all_ones
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}

impl FromStr for CidrBlock {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── Storage form ────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct RawBlock {
    family: AddressFamily,
    network_key: AddressKey,
    prefix_length: u8,
}

impl TryFrom<RawBlock> for CidrBlock {
    type Error = CoreError;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        let address = Address::from_key(raw.network_key, raw.family)?;
        let block = Self::new(address, raw.prefix_length)?;
        if block.network != raw.network_key {
            return Err(CoreError::InvalidCidr {
                input: format!("{address}/{}", raw.prefix_length),
                reason: "stored network key has host bits set".into(),
            });
        }
        Ok(block)
    }
}

impl From<CidrBlock> for RawBlock {
    fn from(block: CidrBlock) -> Self {
        Self {
            family: block.family,
            network_key: block.network,
            prefix_length: block.prefix_len,
        }
    }
}
