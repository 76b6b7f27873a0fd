// ── Address codec ──
//
// Every address, regardless of family, becomes a 128-bit key. IPv4 is
// zero-extended, so numeric order is well defined across families, and the
// zero-padded hex storage form sorts exactly like the integer.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Length of the hex storage form of an [`AddressKey`].
pub const STORAGE_KEY_LEN: usize = 32;

// ── AddressFamily ───────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    #[strum(to_string = "IPv4")]
    Ipv4,
    #[strum(to_string = "IPv6")]
    Ipv6,
}

impl AddressFamily {
    /// Address width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Ipv4 => 32,
            Self::Ipv6 => 128,
        }
    }

    /// Largest key an address of this family can take.
    pub fn max_key(self) -> AddressKey {
        match self {
            Self::Ipv4 => AddressKey(u128::from(u32::MAX)),
            Self::Ipv6 => AddressKey(u128::MAX),
        }
    }
}

// ── AddressKey ──────────────────────────────────────────────────────

/// Fixed-width, order-preserving address key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AddressKey(u128);

impl AddressKey {
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u128 {
        self.0
    }

    pub fn successor(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// 32 lowercase hex digits, zero padded.
    pub fn to_storage_key(self) -> String {
        format!("{:0width$x}", self.0, width = STORAGE_KEY_LEN)
    }

    pub fn from_storage_key(text: &str) -> Result<Self, CoreError> {
        if text.len() != STORAGE_KEY_LEN || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidAddress {
                input: text.to_owned(),
                reason: format!("storage keys are exactly {STORAGE_KEY_LEN} hex digits"),
            });
        }
        u128::from_str_radix(text, 16)
            .map(Self)
            .map_err(|e| CoreError::InvalidAddress {
                input: text.to_owned(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage_key())
    }
}

impl From<u128> for AddressKey {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Serialize for AddressKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_storage_key())
    }
}

impl<'de> Deserialize<'de> for AddressKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_storage_key(&text).map_err(serde::de::Error::custom)
    }
}

// ── Address ─────────────────────────────────────────────────────────

/// A parsed address: its key and family travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(IpAddr);

impl Address {
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        text.parse()
    }

    /// Rebuild an address from its key. Fails when an IPv4 key exceeds 32 bits.
    pub fn from_key(key: AddressKey, family: AddressFamily) -> Result<Self, CoreError> {
        match family {
            AddressFamily::Ipv4 => u32::try_from(key.0)
                .map(|v| Self(IpAddr::V4(Ipv4Addr::from(v))))
                .map_err(|_| CoreError::InvalidAddress {
                    input: key.to_storage_key(),
                    reason: "key does not fit in 32 bits".into(),
                }),
            AddressFamily::Ipv6 => Ok(Self(IpAddr::V6(Ipv6Addr::from(key.0)))),
        }
    }

    /// Like [`Self::from_key`], discarding bits above the family width.
    pub(crate) fn from_masked_key(key: AddressKey, family: AddressFamily) -> Self {
        let masked = AddressKey(key.0 & family.max_key().0);
        match family {
            AddressFamily::Ipv4 => {
                Self(IpAddr::V4(Ipv4Addr::from(u32::try_from(masked.0).unwrap_or_default())))
            }
            AddressFamily::Ipv6 => Self(IpAddr::V6(Ipv6Addr::from(masked.0))),
        }
    }

    pub fn key(&self) -> AddressKey {
        match self.0 {
            IpAddr::V4(v4) => AddressKey(u128::from(u32::from(v4))),
            IpAddr::V6(v6) => AddressKey(u128::from(v6)),
        }
    }

    pub fn family(&self) -> AddressFamily {
        match self.0 {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // std renders IPv6 in RFC 5952 form
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>()
            .map(Self)
            .map_err(|_| CoreError::InvalidAddress {
                input: s.to_owned(),
                reason: "expected dotted-decimal IPv4 or colon-hex IPv6".into(),
            })
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Self(ip)
    }
}

// ── Free functions ──────────────────────────────────────────────────

/// Parse textual address into its key and family.
pub fn parse(text: &str) -> Result<(AddressKey, AddressFamily), CoreError> {
    let address = Address::parse(text)?;
    Ok((address.key(), address.family()))
}

/// Canonical text for a key.
pub fn format(key: AddressKey, family: AddressFamily) -> Result<String, CoreError> {
    Address::from_key(key, family).map(|a| a.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_is_zero_extended() {
        let (key, family) = parse("10.0.0.1").unwrap();
        assert_eq!(family, AddressFamily::Ipv4);
        assert_eq!(key.value(), 0x0a00_0001);
        assert_eq!(key.to_storage_key(), "0000000000000000000000000a000001");
    }

    #[test]
    fn ipv6_canonicalizes_on_format() {
        let (key, family) = parse("2001:0db8:0000:0000:0000:0000:0000:0001").unwrap();
        assert_eq!(family, AddressFamily::Ipv6);
        assert_eq!(format(key, family).unwrap(), "2001:db8::1");
    }

    #[test]
    fn embedded_ipv4_round_trips() {
        let (key, family) = parse("::ffff:192.0.2.1").unwrap();
        let text = format(key, family).unwrap();
        assert_eq!(parse(&text).unwrap(), (key, family));
    }

    #[test]
    fn malformed_text_is_rejected() {
        for bad in ["", "10.0.0", "10.0.0.256", "1::2::3", "fe80::1%eth0", "hello", "01.2.3.4"] {
            assert!(
                matches!(parse(bad), Err(CoreError::InvalidAddress { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn storage_order_matches_numeric_order_across_families() {
        let inputs = ["::1", "0.0.0.1", "255.255.255.255", "::1:0:0", "10.0.0.1", "2001:db8::"];
        let mut keys: Vec<AddressKey> = inputs.iter().map(|t| parse(t).unwrap().0).collect();
        let mut by_string = keys.clone();
        keys.sort();
        by_string.sort_by_key(|k| k.to_storage_key());
        assert_eq!(keys, by_string);
    }

    #[test]
    fn storage_key_rejects_wrong_width() {
        assert!(AddressKey::from_storage_key("0a000001").is_err());
        assert!(AddressKey::from_storage_key("zz000000000000000000000000000000").is_err());
        let key = AddressKey::from_storage_key("0000000000000000000000000a000001").unwrap();
        assert_eq!(key.value(), 0x0a00_0001);
    }

    #[test]
    fn oversized_ipv4_key_fails_to_format() {
        let key = AddressKey::new(u128::from(u32::MAX) + 1);
        assert!(format(key, AddressFamily::Ipv4).is_err());
        assert_eq!(format(key, AddressFamily::Ipv6).unwrap(), "::1:0:0");
    }

    #[test]
    fn key_serializes_as_storage_string() {
        let key = AddressKey::new(1);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"00000000000000000000000000000001\"");
        let back: AddressKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
