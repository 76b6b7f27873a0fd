// ── Record identifiers ──
//
// Every table hands out monotonically increasing u64 ids. Separate newtypes
// keep a subnet id from being passed where an address id is expected.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

record_id!(
    /// Identifier of a [`Subnet`](super::Subnet).
    SubnetId
);
record_id!(
    /// Identifier of an [`IpAddress`](super::IpAddress).
    AddressId
);
record_id!(
    /// Identifier of a [`DnsZone`](super::DnsZone).
    ZoneId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_and_display() {
        let id: SubnetId = "17".parse().unwrap();
        assert_eq!(id, SubnetId::new(17));
        assert_eq!(id.to_string(), "17");
        assert!("seventeen".parse::<AddressId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ZoneId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: ZoneId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(), 3);
    }
}
