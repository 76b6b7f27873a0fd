use serde::{Deserialize, Serialize};

use super::ZoneId;

pub const DEFAULT_SERIAL: u32 = 1;
pub const DEFAULT_REFRESH: u32 = 3600;
pub const DEFAULT_RETRY: u32 = 600;
pub const DEFAULT_EXPIRE: u32 = 604_800;
pub const DEFAULT_MINIMUM: u32 = 86_400;

/// Start-of-authority parameters. Stored verbatim; the core never serves DNS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Soa {
    /// Primary name server.
    pub mname: String,
    /// Responsible mailbox, in DNS form (`hostmaster.example.com`).
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl Soa {
    /// SOA with the default timers.
    pub fn new(mname: impl Into<String>, rname: impl Into<String>) -> Self {
        Self {
            mname: mname.into(),
            rname: rname.into(),
            serial: DEFAULT_SERIAL,
            refresh: DEFAULT_REFRESH,
            retry: DEFAULT_RETRY,
            expire: DEFAULT_EXPIRE,
            minimum: DEFAULT_MINIMUM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsZone {
    pub id: ZoneId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub soa: Soa,
}

impl DnsZone {
    /// Key used for uniqueness and matching: trailing dot dropped, lowercased.
    pub fn lookup_key(&self) -> String {
        crate::zone::normalize(&self.name)
    }
}

/// Insert payload for a zone; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewZone {
    pub name: String,
    pub description: Option<String>,
    pub soa: Soa,
}
