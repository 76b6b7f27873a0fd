// ── Typed request structs for Command payloads ──
//
// Textual inputs (CIDRs, addresses, names) stay as strings here; the facade
// parses and validates them so every front end gets the same errors.

use serde::{Deserialize, Serialize};

use crate::model::zone::{
    DEFAULT_EXPIRE, DEFAULT_MINIMUM, DEFAULT_REFRESH, DEFAULT_RETRY, DEFAULT_SERIAL,
};
use crate::model::{Patch, Soa, SubnetId};

// ── Subnet ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubnetRequest {
    pub cidr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── Address ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAddressRequest {
    pub subnet_id: SubnetId,
    /// Omit to allocate the next free address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAddressRequest {
    #[serde(default, skip_serializing_if = "Patch::is_unchanged")]
    pub dns_name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_unchanged")]
    pub description: Patch<String>,
}

// ── DNS zone ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoaRequest {
    pub mname: String,
    pub rname: String,
    #[serde(default = "default_serial")]
    pub serial: u32,
    #[serde(default = "default_refresh")]
    pub refresh: u32,
    #[serde(default = "default_retry")]
    pub retry: u32,
    #[serde(default = "default_expire")]
    pub expire: u32,
    #[serde(default = "default_minimum")]
    pub minimum: u32,
}

fn default_serial() -> u32 {
    DEFAULT_SERIAL
}
fn default_refresh() -> u32 {
    DEFAULT_REFRESH
}
fn default_retry() -> u32 {
    DEFAULT_RETRY
}
fn default_expire() -> u32 {
    DEFAULT_EXPIRE
}
fn default_minimum() -> u32 {
    DEFAULT_MINIMUM
}

impl SoaRequest {
    /// Request with the default timers.
    pub fn new(mname: impl Into<String>, rname: impl Into<String>) -> Self {
        Soa::new(mname, rname).into()
    }
}

impl From<SoaRequest> for Soa {
    fn from(req: SoaRequest) -> Self {
        Self {
            mname: req.mname,
            rname: req.rname,
            serial: req.serial,
            refresh: req.refresh,
            retry: req.retry,
            expire: req.expire,
            minimum: req.minimum,
        }
    }
}

impl From<Soa> for SoaRequest {
    fn from(soa: Soa) -> Self {
        Self {
            mname: soa.mname,
            rname: soa.rname,
            serial: soa.serial,
            refresh: soa.refresh,
            retry: soa.retry,
            expire: soa.expire,
            minimum: soa.minimum,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateZoneRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub soa: SoaRequest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateZoneRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replaces the whole SOA when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soa: Option<SoaRequest>,
}

impl UpdateZoneRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.soa.is_none()
    }
}
