use serde::{Deserialize, Serialize};

use crate::codec::{Address, AddressFamily, AddressKey};
use crate::error::CoreError;

use super::{AddressId, SubnetId};

/// An assigned address. Persisted as its storage key plus family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredAddress", into = "StoredAddress")]
pub struct IpAddress {
    pub id: AddressId,
    pub address: Address,
    pub subnet_id: SubnetId,
    pub dns_name: Option<String>,
    pub description: Option<String>,
}

impl IpAddress {
    pub fn key(&self) -> AddressKey {
        self.address.key()
    }

    pub fn family(&self) -> AddressFamily {
        self.address.family()
    }

    pub fn view(&self) -> AddressView {
        AddressView::from(self)
    }
}

/// Insert payload for an address; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub address: Address,
    pub subnet_id: SubnetId,
    pub dns_name: Option<String>,
    pub description: Option<String>,
}

/// Three-way field update: keep, replace, or clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Patch<T> {
    #[default]
    Unchanged,
    Set(T),
    Clear,
}

impl<T> Patch<T> {
    /// Build from CLI-style inputs. `clear` wins over a value.
    pub fn from_parts(value: Option<T>, clear: bool) -> Self {
        match (value, clear) {
            (_, true) => Self::Clear,
            (Some(v), false) => Self::Set(v),
            (None, false) => Self::Unchanged,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(v) => Some(v),
            Self::Unchanged | Self::Clear => None,
        }
    }

    pub fn apply(self, slot: &mut Option<T>) {
        match self {
            Self::Unchanged => {}
            Self::Set(v) => *slot = Some(v),
            Self::Clear => *slot = None,
        }
    }
}

/// Field changes for an existing address. Address and subnet are immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressPatch {
    pub dns_name: Patch<String>,
    pub description: Patch<String>,
}

/// Read-side rendering of an address record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressView {
    pub id: AddressId,
    pub address: String,
    pub address_key: AddressKey,
    pub family: AddressFamily,
    pub subnet_id: SubnetId,
    pub dns_name: Option<String>,
    pub description: Option<String>,
}

impl From<&IpAddress> for AddressView {
    fn from(record: &IpAddress) -> Self {
        Self {
            id: record.id,
            address: record.address.to_string(),
            address_key: record.key(),
            family: record.family(),
            subnet_id: record.subnet_id,
            dns_name: record.dns_name.clone(),
            description: record.description.clone(),
        }
    }
}

// ── Storage form ────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct StoredAddress {
    id: AddressId,
    address_key: AddressKey,
    family: AddressFamily,
    subnet_id: SubnetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dns_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl TryFrom<StoredAddress> for IpAddress {
    type Error = CoreError;

    fn try_from(stored: StoredAddress) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored.id,
            address: Address::from_key(stored.address_key, stored.family)?,
            subnet_id: stored.subnet_id,
            dns_name: stored.dns_name,
            description: stored.description,
        })
    }
}

impl From<IpAddress> for StoredAddress {
    fn from(record: IpAddress) -> Self {
        Self {
            id: record.id,
            address_key: record.key(),
            family: record.family(),
            subnet_id: record.subnet_id,
            dns_name: record.dns_name,
            description: record.description,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record() -> IpAddress {
        IpAddress {
            id: AddressId::new(9),
            address: Address::parse("10.0.0.5").unwrap(),
            subnet_id: SubnetId::new(1),
            dns_name: Some("db.example.com".into()),
            description: None,
        }
    }

    #[test]
    fn stored_form_uses_storage_key() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["address_key"], "0000000000000000000000000a000005");
        assert_eq!(json["family"], "ipv4");
        assert!(json.get("address").is_none());

        let back: IpAddress = serde_json::from_value(json).unwrap();
        assert_eq!(back, record());
    }

    #[test]
    fn stored_form_rejects_oversized_ipv4_key() {
        let json = serde_json::json!({
            "id": 1,
            "address_key": "00000000000000000000000100000000",
            "family": "ipv4",
            "subnet_id": 1
        });
        assert!(serde_json::from_value::<IpAddress>(json).is_err());
    }

    #[test]
    fn patch_applies_three_ways() {
        let mut slot = Some("old".to_owned());
        Patch::Unchanged.apply(&mut slot);
        assert_eq!(slot.as_deref(), Some("old"));
        Patch::Set("new".to_owned()).apply(&mut slot);
        assert_eq!(slot.as_deref(), Some("new"));
        Patch::<String>::Clear.apply(&mut slot);
        assert_eq!(slot, None);
    }

    #[test]
    fn clear_flag_wins_over_value() {
        assert_eq!(Patch::from_parts(Some(1), true), Patch::Clear);
        assert_eq!(Patch::from_parts(Some(1), false), Patch::Set(1));
        assert_eq!(Patch::<i32>::from_parts(None, false), Patch::Unchanged);
    }

    #[test]
    fn view_renders_text_and_key() {
        let view = record().view();
        assert_eq!(view.address, "10.0.0.5");
        assert_eq!(view.address_key.value(), 0x0a00_0005);
    }
}
