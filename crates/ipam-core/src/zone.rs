// ── Zone matching ──
//
// A DNS name is acceptable when it is syntactically a hostname and sits at or
// under one of the registered zones. Containment is a flat suffix match on
// label boundaries: `host.example.com` is under `example.com`,
// `evilexample.com` is not.

use tracing::debug;

use crate::error::CoreError;
use crate::model::Soa;
use crate::store::IpamStore;

pub const MAX_NAME_LEN: usize = 253;
pub const MAX_LABEL_LEN: usize = 63;
pub const MIN_LABELS: usize = 2;

/// Strip one trailing dot and lowercase, for comparison only.
pub fn normalize(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}

/// Hostname syntax: at most 253 characters, at least two labels, each label
/// 1-63 ASCII letters, digits or hyphens and not starting or ending with a hyphen.
pub fn validate_hostname(name: &str) -> Result<(), CoreError> {
    let invalid = |reason: String| CoreError::InvalidHostname {
        name: name.to_owned(),
        reason,
    };

    let bare = name.strip_suffix('.').unwrap_or(name);
    if bare.is_empty() {
        return Err(invalid("name is empty".into()));
    }
    if bare.len() > MAX_NAME_LEN {
        return Err(invalid(format!("longer than {MAX_NAME_LEN} characters")));
    }

    let labels: Vec<&str> = bare.split('.').collect();
    if labels.len() < MIN_LABELS {
        return Err(invalid(format!("needs at least {MIN_LABELS} labels")));
    }
    for label in labels {
        if label.is_empty() {
            return Err(invalid("contains an empty label".into()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid(format!(
                "label '{label}' is longer than {MAX_LABEL_LEN} characters"
            )));
        }
        if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(invalid(format!(
                "label '{label}' may only contain letters, digits and hyphens"
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid(format!(
                "label '{label}' starts or ends with a hyphen"
            )));
        }
    }
    Ok(())
}

/// Reject zero timers and malformed server / mailbox names.
pub fn validate_soa(soa: &Soa) -> Result<(), CoreError> {
    validate_hostname(&soa.mname)?;
    validate_hostname(&soa.rname)?;
    for (field, value) in [
        ("refresh", soa.refresh),
        ("retry", soa.retry),
        ("expire", soa.expire),
        ("minimum", soa.minimum),
    ] {
        if value == 0 {
            return Err(CoreError::validation(format!(
                "SOA {field} must be at least 1 second"
            )));
        }
    }
    Ok(())
}

// ── ZoneMatcher ─────────────────────────────────────────────────────

/// A snapshot of zone names to validate against. Build a fresh one per
/// validation with [`ZoneMatcher::load`] so edits to zones apply immediately.
#[derive(Debug, Clone, Default)]
pub struct ZoneMatcher {
    zones: Vec<String>,
}

impl ZoneMatcher {
    pub fn new<I, S>(zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            zones: zones.into_iter().map(|z| normalize(z.as_ref())).collect(),
        }
    }

    /// Current zone names from the store.
    pub async fn load(store: &dyn IpamStore) -> Result<Self, CoreError> {
        let zones = store.list_zones().await?;
        debug!(zones = zones.len(), "loaded zones for name validation");
        Ok(Self::new(zones.iter().map(|z| z.name.as_str())))
    }

    /// Syntax first, then containment.
    pub fn validate(&self, dns_name: &str) -> Result<(), CoreError> {
        validate_hostname(dns_name)?;
        let name = normalize(dns_name);
        if self.zones.iter().any(|zone| is_within(&name, zone)) {
            Ok(())
        } else {
            Err(CoreError::NoMatchingZone {
                name: dns_name.to_owned(),
            })
        }
    }

    pub fn is_valid(&self, dns_name: &str) -> bool {
        self.validate(dns_name).is_ok()
    }
}

/// Both arguments must already be normalized.
fn is_within(name: &str, zone: &str) -> bool {
    name == zone
        || name
            .strip_suffix(zone)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> ZoneMatcher {
        ZoneMatcher::new(["example.com"])
    }

    #[test]
    fn subdomains_and_apex_match() {
        assert!(matcher().is_valid("host.example.com"));
        assert!(matcher().is_valid("a.b.example.com"));
        assert!(matcher().is_valid("example.com"));
    }

    #[test]
    fn suffix_without_label_boundary_does_not_match() {
        assert!(matches!(
            matcher().validate("evilexample.com"),
            Err(CoreError::NoMatchingZone { .. })
        ));
        assert!(!matcher().is_valid("example.org"));
    }

    #[test]
    fn trailing_dots_and_case_are_ignored() {
        assert!(matcher().is_valid("Host.Example.COM."));
        assert!(ZoneMatcher::new(["example.com."]).is_valid("www.example.com"));
    }

    #[test]
    fn any_matching_zone_suffices() {
        let m = ZoneMatcher::new(["corp.internal", "example.com"]);
        assert!(m.is_valid("db.corp.internal"));
        assert!(m.is_valid("db.example.com"));
    }

    #[test]
    fn empty_zone_set_matches_nothing() {
        assert!(matches!(
            ZoneMatcher::default().validate("host.example.com"),
            Err(CoreError::NoMatchingZone { .. })
        ));
    }

    #[test]
    fn syntax_is_checked_before_containment() {
        for bad in [
            "",
            ".",
            "localhost",
            "-bad.example.com",
            "bad-.example.com",
            "under_score.example.com",
            "double..example.com",
            "sp ace.example.com",
        ] {
            assert!(
                matches!(matcher().validate(bad), Err(CoreError::InvalidHostname { .. })),
                "{bad:?} should fail syntax"
            );
        }
    }

    #[test]
    fn length_limits() {
        let long_label = format!("{}.example.com", "a".repeat(64));
        assert!(validate_hostname(&long_label).is_err());
        let ok_label = format!("{}.example.com", "a".repeat(63));
        assert!(validate_hostname(&ok_label).is_ok());

        let long_name = format!("{}example.com", "abcdefghi.".repeat(25));
        assert!(long_name.len() > MAX_NAME_LEN);
        assert!(validate_hostname(&long_name).is_err());
    }

    #[test]
    fn soa_timers_must_be_positive() {
        let mut soa = Soa::new("ns1.example.com", "hostmaster.example.com");
        assert!(validate_soa(&soa).is_ok());
        soa.retry = 0;
        assert!(matches!(
            validate_soa(&soa),
            Err(CoreError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn soa_names_must_be_hostnames() {
        let soa = Soa::new("ns1", "hostmaster.example.com");
        assert!(matches!(
            validate_soa(&soa),
            Err(CoreError::InvalidHostname { .. })
        ));
    }
}
