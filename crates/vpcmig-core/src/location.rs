//! Location scopes of compute resources.

use serde::{Deserialize, Serialize};

/// Where a resource lives. Every remote call is addressed by project plus scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Project-wide resources (networks, templates, global backend services).
    Global,
    /// Regional resources (subnetworks, addresses, target pools, regional groups).
    Region(String),
    /// Zonal resources (instances, zonal groups).
    Zone(String),
}

impl Scope {
    /// Path segment used in resource URLs, e.g. `zones/us-central1-a`.
    pub fn path(&self) -> String {
        match self {
            Self::Global => "global".to_string(),
            Self::Region(region) => format!("regions/{region}"),
            Self::Zone(zone) => format!("zones/{zone}"),
        }
    }

    /// The region this scope belongs to, if any.
    pub fn region(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Region(region) => Some(region),
            Self::Zone(zone) => region_of_zone(zone),
        }
    }

    /// The zone name when zonal.
    pub fn zone(&self) -> Option<&str> {
        match self {
            Self::Zone(zone) => Some(zone),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Region of a zone: `us-central1-a` → `us-central1`.
pub fn region_of_zone(zone: &str) -> Option<&str> {
    match zone.rsplit_once('-') {
        Some((region, suffix)) if !region.is_empty() && !suffix.is_empty() => Some(region),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_zone_without_last_segment() {
        assert_eq!(region_of_zone("us-central1-a"), Some("us-central1"));
        assert_eq!(region_of_zone("europe-west4-c"), Some("europe-west4"));
        assert_eq!(region_of_zone("nozone"), None);
        assert_eq!(region_of_zone("trailing-"), None);
    }

    #[test]
    fn scope_paths() {
        assert_eq!(Scope::Global.path(), "global");
        assert_eq!(Scope::Region("us-east1".into()).path(), "regions/us-east1");
        assert_eq!(Scope::Zone("us-east1-b".into()).path(), "zones/us-east1-b");
        assert_eq!(Scope::Zone("us-east1-b".into()).region(), Some("us-east1"));
        assert_eq!(Scope::Global.region(), None);
    }
}
