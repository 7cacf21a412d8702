//! # Resource Self-Links
//!
//! The compute provider refers to every resource by a URL-shaped self-link:
//!
//! ```text
//! https://www.googleapis.com/compute/v1/projects/{project}/zones/{zone}/instances/{name}
//! https://www.googleapis.com/compute/v1/projects/{project}/regions/{region}/targetPools/{name}
//! projects/{project}/global/backendServices/{name}
//! ```
//!
//! [`ResourceRef::parse`] runs an ordered list of pattern attempts over the
//! reference: project, zone, region, then one pattern per resource collection
//! in specificity order (instance, instance group, backend service, target
//! pool, forwarding rule, then the supporting collections). The first
//! collection that matches decides the kind, so a parsed reference names
//! exactly one resource.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::location::{region_of_zone, Scope};

/// Prefix of fully-qualified compute self-links.
pub const COMPUTE_API_PREFIX: &str = "https://www.googleapis.com/compute/v1/";

/// Resource collections vpcmig knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Instance,
    InstanceGroup,
    BackendService,
    TargetPool,
    ForwardingRule,
    InstanceGroupManager,
    InstanceTemplate,
    Autoscaler,
    Network,
    Subnetwork,
    Address,
}

impl ResourceKind {
    /// Resolution order. Earlier kinds are more specific.
    pub const RESOLUTION_ORDER: [ResourceKind; 11] = [
        Self::Instance,
        Self::InstanceGroup,
        Self::BackendService,
        Self::TargetPool,
        Self::ForwardingRule,
        Self::InstanceGroupManager,
        Self::InstanceTemplate,
        Self::Autoscaler,
        Self::Network,
        Self::Subnetwork,
        Self::Address,
    ];

    /// Collection segment in resource URLs.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Instance => "instances",
            Self::InstanceGroup => "instanceGroups",
            Self::BackendService => "backendServices",
            Self::TargetPool => "targetPools",
            Self::ForwardingRule => "forwardingRules",
            Self::InstanceGroupManager => "instanceGroupManagers",
            Self::InstanceTemplate => "instanceTemplates",
            Self::Autoscaler => "autoscalers",
            Self::Network => "networks",
            Self::Subnetwork => "subnetworks",
            Self::Address => "addresses",
        }
    }

    /// Whether the dispatcher can build a migration handler for this kind.
    pub fn is_migratable(&self) -> bool {
        matches!(
            self,
            Self::Instance
                | Self::InstanceGroup
                | Self::BackendService
                | Self::TargetPool
                | Self::ForwardingRule
        )
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Instance => "instance",
            Self::InstanceGroup => "instance group",
            Self::BackendService => "backend service",
            Self::TargetPool => "target pool",
            Self::ForwardingRule => "forwarding rule",
            Self::InstanceGroupManager => "instance group manager",
            Self::InstanceTemplate => "instance template",
            Self::Autoscaler => "autoscaler",
            Self::Network => "network",
            Self::Subnetwork => "subnetwork",
            Self::Address => "address",
        };
        f.write_str(s)
    }
}

/// A parsed reference to one remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub project: String,
    pub zone: Option<String>,
    pub region: Option<String>,
    pub kind: ResourceKind,
    pub name: String,
}

struct Patterns {
    project: Regex,
    zone: Regex,
    region: Regex,
    kinds: Vec<(ResourceKind, Regex)>,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // The expressions are constants; a failure here is a programming error
        // caught by the unit tests below.
        let compile = |expr: &str| Regex::new(expr).unwrap_or_else(|e| panic!("{expr}: {e}"));
        Patterns {
            project: compile(r"(?:^|/)projects/([^/?#]+)"),
            zone: compile(r"/zones/([^/?#]+)"),
            region: compile(r"/regions/([^/?#]+)"),
            kinds: ResourceKind::RESOLUTION_ORDER
                .iter()
                .map(|kind| {
                    (
                        *kind,
                        compile(&format!(r"/{}/([^/?#]+)", kind.collection())),
                    )
                })
                .collect(),
        }
    })
}

impl ResourceRef {
    /// Build a reference from its parts.
    pub fn new(
        project: impl Into<String>,
        scope: &Scope,
        kind: ResourceKind,
        name: impl Into<String>,
    ) -> Self {
        let (zone, region) = match scope {
            Scope::Global => (None, None),
            Scope::Region(region) => (None, Some(region.clone())),
            Scope::Zone(zone) => (
                Some(zone.clone()),
                region_of_zone(zone).map(str::to_string),
            ),
        };
        Self {
            project: project.into(),
            zone,
            region,
            kind,
            name: name.into(),
        }
    }

    /// Parse a self-link (absolute or project-relative).
    ///
    /// Returns `None` when the reference has no project or names no known
    /// collection. Callers treat that as "skip", not as a failure.
    pub fn parse(link: &str) -> Option<Self> {
        let p = patterns();
        let capture = |re: &Regex| {
            re.captures(link)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };

        let project = capture(&p.project)?;
        let (kind, name) = p
            .kinds
            .iter()
            .find_map(|(kind, re)| capture(re).map(|name| (*kind, name)))?;

        let zone = capture(&p.zone);
        let region = capture(&p.region).or_else(|| {
            zone.as_deref()
                .and_then(region_of_zone)
                .map(str::to_string)
        });

        Some(Self {
            project,
            zone,
            region,
            kind,
            name,
        })
    }

    /// Parse and require a particular kind.
    pub fn parse_as(link: &str, expected: ResourceKind) -> Result<Self, CoreError> {
        let parsed =
            Self::parse(link).ok_or_else(|| CoreError::UnresolvableReference(link.to_string()))?;
        if parsed.kind != expected {
            return Err(CoreError::UnexpectedKind {
                expected: expected.to_string(),
                actual: parsed.kind.to_string(),
                link: link.to_string(),
            });
        }
        Ok(parsed)
    }

    /// Most specific scope of the reference.
    pub fn scope(&self) -> Scope {
        match (&self.zone, &self.region) {
            (Some(zone), _) => Scope::Zone(zone.clone()),
            (None, Some(region)) => Scope::Region(region.clone()),
            (None, None) => Scope::Global,
        }
    }

    /// `projects/{project}/{scope}/{collection}/{name}`.
    pub fn relative_path(&self) -> String {
        format!(
            "projects/{}/{}/{}/{}",
            self.project,
            self.scope().path(),
            self.kind.collection(),
            self.name
        )
    }

    /// Fully-qualified self-link.
    pub fn self_link(&self) -> String {
        format!("{COMPUTE_API_PREFIX}{}", self.relative_path())
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.relative_path())
    }
}

/// Whether two links point at the same resource, ignoring absolute/relative
/// form and API version prefix.
pub fn same_resource(a: &str, b: &str) -> bool {
    match (ResourceRef::parse(a), ResourceRef::parse(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}
