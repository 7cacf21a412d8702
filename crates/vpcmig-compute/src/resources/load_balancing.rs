//! Load-balancing resources: backend services, forwarding rules, target pools.

use serde::{Deserialize, Serialize};

use super::Extra;

/// `backendServices` / `regionBackendServices` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendServiceConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// `EXTERNAL`, `INTERNAL_SELF_MANAGED`, `INTERNAL`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancing_scheme: Option<String>,
    /// Set on regional internal services only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backends: Option<Vec<Backend>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl BackendServiceConfig {
    /// Backends, or an empty slice.
    pub fn backend_list(&self) -> &[Backend] {
        self.backends.as_deref().unwrap_or(&[])
    }
}

/// One backend entry of a backend service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    /// Self-link of the serving instance group.
    pub group: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `forwardingRules` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingRuleConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancing_scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    #[serde(rename = "IPAddress", default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `targetPools` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPoolConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Self-links of member instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl TargetPoolConfig {
    /// Member instance links, or an empty slice.
    pub fn instance_links(&self) -> &[String] {
        self.instances.as_deref().unwrap_or(&[])
    }
}
