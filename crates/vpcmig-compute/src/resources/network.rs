//! Networks, subnetworks, and addresses.

use serde::{Deserialize, Serialize};

use super::Extra;

/// `networks` resource.
///
/// A subnet-mode network carries `autoCreateSubnetworks`; a legacy network
/// carries neither that key nor subnetworks, only an `IPv4Range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_subnetworks: Option<bool>,
    #[serde(rename = "IPv4Range", default, skip_serializing_if = "Option::is_none")]
    pub ipv4_range: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `subnetworks` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetworkConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `addresses` resource (regional static IPs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressConfig {
    pub name: String,
    /// The IP itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// `RESERVED` or `IN_USE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl AddressConfig {
    /// A static external address reserving `ip`.
    pub fn external(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: Some(ip.into()),
            status: None,
            address_type: Some("EXTERNAL".to_string()),
            region: None,
            extra: Extra::new(),
        }
    }
}
