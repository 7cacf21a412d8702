//! Instance and instance-template bodies.

use serde::{Deserialize, Serialize};

use super::Extra;

/// `instances` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_interfaces: Option<Vec<NetworkInterface>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disks: Option<Vec<AttachedDisk>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl InstanceConfig {
    /// Value of a metadata key, e.g. `created-by`.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.key == key)
            .and_then(|item| item.value.as_deref())
    }

    /// External IP of the first network interface, if one is attached.
    pub fn external_ip(&self) -> Option<&str> {
        self.network_interfaces
            .as_ref()?
            .first()?
            .access_configs
            .as_ref()?
            .first()?
            .nat_ip
            .as_deref()
    }
}

/// One network interface of an instance or template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    /// Internal IP. Bound to the old network's range.
    #[serde(rename = "networkIP", default, skip_serializing_if = "Option::is_none")]
    pub network_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_configs: Option<Vec<AccessConfig>>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// External NAT configuration of a network interface.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Absent means the provider assigns an ephemeral IP.
    #[serde(rename = "natIP", default, skip_serializing_if = "Option::is_none")]
    pub nat_ip: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A disk attached to an instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_delete: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Instance metadata block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub items: Vec<MetadataItem>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// `instanceTemplates` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTemplateConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<InstanceProperties>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Instance properties stamped out by a template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_interfaces: Option<Vec<NetworkInterface>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let body = json!({
            "name": "vm-1",
            "machineType": "zones/z/machineTypes/e2-small",
            "networkInterfaces": [{
                "network": "global/networks/legacy",
                "networkIP": "10.0.0.2",
                "accessConfigs": [{"name": "External NAT", "natIP": "34.1.2.3", "type": "ONE_TO_ONE_NAT"}]
            }],
            "disks": [{"deviceName": "boot", "boot": true, "source": "zones/z/disks/boot"}]
        });
        let config: InstanceConfig = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(config.external_ip(), Some("34.1.2.3"));
        assert_eq!(serde_json::to_value(&config).unwrap(), body);
    }

    #[test]
    fn metadata_lookup() {
        let config: InstanceConfig = serde_json::from_value(json!({
            "name": "vm",
            "metadata": {"items": [{"key": "created-by", "value": "projects/p/zones/z/instanceGroupManagers/m"}]}
        }))
        .unwrap();
        assert_eq!(
            config.metadata_value("created-by"),
            Some("projects/p/zones/z/instanceGroupManagers/m")
        );
        assert_eq!(config.metadata_value("missing"), None);
    }
}
