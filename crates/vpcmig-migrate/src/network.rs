//! # Target Network Resolution and Interface Rewriting
//!
//! A migration moves resources onto one target network, resolved once per
//! run and shared by every handler. Auto-mode targets may omit the
//! subnetwork; custom-mode targets require one; legacy networks are rejected.
//!
//! Rewrites touch network-interface fields only, and always on a working
//! copy: the captured original config is never aliased.

use vpcmig_compute::{ComputeApi, InstanceTemplateConfig, NetworkConfig, NetworkInterface};
use vpcmig_core::{ResourceKind, ResourceRef, Scope};

use crate::error::MigrationError;

/// Whether `network` creates its subnetworks automatically.
///
/// # Errors
///
/// [`MigrationError::InvalidTargetNetwork`] when the config carries no
/// `autoCreateSubnetworks` key, i.e. the network is a legacy network.
pub fn check_network_auto_mode(network: &NetworkConfig) -> Result<bool, MigrationError> {
    network
        .auto_create_subnetworks
        .ok_or_else(|| MigrationError::InvalidTargetNetwork {
            network: network.name.clone(),
        })
}

/// Network and subnetwork links for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub network: String,
    /// `None` on auto-mode targets without an explicit subnetwork.
    pub subnetwork: Option<String>,
}

/// The resolved target of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNetwork {
    project: String,
    network_link: String,
    auto_mode: bool,
    subnetwork: Option<String>,
}

/// Accept either a bare name or a self-link.
fn name_of(reference: &str, kind: ResourceKind) -> String {
    match ResourceRef::parse(reference) {
        Some(r) if r.kind == kind => r.name,
        _ => reference.to_string(),
    }
}

impl TargetNetwork {
    /// Fetch `network` and validate it as a migration target.
    pub async fn resolve(
        api: &dyn ComputeApi,
        project: &str,
        network: &str,
        subnetwork: Option<&str>,
    ) -> Result<Self, MigrationError> {
        let name = name_of(network, ResourceKind::Network);
        let config = api.get_network(project, &name).await?;
        let auto_mode = check_network_auto_mode(&config)?;
        if !auto_mode && subnetwork.is_none() {
            return Err(MigrationError::MissingTargetSubnetwork { network: name });
        }
        let network_link = config.self_link.clone().unwrap_or_else(|| {
            ResourceRef::new(project, &Scope::Global, ResourceKind::Network, &name).self_link()
        });
        tracing::info!(project, network = %name, auto_mode, subnetwork = ?subnetwork, "resolved target network");
        Ok(Self {
            project: project.to_string(),
            network_link,
            auto_mode,
            subnetwork: subnetwork.map(|s| name_of(s, ResourceKind::Subnetwork)),
        })
    }

    pub fn network_link(&self) -> &str {
        &self.network_link
    }

    pub fn is_auto_mode(&self) -> bool {
        self.auto_mode
    }

    /// Links to write into interfaces of resources in `region`.
    pub fn for_region(&self, region: &str) -> NetworkInfo {
        NetworkInfo {
            network: self.network_link.clone(),
            subnetwork: self.subnetwork.as_ref().map(|name| {
                ResourceRef::new(
                    &self.project,
                    &Scope::Region(region.to_string()),
                    ResourceKind::Subnetwork,
                    name,
                )
                .self_link()
            }),
        }
    }
}

/// Point the primary interface at `info`.
///
/// The internal IP is dropped because the legacy range does not in general
/// fall inside the target subnetwork. Access configs are left to the address
/// logic.
pub fn modify_network_interface(
    interfaces: Option<&mut Vec<NetworkInterface>>,
    resource: &str,
    info: &NetworkInfo,
) -> Result<(), MigrationError> {
    let primary = interfaces
        .and_then(|list| list.first_mut())
        .ok_or_else(|| MigrationError::config_shape(resource, "no networkInterfaces"))?;
    primary.network = Some(info.network.clone());
    primary.subnetwork = info.subnetwork.clone();
    primary.network_ip = None;
    Ok(())
}

/// Deep copy of `template` renamed to `new_name` with its interfaces moved
/// to `info`. The original is left untouched.
pub fn modify_instance_template_with_new_network(
    template: &InstanceTemplateConfig,
    info: &NetworkInfo,
    new_name: &str,
) -> Result<InstanceTemplateConfig, MigrationError> {
    let mut copy = template.clone();
    let resource = format!("instance template {}", template.name);
    let properties = copy
        .properties
        .as_mut()
        .ok_or_else(|| MigrationError::config_shape(&resource, "no properties"))?;
    modify_network_interface(properties.network_interfaces.as_mut(), &resource, info)?;
    copy.name = new_name.to_string();
    copy.self_link = None;
    copy.extra.remove("id");
    copy.extra.remove("creationTimestamp");
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn network(value: serde_json::Value) -> NetworkConfig {
        serde_json::from_value(value).unwrap()
    }

    fn info() -> NetworkInfo {
        NetworkInfo {
            network: "N".into(),
            subnetwork: Some("S".into()),
        }
    }

    #[test]
    fn auto_mode_flag_is_read() {
        let auto = network(json!({"name": "n", "autoCreateSubnetworks": true}));
        let custom = network(json!({"name": "n", "autoCreateSubnetworks": false}));
        assert!(check_network_auto_mode(&auto).unwrap());
        assert!(!check_network_auto_mode(&custom).unwrap());
    }

    #[test]
    fn legacy_network_is_rejected() {
        let legacy = network(json!({"name": "legacy", "IPv4Range": "10.240.0.0/16"}));
        let err = check_network_auto_mode(&legacy).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidTargetNetwork { network } if network == "legacy"));
    }

    #[test]
    fn template_copy_gets_new_network_and_name() {
        let original: InstanceTemplateConfig = serde_json::from_value(json!({
            "name": "old",
            "properties": {"networkInterfaces": [{"network": "legacy"}]}
        }))
        .unwrap();
        let copy = modify_instance_template_with_new_network(&original, &info(), "old-20261016093000")
            .unwrap();

        assert_eq!(
            serde_json::to_value(&copy).unwrap(),
            json!({
                "name": "old-20261016093000",
                "properties": {"networkInterfaces": [{"network": "N", "subnetwork": "S"}]}
            })
        );
        assert_eq!(original.name, "old");
        assert_eq!(
            original.properties.unwrap().network_interfaces.unwrap()[0].network.as_deref(),
            Some("legacy")
        );
    }

    #[test]
    fn template_without_interfaces_is_config_shape_error() {
        let template: InstanceTemplateConfig = serde_json::from_value(json!({
            "name": "old",
            "properties": {}
        }))
        .unwrap();
        let err = modify_instance_template_with_new_network(&template, &info(), "new").unwrap_err();
        assert!(matches!(err, MigrationError::ConfigShape { .. }));
    }

    #[test]
    fn non_sequence_interfaces_are_config_shape_errors() {
        let detail = serde_json::from_value::<InstanceTemplateConfig>(
            json!({"name": "old", "properties": {"networkInterfaces": "legacy"}}),
        )
        .unwrap_err()
        .to_string();
        let err = MigrationError::from(vpcmig_compute::ComputeError::Deserialization {
            endpoint: "GET global/instanceTemplates/old".into(),
            detail,
        });
        assert!(matches!(err, MigrationError::ConfigShape { .. }));
    }

    #[test]
    fn auto_mode_without_subnetwork_clears_subnet() {
        let mut interfaces: Vec<NetworkInterface> = serde_json::from_value(json!([{
            "network": "legacy",
            "networkIP": "10.240.0.7",
            "accessConfigs": [{"name": "External NAT"}]
        }]))
        .unwrap();
        let auto = NetworkInfo {
            network: "N".into(),
            subnetwork: None,
        };
        modify_network_interface(Some(&mut interfaces), "vm", &auto).unwrap();
        assert_eq!(interfaces[0].network.as_deref(), Some("N"));
        assert!(interfaces[0].subnetwork.is_none());
        assert!(interfaces[0].network_ip.is_none());
        assert_eq!(interfaces[0].access_configs.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn subnetwork_link_follows_region() {
        let target = TargetNetwork {
            project: "p".into(),
            network_link: "projects/p/global/networks/vpc".into(),
            auto_mode: false,
            subnetwork: Some("sub".into()),
        };
        let info = target.for_region("us-east1");
        assert!(info
            .subnetwork
            .unwrap()
            .ends_with("projects/p/regions/us-east1/subnetworks/sub"));
    }
}
