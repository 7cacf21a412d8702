//! External IP handling for recreated instances.
//!
//! Preserving an IP promotes it to a static regional address (or reuses one
//! already reserved for it). Not preserving it strips the NAT IP so the
//! provider assigns a fresh ephemeral one.

use vpcmig_compute::{AddressConfig, InstanceConfig};
use vpcmig_core::unique_name_now;

use crate::context::MigrationContext;
use crate::error::MigrationError;

/// Reserve `ip` as a static address in `region` unless it already is one.
/// Returns the name of the address holding it.
pub async fn reserve_static_ip(
    ctx: &MigrationContext,
    instance: &str,
    region: &str,
    ip: &str,
) -> Result<String, MigrationError> {
    let existing = ctx.api.list_addresses(&ctx.project, region).await?;
    if let Some(address) = existing.iter().find(|a| a.address.as_deref() == Some(ip)) {
        tracing::info!(instance, region, ip, address = %address.name, "external IP already reserved");
        return Ok(address.name.clone());
    }

    let name = unique_name_now(instance);
    tracing::info!(instance, region, ip, address = %name, "reserving external IP as static address");
    let op = ctx
        .api
        .insert_address(&ctx.project, region, &AddressConfig::external(&name, ip))
        .await?;
    ctx.wait(op).await?;
    Ok(name)
}

/// Drop every NAT IP so the provider assigns ephemeral ones.
/// Returns whether anything was dropped.
pub fn release_external_ip(config: &mut InstanceConfig) -> bool {
    let mut released = false;
    for interface in config.network_interfaces.iter_mut().flatten() {
        for access in interface.access_configs.iter_mut().flatten() {
            released |= access.nat_ip.take().is_some();
        }
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn release_strips_nat_ips_but_keeps_access_configs() {
        let mut config: InstanceConfig = serde_json::from_value(json!({
            "name": "vm",
            "networkInterfaces": [{
                "network": "legacy",
                "accessConfigs": [{"name": "External NAT", "natIP": "35.1.2.3", "type": "ONE_TO_ONE_NAT"}]
            }]
        }))
        .unwrap();
        assert!(release_external_ip(&mut config));
        assert!(config.external_ip().is_none());
        let access = &config.network_interfaces.as_ref().unwrap()[0]
            .access_configs
            .as_ref()
            .unwrap()[0];
        assert_eq!(access.extra["type"], "ONE_TO_ONE_NAT");
        assert!(!release_external_ip(&mut config));
    }
}
