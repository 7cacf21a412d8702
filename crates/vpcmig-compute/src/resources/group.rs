//! Instance groups, their managers, and autoscalers.

use serde::{Deserialize, Serialize};

use super::Extra;

/// Description prefix the provider stamps on groups owned by a manager.
const MANAGED_GROUP_MARKER: &str = "Instance Group Manager";

/// `instanceGroups` resource (zonal or regional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl InstanceGroupConfig {
    /// Whether an instance-group manager controls this group's membership.
    pub fn is_managed(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| d.contains(MANAGED_GROUP_MARKER))
    }
}

/// `instanceGroupManagers` / `regionInstanceGroupManagers` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupManagerConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_pools: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `autoscalers` / `regionAutoscalers` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Self-link of the manager this autoscaler drives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn managed_marker_in_description() {
        let managed: InstanceGroupConfig = serde_json::from_value(json!({
            "name": "web",
            "description": "This instance group is controlled by Instance Group Manager 'web'."
        }))
        .unwrap();
        assert!(managed.is_managed());

        let unmanaged: InstanceGroupConfig =
            serde_json::from_value(json!({"name": "web", "description": "hand made"})).unwrap();
        assert!(!unmanaged.is_managed());

        let bare: InstanceGroupConfig = serde_json::from_value(json!({"name": "web"})).unwrap();
        assert!(!bare.is_managed());
    }
}
