//! # Compute Resource Schemas
//!
//! Typed views of the JSON bodies the compute provider returns and accepts.
//! Only the fields vpcmig reads or rewrites are modelled; everything else is
//! carried verbatim in each struct's flattened `extra` map so that a config
//! fetched, copied, and re-inserted round-trips without losing fields.
//!
//! `deny_unknown_fields` is intentionally NOT used.

mod group;
mod instance;
mod load_balancing;
mod network;

pub use group::{AutoscalerConfig, InstanceGroupConfig, InstanceGroupManagerConfig};
pub use instance::{
    AccessConfig, AttachedDisk, InstanceConfig, InstanceProperties, InstanceTemplateConfig,
    Metadata, MetadataItem, NetworkInterface,
};
pub use load_balancing::{Backend, BackendServiceConfig, ForwardingRuleConfig, TargetPoolConfig};
pub use network::{AddressConfig, NetworkConfig, SubnetworkConfig};

/// Fields not modelled explicitly.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// List responses share this envelope.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
