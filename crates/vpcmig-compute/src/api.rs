//! # The Compute API Seam
//!
//! [`ComputeApi`] is the only path from migration logic to the provider.
//! Handlers hold it as `Arc<dyn ComputeApi>` so the HTTP client and the
//! in-memory mock are interchangeable.
//!
//! Conventions:
//! - Getters return [`ComputeError::NotFound`] for absent resources.
//! - Mutating calls return the [`Operation`] handle unwaited; callers pass
//!   it to an [`OperationWaiter`](crate::OperationWaiter).
//! - Scoped collections (groups, managers, autoscalers, backend services,
//!   forwarding rules) take a [`Scope`] and pick the zonal, regional, or
//!   global collection from it.

use async_trait::async_trait;
use vpcmig_core::Scope;

use crate::error::ComputeError;
use crate::operation::Operation;
use crate::resources::{
    AddressConfig, AttachedDisk, AutoscalerConfig, BackendServiceConfig, ForwardingRuleConfig,
    InstanceConfig, InstanceGroupConfig, InstanceGroupManagerConfig, InstanceTemplateConfig,
    NetworkConfig, SubnetworkConfig, TargetPoolConfig,
};

#[async_trait]
pub trait ComputeApi: Send + Sync {
    // -- Operations ----------------------------------------------------------

    async fn get_operation(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    // -- Instances -----------------------------------------------------------

    async fn get_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<InstanceConfig, ComputeError>;

    async fn insert_instance(
        &self,
        project: &str,
        zone: &str,
        config: &InstanceConfig,
    ) -> Result<Operation, ComputeError>;

    async fn delete_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    async fn start_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    async fn stop_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    async fn attach_disk(
        &self,
        project: &str,
        zone: &str,
        instance: &str,
        disk: &AttachedDisk,
    ) -> Result<Operation, ComputeError>;

    async fn detach_disk(
        &self,
        project: &str,
        zone: &str,
        instance: &str,
        device_name: &str,
    ) -> Result<Operation, ComputeError>;

    // -- Addresses and networks ----------------------------------------------

    async fn list_addresses(
        &self,
        project: &str,
        region: &str,
    ) -> Result<Vec<AddressConfig>, ComputeError>;

    async fn insert_address(
        &self,
        project: &str,
        region: &str,
        address: &AddressConfig,
    ) -> Result<Operation, ComputeError>;

    async fn get_network(&self, project: &str, name: &str) -> Result<NetworkConfig, ComputeError>;

    async fn get_subnetwork(
        &self,
        project: &str,
        region: &str,
        name: &str,
    ) -> Result<SubnetworkConfig, ComputeError>;

    // -- Instance groups -----------------------------------------------------

    async fn get_instance_group(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<InstanceGroupConfig, ComputeError>;

    async fn list_instance_groups(
        &self,
        project: &str,
        zone: &str,
    ) -> Result<Vec<InstanceGroupConfig>, ComputeError>;

    /// Self-links of the instances in a zonal group.
    async fn list_group_instances(
        &self,
        project: &str,
        zone: &str,
        group: &str,
    ) -> Result<Vec<String>, ComputeError>;

    async fn insert_instance_group(
        &self,
        project: &str,
        zone: &str,
        config: &InstanceGroupConfig,
    ) -> Result<Operation, ComputeError>;

    async fn delete_instance_group(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    async fn add_instances_to_group(
        &self,
        project: &str,
        zone: &str,
        group: &str,
        instance_links: &[String],
    ) -> Result<Operation, ComputeError>;

    // -- Instance group managers and autoscalers -----------------------------

    async fn get_instance_group_manager(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<InstanceGroupManagerConfig, ComputeError>;

    async fn list_instance_group_managers(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<InstanceGroupManagerConfig>, ComputeError>;

    /// Self-links of the instances a manager currently owns.
    async fn list_managed_instances(
        &self,
        project: &str,
        scope: &Scope,
        manager: &str,
    ) -> Result<Vec<String>, ComputeError>;

    async fn insert_instance_group_manager(
        &self,
        project: &str,
        scope: &Scope,
        config: &InstanceGroupManagerConfig,
    ) -> Result<Operation, ComputeError>;

    async fn delete_instance_group_manager(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    async fn set_target_pools(
        &self,
        project: &str,
        scope: &Scope,
        manager: &str,
        target_pools: &[String],
    ) -> Result<Operation, ComputeError>;

    async fn list_autoscalers(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<AutoscalerConfig>, ComputeError>;

    async fn insert_autoscaler(
        &self,
        project: &str,
        scope: &Scope,
        config: &AutoscalerConfig,
    ) -> Result<Operation, ComputeError>;

    async fn delete_autoscaler(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    // -- Instance templates --------------------------------------------------

    async fn get_instance_template(
        &self,
        project: &str,
        name: &str,
    ) -> Result<InstanceTemplateConfig, ComputeError>;

    async fn insert_instance_template(
        &self,
        project: &str,
        config: &InstanceTemplateConfig,
    ) -> Result<Operation, ComputeError>;

    async fn delete_instance_template(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    // -- Backend services ----------------------------------------------------

    async fn get_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<BackendServiceConfig, ComputeError>;

    async fn insert_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        config: &BackendServiceConfig,
    ) -> Result<Operation, ComputeError>;

    async fn delete_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    /// Partial update of a backend service (used to swap its backend list).
    async fn patch_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
        config: &BackendServiceConfig,
    ) -> Result<Operation, ComputeError>;

    // -- Forwarding rules ----------------------------------------------------

    async fn get_forwarding_rule(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<ForwardingRuleConfig, ComputeError>;

    async fn list_forwarding_rules(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<ForwardingRuleConfig>, ComputeError>;

    async fn insert_forwarding_rule(
        &self,
        project: &str,
        scope: &Scope,
        config: &ForwardingRuleConfig,
    ) -> Result<Operation, ComputeError>;

    async fn delete_forwarding_rule(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError>;

    // -- Target pools --------------------------------------------------------

    async fn get_target_pool(
        &self,
        project: &str,
        region: &str,
        name: &str,
    ) -> Result<TargetPoolConfig, ComputeError>;

    async fn add_instances_to_target_pool(
        &self,
        project: &str,
        region: &str,
        pool: &str,
        instance_links: &[String],
    ) -> Result<Operation, ComputeError>;

    async fn remove_instances_from_target_pool(
        &self,
        project: &str,
        region: &str,
        pool: &str,
        instance_links: &[String],
    ) -> Result<Operation, ComputeError>;
}
