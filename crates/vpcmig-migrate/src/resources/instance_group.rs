//! # Instance Group Accessors
//!
//! Unmanaged groups with their member lists, and managed groups with their
//! manager and autoscaler.

use vpcmig_compute::{AutoscalerConfig, InstanceGroupConfig, InstanceGroupManagerConfig};
use vpcmig_core::{same_resource, GroupStatus, ResourceKind, Scope};

use super::{link, region_for_zone};
use crate::context::MigrationContext;
use crate::error::MigrationError;

/// Accessor for a zonal instance group with explicit membership.
#[derive(Debug, Clone)]
pub struct UnmanagedInstanceGroup {
    ctx: MigrationContext,
    pub name: String,
    pub zone: String,
    pub region: String,
    original: Option<InstanceGroupConfig>,
    members: Vec<String>,
}

impl UnmanagedInstanceGroup {
    pub fn new(ctx: MigrationContext, zone: &str, name: &str) -> Self {
        Self {
            ctx,
            name: name.to_string(),
            zone: zone.to_string(),
            region: region_for_zone(zone),
            original: None,
            members: Vec::new(),
        }
    }

    fn scope(&self) -> Scope {
        Scope::Zone(self.zone.clone())
    }

    pub fn self_link(&self) -> String {
        link(&self.ctx.project, &self.scope(), ResourceKind::InstanceGroup, &self.name)
    }

    /// Fetch and record the group config and its member list.
    pub async fn capture(&mut self) -> Result<&InstanceGroupConfig, MigrationError> {
        if self.original.is_none() {
            let config = self
                .ctx
                .api
                .get_instance_group(&self.ctx.project, &self.scope(), &self.name)
                .await?;
            self.members = self
                .ctx
                .api
                .list_group_instances(&self.ctx.project, &self.zone, &self.name)
                .await?;
            self.ctx
                .backup
                .record(ResourceKind::InstanceGroup, &self.self_link(), &config)?;
            tracing::info!(group = %self.name, zone = %self.zone, members = self.members.len(), "captured instance group");
            self.original = Some(config);
        }
        self.original
            .as_ref()
            .ok_or_else(|| MigrationError::config_shape(&self.name, "instance group config missing"))
    }

    pub fn original(&self) -> Option<&InstanceGroupConfig> {
        self.original.as_ref()
    }

    /// Member self-links observed at capture time.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub async fn status(&self) -> Result<GroupStatus, MigrationError> {
        match self
            .ctx
            .api
            .get_instance_group(&self.ctx.project, &self.scope(), &self.name)
            .await
        {
            Ok(_) => Ok(GroupStatus::Exists),
            Err(e) if e.is_not_found() => Ok(GroupStatus::NotExists),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self) -> Result<(), MigrationError> {
        tracing::info!(group = %self.name, zone = %self.zone, "deleting instance group");
        let op = self
            .ctx
            .api
            .delete_instance_group(&self.ctx.project, &self.zone, &self.name)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn insert(&self, config: &InstanceGroupConfig) -> Result<(), MigrationError> {
        tracing::info!(group = %self.name, zone = %self.zone, "creating instance group");
        let op = self
            .ctx
            .api
            .insert_instance_group(&self.ctx.project, &self.zone, config)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    /// Add the instances in `links` that are not members yet.
    pub async fn add_instances(&self, links: &[String]) -> Result<(), MigrationError> {
        let current = self
            .ctx
            .api
            .list_group_instances(&self.ctx.project, &self.zone, &self.name)
            .await?;
        let missing: Vec<String> = links
            .iter()
            .filter(|l| !current.iter().any(|m| same_resource(m, l)))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        tracing::info!(group = %self.name, count = missing.len(), "adding instances to group");
        let op = self
            .ctx
            .api
            .add_instances_to_group(&self.ctx.project, &self.zone, &self.name, &missing)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }
}

/// Accessor for a zonal or regional instance-group manager and the
/// autoscaler attached to it, if any.
#[derive(Debug, Clone)]
pub struct ManagedInstanceGroup {
    ctx: MigrationContext,
    pub name: String,
    pub scope: Scope,
    original: Option<InstanceGroupManagerConfig>,
    autoscaler: Option<AutoscalerConfig>,
}

impl ManagedInstanceGroup {
    pub fn new(ctx: MigrationContext, scope: Scope, name: &str) -> Self {
        Self {
            ctx,
            name: name.to_string(),
            scope,
            original: None,
            autoscaler: None,
        }
    }

    /// Region the group's instances live in.
    pub fn region(&self) -> String {
        match &self.scope {
            Scope::Zone(zone) => region_for_zone(zone),
            Scope::Region(region) => region.clone(),
            Scope::Global => String::new(),
        }
    }

    pub fn self_link(&self) -> String {
        link(&self.ctx.project, &self.scope, ResourceKind::InstanceGroup, &self.name)
    }

    pub fn manager_link(&self) -> String {
        link(
            &self.ctx.project,
            &self.scope,
            ResourceKind::InstanceGroupManager,
            &self.name,
        )
    }

    /// Fetch and record the manager and its autoscaler.
    pub async fn capture(&mut self) -> Result<&InstanceGroupManagerConfig, MigrationError> {
        if self.original.is_none() {
            let config = self
                .ctx
                .api
                .get_instance_group_manager(&self.ctx.project, &self.scope, &self.name)
                .await?;
            self.ctx
                .backup
                .record(ResourceKind::InstanceGroupManager, &self.manager_link(), &config)?;
            self.autoscaler = self.find_autoscaler().await?;
            if let Some(autoscaler) = &self.autoscaler {
                let autoscaler_link = link(
                    &self.ctx.project,
                    &self.scope,
                    ResourceKind::Autoscaler,
                    &autoscaler.name,
                );
                self.ctx
                    .backup
                    .record(ResourceKind::Autoscaler, &autoscaler_link, autoscaler)?;
            }
            tracing::info!(
                group = %self.name,
                scope = %self.scope,
                autoscaled = self.autoscaler.is_some(),
                "captured managed instance group"
            );
            self.original = Some(config);
        }
        self.original
            .as_ref()
            .ok_or_else(|| MigrationError::config_shape(&self.name, "manager config missing"))
    }

    pub fn original(&self) -> Option<&InstanceGroupManagerConfig> {
        self.original.as_ref()
    }

    /// Autoscaler captured with the manager.
    pub fn autoscaler(&self) -> Option<&AutoscalerConfig> {
        self.autoscaler.as_ref()
    }

    /// The autoscaler currently targeting this manager.
    pub async fn find_autoscaler(&self) -> Result<Option<AutoscalerConfig>, MigrationError> {
        let manager = self.manager_link();
        let autoscalers = self
            .ctx
            .api
            .list_autoscalers(&self.ctx.project, &self.scope)
            .await?;
        Ok(autoscalers.into_iter().find(|a| {
            a.target
                .as_deref()
                .is_some_and(|t| same_resource(t, &manager))
        }))
    }

    /// Current manager config, `None` when it does not exist.
    pub async fn current(&self) -> Result<Option<InstanceGroupManagerConfig>, MigrationError> {
        match self
            .ctx
            .api
            .get_instance_group_manager(&self.ctx.project, &self.scope, &self.name)
            .await
        {
            Ok(config) => Ok(Some(config)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self) -> Result<(), MigrationError> {
        tracing::info!(group = %self.name, scope = %self.scope, "deleting managed instance group");
        let op = self
            .ctx
            .api
            .delete_instance_group_manager(&self.ctx.project, &self.scope, &self.name)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn insert(&self, config: &InstanceGroupManagerConfig) -> Result<(), MigrationError> {
        tracing::info!(group = %self.name, scope = %self.scope, "creating managed instance group");
        let op = self
            .ctx
            .api
            .insert_instance_group_manager(&self.ctx.project, &self.scope, config)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn delete_autoscaler(&self, name: &str) -> Result<(), MigrationError> {
        tracing::info!(group = %self.name, autoscaler = name, "deleting autoscaler");
        let op = self
            .ctx
            .api
            .delete_autoscaler(&self.ctx.project, &self.scope, name)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn insert_autoscaler(&self, config: &AutoscalerConfig) -> Result<(), MigrationError> {
        tracing::info!(group = %self.name, autoscaler = %config.name, "creating autoscaler");
        let op = self
            .ctx
            .api
            .insert_autoscaler(&self.ctx.project, &self.scope, config)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn set_target_pools(&self, pools: &[String]) -> Result<(), MigrationError> {
        tracing::info!(group = %self.name, pools = pools.len(), "setting target pools");
        let op = self
            .ctx
            .api
            .set_target_pools(&self.ctx.project, &self.scope, &self.name, pools)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }
}
