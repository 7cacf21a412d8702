//! # Target Pool Accessor
//!
//! Captures the pool and works out which of its instances are standalone
//! and which belong to an instance group.

use std::collections::BTreeSet;

use vpcmig_compute::TargetPoolConfig;
use vpcmig_core::{same_resource, ResourceKind, ResourceRef, Scope};

use super::link;
use crate::context::MigrationContext;
use crate::error::MigrationError;

/// What a target pool's instance list resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetPoolAttachments {
    /// Instances in no instance group.
    pub instances: Vec<String>,
    /// Unmanaged groups holding at least one pool instance.
    pub unmanaged_groups: Vec<String>,
    /// Managed groups whose manager feeds this pool.
    pub managed_groups: Vec<String>,
}

/// Accessor for a regional target pool.
#[derive(Debug, Clone)]
pub struct TargetPool {
    ctx: MigrationContext,
    pub name: String,
    pub region: String,
    original: Option<TargetPoolConfig>,
}

impl TargetPool {
    pub fn new(ctx: MigrationContext, region: &str, name: &str) -> Self {
        Self {
            ctx,
            name: name.to_string(),
            region: region.to_string(),
            original: None,
        }
    }

    pub fn self_link(&self) -> String {
        link(
            &self.ctx.project,
            &Scope::Region(self.region.clone()),
            ResourceKind::TargetPool,
            &self.name,
        )
    }

    pub async fn capture(&mut self) -> Result<&TargetPoolConfig, MigrationError> {
        if self.original.is_none() {
            let config = self.current().await?;
            self.ctx
                .backup
                .record(ResourceKind::TargetPool, &self.self_link(), &config)?;
            tracing::info!(
                target_pool = %self.name,
                region = %self.region,
                instances = config.instance_links().len(),
                "captured target pool"
            );
            self.original = Some(config);
        }
        self.original
            .as_ref()
            .ok_or_else(|| MigrationError::config_shape(&self.name, "target pool config missing"))
    }

    pub fn original(&self) -> Option<&TargetPoolConfig> {
        self.original.as_ref()
    }

    pub async fn current(&self) -> Result<TargetPoolConfig, MigrationError> {
        Ok(self
            .ctx
            .api
            .get_target_pool(&self.ctx.project, &self.region, &self.name)
            .await?)
    }

    /// Add the instances in `links` that the pool does not list yet.
    pub async fn add_missing_instances(&self, links: &[String]) -> Result<(), MigrationError> {
        let current = self.current().await?;
        let missing: Vec<String> = links
            .iter()
            .filter(|l| !current.instance_links().iter().any(|m| same_resource(m, l)))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        tracing::info!(target_pool = %self.name, count = missing.len(), "adding instances to target pool");
        let op = self
            .ctx
            .api
            .add_instances_to_target_pool(&self.ctx.project, &self.region, &self.name, &missing)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn remove_instances(&self, links: &[String]) -> Result<(), MigrationError> {
        tracing::info!(target_pool = %self.name, count = links.len(), "removing instances from target pool");
        let op = self
            .ctx
            .api
            .remove_instances_from_target_pool(&self.ctx.project, &self.region, &self.name, links)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    /// Sort the captured instance list into standalone instances and the
    /// instance groups they belong to. Regional managers feeding the pool
    /// count as groups even though their instances live in several zones.
    pub async fn attachments(&self) -> Result<TargetPoolAttachments, MigrationError> {
        let pool_link = self.self_link();
        let pool_instances = self
            .original
            .as_ref()
            .map(|c| c.instance_links().to_vec())
            .unwrap_or_default();

        let zones: BTreeSet<String> = pool_instances
            .iter()
            .filter_map(|l| ResourceRef::parse(l).and_then(|r| r.zone))
            .collect();

        let mut found = TargetPoolAttachments::default();
        let mut grouped: Vec<String> = Vec::new();

        let region = Scope::Region(self.region.clone());
        let managers = self
            .ctx
            .api
            .list_instance_group_managers(&self.ctx.project, &region)
            .await?;
        for manager in managers {
            let feeds_pool = manager
                .target_pools
                .iter()
                .flatten()
                .any(|p| same_resource(p, &pool_link));
            if !feeds_pool {
                continue;
            }
            let members = self
                .ctx
                .api
                .list_managed_instances(&self.ctx.project, &region, &manager.name)
                .await?;
            found.managed_groups.push(
                link(&self.ctx.project, &region, ResourceKind::InstanceGroup, &manager.name),
            );
            grouped.extend(members);
        }

        for zone in &zones {
            let scope = Scope::Zone(zone.clone());
            let groups = self.ctx.api.list_instance_groups(&self.ctx.project, zone).await?;
            for group in groups {
                let group_link = group.self_link.clone().unwrap_or_else(|| {
                    link(&self.ctx.project, &scope, ResourceKind::InstanceGroup, &group.name)
                });
                let members = self
                    .ctx
                    .api
                    .list_group_instances(&self.ctx.project, zone, &group.name)
                    .await?;
                if group.is_managed() {
                    let manager = self
                        .ctx
                        .api
                        .get_instance_group_manager(&self.ctx.project, &scope, &group.name)
                        .await?;
                    let feeds_pool = manager
                        .target_pools
                        .iter()
                        .flatten()
                        .any(|p| same_resource(p, &pool_link));
                    if feeds_pool {
                        found.managed_groups.push(group_link);
                        grouped.extend(members);
                    }
                } else if members
                    .iter()
                    .any(|m| pool_instances.iter().any(|p| same_resource(m, p)))
                {
                    found.unmanaged_groups.push(group_link);
                    grouped.extend(members);
                }
            }
        }

        found.instances = pool_instances
            .into_iter()
            .filter(|l| !grouped.iter().any(|g| same_resource(g, l)))
            .collect();
        tracing::info!(
            target_pool = %self.name,
            instances = found.instances.len(),
            unmanaged_groups = found.unmanaged_groups.len(),
            managed_groups = found.managed_groups.len(),
            "resolved target pool attachments"
        );
        Ok(found)
    }
}
