//! # Target Pool Migration
//!
//! The pool itself stays in place. Its standalone instances and the
//! instance groups feeding it are migrated, and membership is restored
//! after each one.

use async_trait::async_trait;
use vpcmig_core::{same_resource, InstanceStatus, ResourceKind, ResourceRef};

use super::{InstanceMigration, MigrationHandler, NetworkMigration};
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::resolver;
use crate::resources::{Instance, TargetPool};

/// Migrates everything a target pool balances across: standalone
/// instances first, then the instance groups holding the rest. The pool
/// itself is not network-bound and is never recreated.
#[derive(Debug)]
pub struct TargetPoolMigration {
    ctx: MigrationContext,
    pool: TargetPool,
    instances: Vec<InstanceMigration>,
    groups: Vec<MigrationHandler>,
}

impl TargetPoolMigration {
    pub fn new(ctx: MigrationContext, region: &str, name: &str) -> Self {
        Self {
            pool: TargetPool::new(ctx.clone(), region, name),
            ctx,
            instances: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Point a migrated group back at the pool.
    async fn reassociate(&self, handler: &MigrationHandler) -> Result<(), MigrationError> {
        match handler {
            MigrationHandler::UnmanagedGroup(group) => {
                let original = self
                    .pool
                    .original()
                    .map(|c| c.instance_links().to_vec())
                    .unwrap_or_default();
                let members: Vec<String> = group
                    .member_links()
                    .iter()
                    .filter(|m| original.iter().any(|o| same_resource(o, m)))
                    .cloned()
                    .collect();
                self.pool.add_missing_instances(&members).await
            }
            MigrationHandler::ManagedGroup(group) => {
                group.associate_target_pool(&self.pool.self_link()).await
            }
            _ => Ok(()),
        }
    }

    /// Original pool instances that exist right now.
    async fn existing_original_instances(&self) -> Result<Vec<String>, MigrationError> {
        let mut existing = Vec::new();
        let links = self
            .pool
            .original()
            .map(|c| c.instance_links().to_vec())
            .unwrap_or_default();
        for link in links {
            let Some(r) = ResourceRef::parse(&link) else {
                continue;
            };
            let Some(zone) = r.zone.as_deref() else {
                continue;
            };
            let probe = Instance::new(self.ctx.for_project(&r.project), zone, &r.name);
            if probe.status_of(&r.name).await? != InstanceStatus::NotExists {
                existing.push(link);
            }
        }
        Ok(existing)
    }
}

#[async_trait]
impl NetworkMigration for TargetPoolMigration {
    fn resource(&self) -> String {
        format!("target pool {}", self.pool.name)
    }

    fn context(&self) -> &MigrationContext {
        &self.ctx
    }

    fn self_link(&self) -> String {
        self.pool.self_link()
    }

    async fn migrate(&mut self) -> Result<(), MigrationError> {
        self.pool.capture().await?;
        let attached = self.pool.attachments().await?;

        for link in &attached.instances {
            let instance = ResourceRef::parse_as(link, ResourceKind::Instance)?;
            let zone = instance
                .zone
                .clone()
                .ok_or_else(|| MigrationError::config_shape(link.as_str(), "instance link without zone"))?;
            self.pool.remove_instances(std::slice::from_ref(link)).await?;
            let mut handler =
                InstanceMigration::new(self.ctx.for_project(&instance.project), &zone, &instance.name);
            let result = handler.migrate().await;
            let new_link = handler.self_link();
            self.instances.push(handler);
            result?;
            self.pool.add_missing_instances(&[new_link]).await?;
        }

        for link in attached
            .unmanaged_groups
            .iter()
            .chain(attached.managed_groups.iter())
        {
            let Some(mut handler) = resolver::resolve(&self.ctx, link).await? else {
                tracing::warn!(group = %link, "instance group cannot be migrated; skipping");
                continue;
            };
            let result = handler.migrate().await;
            self.groups.push(handler);
            result?;
            if let Some(handler) = self.groups.last() {
                self.reassociate(handler).await?;
            }
        }
        tracing::info!(
            target_pool = %self.pool.name,
            instances = self.instances.len(),
            groups = self.groups.len(),
            "target pool migrated"
        );
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MigrationError> {
        if self.pool.original().is_none() {
            return Ok(());
        }
        tracing::warn!(target_pool = %self.pool.name, "rolling back target pool");

        for handler in self.groups.iter_mut().rev() {
            handler.rollback().await?;
        }
        for handler in &self.groups {
            if let MigrationHandler::ManagedGroup(group) = handler {
                group.restore_target_pools().await?;
            }
        }
        for handler in self.instances.iter_mut().rev() {
            handler.rollback().await?;
        }

        let existing = self.existing_original_instances().await?;
        self.pool.add_missing_instances(&existing).await?;
        tracing::info!(target_pool = %self.pool.name, "target pool restored");
        Ok(())
    }
}
