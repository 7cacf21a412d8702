//! # Managed Instance Group Migration
//!
//! Zonal and regional managers are recreated against a network-rewritten
//! copy of their instance template. Autoscalers are removed around the
//! swap and reinserted after it.

use async_trait::async_trait;
use vpcmig_compute::{AutoscalerConfig, InstanceGroupManagerConfig};
use vpcmig_core::{same_resource, Scope};

use super::{strip_output_fields, NetworkMigration};
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::resources::{InstanceTemplate, ManagedInstanceGroup};

/// Moves a zonal or regional managed group by pointing a recreated manager
/// at a network-rewritten copy of its instance template.
///
/// The original template is only ever read. Rollback restores the
/// original manager config and deletes the copy.
#[derive(Debug)]
pub struct ManagedGroupMigration {
    ctx: MigrationContext,
    group: ManagedInstanceGroup,
    new_template: Option<InstanceTemplate>,
    migrated: bool,
}

fn insert_body(config: &InstanceGroupManagerConfig) -> InstanceGroupManagerConfig {
    let mut body = config.clone();
    body.self_link = None;
    body.instance_group = None;
    strip_output_fields(&mut body.extra);
    body.extra.remove("currentActions");
    body
}

fn autoscaler_body(config: &AutoscalerConfig) -> AutoscalerConfig {
    let mut body = config.clone();
    body.self_link = None;
    strip_output_fields(&mut body.extra);
    body
}

impl ManagedGroupMigration {
    pub fn new(ctx: MigrationContext, scope: Scope, name: &str) -> Self {
        Self {
            group: ManagedInstanceGroup::new(ctx.clone(), scope, name),
            ctx,
            new_template: None,
            migrated: false,
        }
    }

    /// Make sure the manager feeds `pool`.
    pub async fn associate_target_pool(&self, pool: &str) -> Result<(), MigrationError> {
        let Some(current) = self.group.current().await? else {
            return Err(MigrationError::config_shape(
                format!("instance group {}", self.group.name),
                "manager disappeared",
            ));
        };
        let mut pools = current.target_pools.unwrap_or_default();
        if pools.iter().any(|p| same_resource(p, pool)) {
            return Ok(());
        }
        pools.push(pool.to_string());
        self.group.set_target_pools(&pools).await
    }

    /// Put the captured target-pool list back if it drifted.
    pub async fn restore_target_pools(&self) -> Result<(), MigrationError> {
        let Some(original) = self.group.original() else {
            return Ok(());
        };
        let Some(current) = self.group.current().await? else {
            return Ok(());
        };
        let wanted = original.target_pools.clone().unwrap_or_default();
        let have = current.target_pools.unwrap_or_default();
        let same = wanted.len() == have.len()
            && wanted.iter().all(|w| have.iter().any(|h| same_resource(w, h)));
        if same {
            return Ok(());
        }
        self.group.set_target_pools(&wanted).await
    }
}

#[async_trait]
impl NetworkMigration for ManagedGroupMigration {
    fn resource(&self) -> String {
        format!("managed instance group {}", self.group.name)
    }

    fn context(&self) -> &MigrationContext {
        &self.ctx
    }

    fn self_link(&self) -> String {
        self.group.self_link()
    }

    async fn migrate(&mut self) -> Result<(), MigrationError> {
        let resource = self.resource();
        let original = self.group.capture().await?.clone();
        let autoscaler = self.group.autoscaler().cloned();

        if self.ctx.options.preserve_external_ip {
            self.ctx.confirm(&format!(
                "External IPs of {resource} members cannot be preserved; \
                 recreated instances get ephemeral IPs. Continue?"
            ))?;
        }
        if let Some(autoscaler) = &autoscaler {
            self.ctx.confirm(&format!(
                "Autoscaler {} of {resource} will be deleted and recreated. Continue?",
                autoscaler.name
            ))?;
        }

        let template_link = original
            .instance_template
            .clone()
            .ok_or_else(|| MigrationError::config_shape(&resource, "no instanceTemplate"))?;
        let template = InstanceTemplate::fetch(self.ctx.clone(), &template_link).await?;
        let info = self.ctx.network_info(&self.group.region()).await?;
        let copy = template.copy_with_network(&info)?;
        copy.insert().await?;
        let copy_link = copy.self_link();
        self.new_template = Some(copy);

        let mut working = insert_body(&original);
        working.instance_template = Some(copy_link);

        if let Some(autoscaler) = &autoscaler {
            self.group.delete_autoscaler(&autoscaler.name).await?;
        }
        self.group.delete().await?;
        self.group.insert(&working).await?;
        self.migrated = true;
        if let Some(autoscaler) = &autoscaler {
            self.group.insert_autoscaler(&autoscaler_body(autoscaler)).await?;
        }
        tracing::info!(group = %self.group.name, template = %working.instance_template.as_deref().unwrap_or_default(), "managed instance group migrated");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MigrationError> {
        let Some(original) = self.group.original().cloned() else {
            return Ok(());
        };
        tracing::warn!(group = %self.group.name, "rolling back managed instance group");

        match self.group.current().await? {
            None => self.group.insert(&insert_body(&original)).await?,
            Some(current) => {
                let on_original_template = match (&current.instance_template, &original.instance_template) {
                    (Some(a), Some(b)) => same_resource(a, b),
                    (a, b) => a == b,
                };
                if self.migrated || !on_original_template {
                    if let Some(autoscaler) = self.group.find_autoscaler().await? {
                        self.group.delete_autoscaler(&autoscaler.name).await?;
                    }
                    self.group.delete().await?;
                    self.group.insert(&insert_body(&original)).await?;
                }
            }
        }
        self.migrated = false;

        if let Some(autoscaler) = self.group.autoscaler().cloned() {
            if self.group.find_autoscaler().await?.is_none() {
                self.group.insert_autoscaler(&autoscaler_body(&autoscaler)).await?;
            }
        }

        if let Some(copy) = self.new_template.take() {
            if let Err(e) = copy.delete().await {
                tracing::warn!(template = %copy.name, error = %e, "could not delete template copy");
            }
        }
        tracing::info!(group = %self.group.name, "managed instance group restored");
        Ok(())
    }
}
