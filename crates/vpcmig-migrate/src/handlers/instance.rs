//! # Instance Migration

use async_trait::async_trait;
use vpcmig_compute::InstanceConfig;
use vpcmig_core::InstanceStatus;

use super::{strip_output_fields, NetworkMigration};
use crate::address::{release_external_ip, reserve_static_ip};
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::network::modify_network_interface;
use crate::resources::Instance;

/// Moves one VM onto the target network by recreating it.
///
/// Forward steps: capture, resolve the external IP, rewrite the primary
/// interface on a working copy, stop, detach disks, delete, create from the
/// working copy, and re-stop if the original was `TERMINATED`.
#[derive(Debug)]
pub struct InstanceMigration {
    ctx: MigrationContext,
    instance: Instance,
    new_name: Option<String>,
    migrated: bool,
}

impl InstanceMigration {
    pub fn new(ctx: MigrationContext, zone: &str, name: &str) -> Self {
        Self {
            instance: Instance::new(ctx.clone(), zone, name),
            ctx,
            new_name: None,
            migrated: false,
        }
    }

    /// Migrate into a new instance called `new_name`.
    pub fn renamed(
        ctx: MigrationContext,
        zone: &str,
        name: &str,
        new_name: &str,
    ) -> Result<Self, MigrationError> {
        if name == new_name {
            return Err(MigrationError::UnchangedName {
                name: name.to_string(),
            });
        }
        let mut handler = Self::new(ctx, zone, name);
        handler.new_name = Some(new_name.to_string());
        Ok(handler)
    }

    fn target_name(&self) -> &str {
        self.new_name.as_deref().unwrap_or(&self.instance.name)
    }

    pub fn is_migrated(&self) -> bool {
        self.migrated
    }

    /// Working copy of the captured config, rewritten for the target network.
    async fn build_target_config(&self, original: &InstanceConfig) -> Result<InstanceConfig, MigrationError> {
        let resource = self.resource();
        let mut working = original.clone();

        if let Some(ip) = original.external_ip() {
            if self.ctx.options.preserve_external_ip {
                reserve_static_ip(&self.ctx, &self.instance.name, &self.instance.region, ip).await?;
            } else {
                tracing::warn!(
                    instance = %self.instance.name,
                    ip,
                    "external IP is not preserved; the new instance gets an ephemeral IP"
                );
                release_external_ip(&mut working);
            }
        }

        let info = self.ctx.network_info(&self.instance.region).await?;
        modify_network_interface(working.network_interfaces.as_mut(), &resource, &info)?;
        working.name = self.target_name().to_string();
        working.self_link = None;
        working.status = None;
        strip_output_fields(&mut working.extra);
        Ok(working)
    }
}

#[async_trait]
impl NetworkMigration for InstanceMigration {
    fn resource(&self) -> String {
        format!("instance {}", self.instance.name)
    }

    fn context(&self) -> &MigrationContext {
        &self.ctx
    }

    fn self_link(&self) -> String {
        self.instance.self_link_for(self.target_name())
    }

    async fn migrate(&mut self) -> Result<(), MigrationError> {
        let resource = self.resource();
        let original = self.instance.capture().await?.clone();
        if original.network_interfaces.as_ref().map_or(true, Vec::is_empty) {
            return Err(MigrationError::config_shape(resource, "no networkInterfaces"));
        }
        if original.disks.as_ref().map_or(true, Vec::is_empty) {
            return Err(MigrationError::config_shape(resource, "no disks"));
        }

        let working = self.build_target_config(&original).await?;
        let name = self.instance.name.clone();
        let original_status = self.instance.original_status().clone();

        if original_status != InstanceStatus::Terminated {
            self.instance.stop(&name).await?;
        }
        self.instance.detach_disks().await?;
        self.instance.delete(&name).await?;
        self.instance.insert(&working).await?;
        self.migrated = true;
        // Disks now belong to the new instance.
        self.instance.clear_detached();

        if original_status == InstanceStatus::Terminated {
            self.instance.stop(&working.name).await?;
        }
        tracing::info!(instance = %name, new_name = %working.name, "instance migrated");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MigrationError> {
        if self.instance.original().is_none() {
            return Ok(());
        }
        let name = self.instance.name.clone();
        let target = self.target_name().to_string();
        tracing::warn!(instance = %name, "rolling back instance");

        let remove_target = if target != name {
            self.instance.status_of(&target).await? != InstanceStatus::NotExists
        } else {
            self.migrated
        };
        if remove_target {
            self.instance.release_disks_of(&target).await?;
            self.instance.delete(&target).await?;
        }
        self.migrated = false;

        match self.instance.status_of(&name).await? {
            InstanceStatus::NotExists => {
                self.instance.recreate_original().await?;
                self.instance.clear_detached();
                if *self.instance.original_status() == InstanceStatus::Terminated {
                    self.instance.stop(&name).await?;
                }
            }
            current => {
                self.instance.reattach_disks().await?;
                if *self.instance.original_status() == InstanceStatus::Running
                    && current != InstanceStatus::Running
                {
                    self.instance.start(&name).await?;
                }
            }
        }
        tracing::info!(instance = %name, "instance restored");
        Ok(())
    }
}
