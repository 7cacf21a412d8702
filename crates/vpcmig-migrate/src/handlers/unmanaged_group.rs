//! # Unmanaged Instance Group Migration
//!
//! Members move first under their own names; the group is then recreated
//! on the target network and the members re-added.

use async_trait::async_trait;
use vpcmig_compute::InstanceGroupConfig;
use vpcmig_core::{GroupStatus, ResourceKind, ResourceRef};

use super::{strip_output_fields, InstanceMigration, NetworkMigration};
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::resources::UnmanagedInstanceGroup;

fn insert_body(config: &InstanceGroupConfig) -> InstanceGroupConfig {
    let mut body = config.clone();
    body.self_link = None;
    strip_output_fields(&mut body.extra);
    body.extra.remove("size");
    body
}

/// Moves an unmanaged group and every member instance.
///
/// Members are migrated first (keeping their names), then the group is
/// recreated on the target network and the members re-added.
#[derive(Debug)]
pub struct UnmanagedGroupMigration {
    ctx: MigrationContext,
    group: UnmanagedInstanceGroup,
    instances: Vec<InstanceMigration>,
    new_created: bool,
}

impl UnmanagedGroupMigration {
    pub fn new(ctx: MigrationContext, zone: &str, name: &str) -> Self {
        Self {
            group: UnmanagedInstanceGroup::new(ctx.clone(), zone, name),
            ctx,
            instances: Vec::new(),
            new_created: false,
        }
    }

    /// Member self-links captured before migration.
    pub fn member_links(&self) -> &[String] {
        self.group.members()
    }

    async fn add_members(&self) -> Result<(), MigrationError> {
        self.group
            .add_instances(self.group.members())
            .await
            .map_err(|e| MigrationError::AttachInstance {
                group: self.group.name.clone(),
                source: Box::new(e),
            })
    }
}

#[async_trait]
impl NetworkMigration for UnmanagedGroupMigration {
    fn resource(&self) -> String {
        format!("instance group {}", self.group.name)
    }

    fn context(&self) -> &MigrationContext {
        &self.ctx
    }

    fn self_link(&self) -> String {
        self.group.self_link()
    }

    async fn migrate(&mut self) -> Result<(), MigrationError> {
        let original = self.group.capture().await?.clone();
        let info = self.ctx.network_info(&self.group.region).await?;

        for member in self.group.members().to_vec() {
            let instance = ResourceRef::parse_as(&member, ResourceKind::Instance)?;
            let zone = instance.zone.as_deref().unwrap_or(&self.group.zone);
            let mut handler =
                InstanceMigration::new(self.ctx.for_project(&instance.project), zone, &instance.name);
            let result = handler.migrate().await;
            self.instances.push(handler);
            result?;
        }

        let mut working = insert_body(&original);
        working.network = Some(info.network);
        working.subnetwork = info.subnetwork;

        self.group.delete().await?;
        self.group.insert(&working).await?;
        self.new_created = true;
        self.add_members().await?;
        tracing::info!(group = %self.group.name, members = self.instances.len(), "instance group migrated");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MigrationError> {
        let Some(original) = self.group.original().cloned() else {
            return Ok(());
        };
        tracing::warn!(group = %self.group.name, "rolling back instance group");

        if self.new_created && self.group.status().await? == GroupStatus::Exists {
            self.group.delete().await?;
        }
        self.new_created = false;

        for handler in self.instances.iter_mut().rev() {
            handler.rollback().await?;
        }

        if self.group.status().await? == GroupStatus::NotExists {
            self.group.insert(&insert_body(&original)).await?;
        }
        self.add_members().await?;
        tracing::info!(group = %self.group.name, "instance group restored");
        Ok(())
    }
}
