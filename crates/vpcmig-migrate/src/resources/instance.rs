//! # Instance Accessor
//!
//! Power state, disk attachment, and recreation of a single VM.

use vpcmig_compute::{AttachedDisk, InstanceConfig};
use vpcmig_core::{InstanceStatus, ResourceKind, Scope};

use super::{link, region_for_zone};
use crate::address::release_external_ip;
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::handlers::strip_output_fields;

/// Accessor for one zonal VM instance.
#[derive(Debug, Clone)]
pub struct Instance {
    ctx: MigrationContext,
    pub name: String,
    pub zone: String,
    pub region: String,
    original: Option<InstanceConfig>,
    original_status: InstanceStatus,
    detached: Vec<AttachedDisk>,
}

/// Request body for re-attaching a disk: identity and attachment flags only.
fn attach_body(disk: &AttachedDisk) -> AttachedDisk {
    AttachedDisk {
        device_name: disk.device_name.clone(),
        source: disk.source.clone(),
        boot: disk.boot,
        mode: disk.mode.clone(),
        auto_delete: disk.auto_delete,
        extra: Default::default(),
    }
}

impl Instance {
    pub fn new(ctx: MigrationContext, zone: &str, name: &str) -> Self {
        Self {
            ctx,
            name: name.to_string(),
            zone: zone.to_string(),
            region: region_for_zone(zone),
            original: None,
            original_status: InstanceStatus::NotExists,
            detached: Vec::new(),
        }
    }

    /// Self-link of the instance named `name` in this instance's zone.
    pub fn self_link_for(&self, name: &str) -> String {
        link(
            &self.ctx.project,
            &Scope::Zone(self.zone.clone()),
            ResourceKind::Instance,
            name,
        )
    }

    pub fn self_link(&self) -> String {
        self.self_link_for(&self.name)
    }

    /// Fetch and record the original config. Later calls are no-ops.
    pub async fn capture(&mut self) -> Result<&InstanceConfig, MigrationError> {
        if self.original.is_none() {
            let config = self
                .ctx
                .api
                .get_instance(&self.ctx.project, &self.zone, &self.name)
                .await?;
            self.ctx
                .backup
                .record(ResourceKind::Instance, &self.self_link(), &config)?;
            self.original_status = InstanceStatus::from_api(config.status.as_deref());
            tracing::info!(instance = %self.name, zone = %self.zone, status = %self.original_status, "captured instance config");
            self.original = Some(config);
        }
        self.original
            .as_ref()
            .ok_or_else(|| MigrationError::config_shape(&self.name, "instance config missing"))
    }

    pub fn original(&self) -> Option<&InstanceConfig> {
        self.original.as_ref()
    }

    /// Power state observed at capture time.
    pub fn original_status(&self) -> &InstanceStatus {
        &self.original_status
    }

    /// Current power state of the instance named `name`.
    pub async fn status_of(&self, name: &str) -> Result<InstanceStatus, MigrationError> {
        match self.ctx.api.get_instance(&self.ctx.project, &self.zone, name).await {
            Ok(config) => Ok(InstanceStatus::from_api(config.status.as_deref())),
            Err(e) if e.is_not_found() => Ok(InstanceStatus::NotExists),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn stop(&self, name: &str) -> Result<(), MigrationError> {
        tracing::info!(instance = name, zone = %self.zone, "stopping instance");
        let op = self.ctx.api.stop_instance(&self.ctx.project, &self.zone, name).await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn start(&self, name: &str) -> Result<(), MigrationError> {
        tracing::info!(instance = name, zone = %self.zone, "starting instance");
        let op = self.ctx.api.start_instance(&self.ctx.project, &self.zone, name).await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<(), MigrationError> {
        tracing::info!(instance = name, zone = %self.zone, "deleting instance");
        let op = self
            .ctx
            .api
            .delete_instance(&self.ctx.project, &self.zone, name)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn insert(&self, config: &InstanceConfig) -> Result<(), MigrationError> {
        tracing::info!(instance = %config.name, zone = %self.zone, "creating instance");
        let op = self
            .ctx
            .api
            .insert_instance(&self.ctx.project, &self.zone, config)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    /// Detach every disk of the original config, remembering each one.
    pub async fn detach_disks(&mut self) -> Result<(), MigrationError> {
        let disks = self
            .original
            .as_ref()
            .and_then(|c| c.disks.clone())
            .ok_or_else(|| MigrationError::config_shape(&self.name, "no disks"))?;
        for disk in disks {
            let device = disk
                .device_name
                .clone()
                .ok_or_else(|| MigrationError::config_shape(&self.name, "disk without deviceName"))?;
            tracing::info!(instance = %self.name, device = %device, "detaching disk");
            let op = self
                .ctx
                .api
                .detach_disk(&self.ctx.project, &self.zone, &self.name, &device)
                .await?;
            self.ctx.wait(op).await?;
            self.detached.push(disk);
        }
        Ok(())
    }

    /// Re-attach the disks detached so far, in their original order.
    pub async fn reattach_disks(&mut self) -> Result<(), MigrationError> {
        for disk in std::mem::take(&mut self.detached) {
            tracing::info!(instance = %self.name, device = ?disk.device_name, "re-attaching disk");
            let op = self
                .ctx
                .api
                .attach_disk(&self.ctx.project, &self.zone, &self.name, &attach_body(&disk))
                .await?;
            self.ctx.wait(op).await?;
        }
        Ok(())
    }

    /// Detach every disk currently attached to the instance named `name`
    /// so deleting it cannot take the disks with it.
    pub async fn release_disks_of(&self, name: &str) -> Result<(), MigrationError> {
        let config = self.ctx.api.get_instance(&self.ctx.project, &self.zone, name).await?;
        for device in config.disks.iter().flatten().filter_map(|d| d.device_name.as_deref()) {
            tracing::info!(instance = name, device, "detaching disk before delete");
            let op = self
                .ctx
                .api
                .detach_disk(&self.ctx.project, &self.zone, name, device)
                .await?;
            self.ctx.wait(op).await?;
        }
        Ok(())
    }

    /// Forget detached disks once they belong to a recreated instance.
    pub fn clear_detached(&mut self) {
        self.detached.clear();
    }

    /// Recreate the original instance. A reserved IP the provider rejects is
    /// dropped and creation retried with an ephemeral one.
    pub async fn recreate_original(&self) -> Result<(), MigrationError> {
        let original = self
            .original
            .as_ref()
            .ok_or_else(|| MigrationError::config_shape(&self.name, "no captured config"))?;
        let mut body = original.clone();
        body.self_link = None;
        body.status = None;
        strip_output_fields(&mut body.extra);
        match self.insert(&body).await {
            Err(e) if e.is_invalid_address() => {
                tracing::warn!(
                    instance = %self.name,
                    error = %e,
                    "original external IP rejected; recreating with an ephemeral IP"
                );
                let mut ephemeral = body.clone();
                release_external_ip(&mut ephemeral);
                self.insert(&ephemeral).await
            }
            other => other,
        }
    }
}
