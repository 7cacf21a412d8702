//! # Instance Template Accessor
//!
//! Templates are fetched and copied. Only copies are inserted or deleted.

use vpcmig_compute::InstanceTemplateConfig;
use vpcmig_core::{unique_name_now, ResourceKind, ResourceRef, Scope};

use super::link;
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::network::{modify_instance_template_with_new_network, NetworkInfo};

/// An instance template body, either fetched or a renamed copy awaiting
/// insertion. The fetched original is never written back.
#[derive(Debug, Clone)]
pub struct InstanceTemplate {
    ctx: MigrationContext,
    pub name: String,
    pub body: InstanceTemplateConfig,
    pub is_new_copy: bool,
}

impl InstanceTemplate {
    /// Fetch the template `reference` points at and record it.
    pub async fn fetch(ctx: MigrationContext, reference: &str) -> Result<Self, MigrationError> {
        let template = ResourceRef::parse_as(reference, ResourceKind::InstanceTemplate)?;
        let ctx = ctx.for_project(&template.project);
        let body = ctx
            .api
            .get_instance_template(&ctx.project, &template.name)
            .await?;
        ctx.backup
            .record(ResourceKind::InstanceTemplate, reference, &body)?;
        Ok(Self {
            ctx,
            name: template.name,
            body,
            is_new_copy: false,
        })
    }

    pub fn self_link(&self) -> String {
        link(
            &self.ctx.project,
            &Scope::Global,
            ResourceKind::InstanceTemplate,
            &self.name,
        )
    }

    /// Uniquely named deep copy with interfaces moved to `info`.
    pub fn copy_with_network(&self, info: &NetworkInfo) -> Result<Self, MigrationError> {
        let name = unique_name_now(&self.name);
        let body = modify_instance_template_with_new_network(&self.body, info, &name)?;
        Ok(Self {
            ctx: self.ctx.clone(),
            name,
            body,
            is_new_copy: true,
        })
    }

    pub async fn insert(&self) -> Result<(), MigrationError> {
        tracing::info!(template = %self.name, "creating instance template");
        let op = self
            .ctx
            .api
            .insert_instance_template(&self.ctx.project, &self.body)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<(), MigrationError> {
        tracing::info!(template = %self.name, "deleting instance template");
        let op = self
            .ctx
            .api
            .delete_instance_template(&self.ctx.project, &self.name)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }
}
