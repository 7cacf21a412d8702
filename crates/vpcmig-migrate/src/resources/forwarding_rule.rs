//! # Forwarding Rule Accessor

use vpcmig_compute::ForwardingRuleConfig;
use vpcmig_core::{ResourceKind, Scope};

use super::link;
use crate::context::MigrationContext;
use crate::error::MigrationError;

/// Accessor for a regional forwarding rule.
#[derive(Debug, Clone)]
pub struct ForwardingRule {
    ctx: MigrationContext,
    pub name: String,
    pub region: String,
    original: Option<ForwardingRuleConfig>,
}

impl ForwardingRule {
    pub fn new(ctx: MigrationContext, region: &str, name: &str) -> Self {
        Self {
            ctx,
            name: name.to_string(),
            region: region.to_string(),
            original: None,
        }
    }

    fn scope(&self) -> Scope {
        Scope::Region(self.region.clone())
    }

    pub fn self_link(&self) -> String {
        link(&self.ctx.project, &self.scope(), ResourceKind::ForwardingRule, &self.name)
    }

    pub async fn capture(&mut self) -> Result<&ForwardingRuleConfig, MigrationError> {
        if self.original.is_none() {
            let config = self
                .ctx
                .api
                .get_forwarding_rule(&self.ctx.project, &self.scope(), &self.name)
                .await?;
            self.ctx
                .backup
                .record(ResourceKind::ForwardingRule, &self.self_link(), &config)?;
            tracing::info!(forwarding_rule = %self.name, region = %self.region, "captured forwarding rule");
            self.original = Some(config);
        }
        self.original
            .as_ref()
            .ok_or_else(|| MigrationError::config_shape(&self.name, "forwarding rule config missing"))
    }

    pub fn original(&self) -> Option<&ForwardingRuleConfig> {
        self.original.as_ref()
    }

    pub async fn exists(&self) -> Result<bool, MigrationError> {
        match self
            .ctx
            .api
            .get_forwarding_rule(&self.ctx.project, &self.scope(), &self.name)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self) -> Result<(), MigrationError> {
        tracing::info!(forwarding_rule = %self.name, "deleting forwarding rule");
        let op = self
            .ctx
            .api
            .delete_forwarding_rule(&self.ctx.project, &self.scope(), &self.name)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn insert(&self, config: &ForwardingRuleConfig) -> Result<(), MigrationError> {
        tracing::info!(forwarding_rule = %self.name, "creating forwarding rule");
        let op = self
            .ctx
            .api
            .insert_forwarding_rule(&self.ctx.project, &self.scope(), config)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }
}
