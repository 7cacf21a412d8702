//! # Backend Service Accessor

use vpcmig_compute::{Backend, BackendServiceConfig, ForwardingRuleConfig};
use vpcmig_core::{same_resource, ResourceKind, Scope};

use super::link;
use crate::context::MigrationContext;
use crate::error::MigrationError;

/// Accessor for a global or regional backend service.
#[derive(Debug, Clone)]
pub struct BackendService {
    ctx: MigrationContext,
    pub name: String,
    pub scope: Scope,
    original: Option<BackendServiceConfig>,
}

impl BackendService {
    pub fn new(ctx: MigrationContext, scope: Scope, name: &str) -> Self {
        Self {
            ctx,
            name: name.to_string(),
            scope,
            original: None,
        }
    }

    pub fn self_link(&self) -> String {
        link(&self.ctx.project, &self.scope, ResourceKind::BackendService, &self.name)
    }

    pub async fn capture(&mut self) -> Result<&BackendServiceConfig, MigrationError> {
        if self.original.is_none() {
            let config = self
                .ctx
                .api
                .get_backend_service(&self.ctx.project, &self.scope, &self.name)
                .await?;
            self.ctx
                .backup
                .record(ResourceKind::BackendService, &self.self_link(), &config)?;
            tracing::info!(
                backend_service = %self.name,
                scope = %self.scope,
                backends = config.backend_list().len(),
                "captured backend service"
            );
            self.original = Some(config);
        }
        self.original
            .as_ref()
            .ok_or_else(|| MigrationError::config_shape(&self.name, "backend service config missing"))
    }

    pub fn original(&self) -> Option<&BackendServiceConfig> {
        self.original.as_ref()
    }

    pub async fn exists(&self) -> Result<bool, MigrationError> {
        match self
            .ctx
            .api
            .get_backend_service(&self.ctx.project, &self.scope, &self.name)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Forwarding rules in the service's scope that send traffic to it.
    pub async fn serving_forwarding_rules(&self) -> Result<Vec<ForwardingRuleConfig>, MigrationError> {
        let own = self.self_link();
        let rules = self
            .ctx
            .api
            .list_forwarding_rules(&self.ctx.project, &self.scope)
            .await?;
        Ok(rules
            .into_iter()
            .filter(|r| {
                r.backend_service
                    .as_deref()
                    .is_some_and(|b| same_resource(b, &own))
            })
            .collect())
    }

    pub async fn delete(&self) -> Result<(), MigrationError> {
        tracing::info!(backend_service = %self.name, "deleting backend service");
        let op = self
            .ctx
            .api
            .delete_backend_service(&self.ctx.project, &self.scope, &self.name)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    pub async fn insert(&self, config: &BackendServiceConfig) -> Result<(), MigrationError> {
        tracing::info!(backend_service = %self.name, "creating backend service");
        let op = self
            .ctx
            .api
            .insert_backend_service(&self.ctx.project, &self.scope, config)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }

    /// Replace the backend list in place.
    pub async fn set_backends(&self, backends: Vec<Backend>) -> Result<(), MigrationError> {
        tracing::info!(backend_service = %self.name, backends = backends.len(), "updating backends");
        let patch = BackendServiceConfig {
            name: self.name.clone(),
            self_link: None,
            region: None,
            load_balancing_scheme: None,
            network: None,
            backends: Some(backends),
            extra: Default::default(),
        };
        let op = self
            .ctx
            .api
            .patch_backend_service(&self.ctx.project, &self.scope, &self.name, &patch)
            .await?;
        self.ctx.wait(op).await?;
        Ok(())
    }
}
