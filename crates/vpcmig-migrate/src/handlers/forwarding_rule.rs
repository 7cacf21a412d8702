//! # Forwarding Rule Migration

use async_trait::async_trait;
use vpcmig_compute::ForwardingRuleConfig;
use vpcmig_core::{ResourceKind, ResourceRef};

use super::{
    strip_output_fields, InternalBackendServiceMigration, MigrationHandler, NetworkMigration,
    TargetPoolMigration,
};
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::resources::ForwardingRule;

const INTERNAL_SCHEME: &str = "INTERNAL";

fn insert_body(config: &ForwardingRuleConfig) -> ForwardingRuleConfig {
    let mut body = config.clone();
    body.self_link = None;
    strip_output_fields(&mut body.extra);
    body
}

/// Migrates what a regional forwarding rule points at.
///
/// - Target-pool rules: the pool is migrated and the rule left alone.
/// - `INTERNAL` rules with a backend service: the rule is deleted, the
///   service migrated, and the rule recreated on the target network
///   without its old internal IP.
#[derive(Debug)]
pub struct ForwardingRuleMigration {
    ctx: MigrationContext,
    rule: ForwardingRule,
    inner: Option<Box<MigrationHandler>>,
    rule_deleted: bool,
    new_created: bool,
}

impl ForwardingRuleMigration {
    pub fn new(ctx: MigrationContext, region: &str, name: &str) -> Self {
        Self {
            rule: ForwardingRule::new(ctx.clone(), region, name),
            ctx,
            inner: None,
            rule_deleted: false,
            new_created: false,
        }
    }

    /// Handler of the resource behind the rule, once known.
    pub fn inner(&self) -> Option<&MigrationHandler> {
        self.inner.as_deref()
    }

    async fn run_inner(&mut self, handler: MigrationHandler) -> Result<(), MigrationError> {
        let inner = self.inner.insert(Box::new(handler));
        inner.migrate().await
    }

    async fn new_config(&self, original: &ForwardingRuleConfig) -> Result<ForwardingRuleConfig, MigrationError> {
        let info = self.ctx.network_info(&self.rule.region).await?;
        let mut working = insert_body(original);
        working.network = Some(info.network);
        working.subnetwork = info.subnetwork;
        working.ip_address = None;
        Ok(working)
    }
}

#[async_trait]
impl NetworkMigration for ForwardingRuleMigration {
    fn resource(&self) -> String {
        format!("forwarding rule {}", self.rule.name)
    }

    fn context(&self) -> &MigrationContext {
        &self.ctx
    }

    fn self_link(&self) -> String {
        self.rule.self_link()
    }

    async fn migrate(&mut self) -> Result<(), MigrationError> {
        let original = self.rule.capture().await?.clone();

        if let Some(target) = original.target.as_deref() {
            let pool = ResourceRef::parse_as(target, ResourceKind::TargetPool)?;
            let region = pool.region.clone().unwrap_or_else(|| self.rule.region.clone());
            tracing::info!(forwarding_rule = %self.rule.name, target_pool = %pool.name, "migrating target pool behind forwarding rule");
            let handler = TargetPoolMigration::new(self.ctx.for_project(&pool.project), &region, &pool.name);
            return self.run_inner(MigrationHandler::TargetPool(handler)).await;
        }

        let scheme = original.load_balancing_scheme.as_deref().unwrap_or("EXTERNAL");
        let Some(service_link) = original.backend_service.as_deref().filter(|_| scheme == INTERNAL_SCHEME)
        else {
            return Err(MigrationError::unsupported(
                "forwarding rule",
                format!(
                    "{} has load balancing scheme '{scheme}' and neither a target pool nor an internal backend service",
                    self.rule.name
                ),
            ));
        };
        let service = ResourceRef::parse_as(service_link, ResourceKind::BackendService)?;
        let region = service.region.clone().ok_or_else(|| {
            MigrationError::unsupported("backend service", format!("{} is not regional", service.name))
        })?;
        let working = self.new_config(&original).await?;

        let handler = InternalBackendServiceMigration::new(
            self.ctx.for_project(&service.project),
            &region,
            &service.name,
        )
        .allowing_forwarding_rule(self.rule.self_link());
        // Other frontends on the service must be found while this rule still exists.
        handler.check_forwarding_rules().await?;

        self.rule.delete().await?;
        self.rule_deleted = true;

        self.run_inner(MigrationHandler::InternalBackendService(handler)).await?;

        self.rule.insert(&working).await?;
        self.new_created = true;
        tracing::info!(forwarding_rule = %self.rule.name, "forwarding rule migrated");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MigrationError> {
        let Some(original) = self.rule.original().cloned() else {
            return Ok(());
        };
        tracing::warn!(forwarding_rule = %self.rule.name, "rolling back forwarding rule");

        if self.new_created && self.rule.exists().await? {
            self.rule.delete().await?;
        }
        self.new_created = false;

        if let Some(inner) = self.inner.as_mut() {
            inner.rollback().await?;
        }

        if self.rule_deleted && !self.rule.exists().await? {
            self.rule.insert(&insert_body(&original)).await?;
        }
        self.rule_deleted = false;
        Ok(())
    }
}
