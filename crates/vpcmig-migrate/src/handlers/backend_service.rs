//! # Backend Service Migration
//!
//! Internal regional services are deleted and recreated around their
//! backends. External and self-managed services keep running while each
//! backend is migrated in turn.

use async_trait::async_trait;
use vpcmig_compute::{Backend, BackendServiceConfig};
use vpcmig_core::{same_resource, MigrationStatus, Scope};

use super::{strip_output_fields, MigrationHandler, NetworkMigration};
use crate::classify::BackendServiceKind;
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::resolver;
use crate::resources::BackendService;

fn insert_body(config: &BackendServiceConfig) -> BackendServiceConfig {
    let mut body = config.clone();
    body.self_link = None;
    strip_output_fields(&mut body.extra);
    body
}

/// Resolve `backend` and run its handler, keeping the handler even when
/// migration fails so the caller's rollback reaches it.
async fn migrate_backend(
    ctx: &MigrationContext,
    backend: &Backend,
    started: &mut Vec<MigrationHandler>,
) -> Result<(), MigrationError> {
    let Some(mut handler) = resolver::resolve(ctx, &backend.group).await? else {
        tracing::warn!(backend = %backend.group, "backend cannot be migrated; skipping");
        return Ok(());
    };
    let result = handler.migrate().await;
    started.push(handler);
    result
}

/// Moves a regional `INTERNAL` backend service by deleting it, migrating
/// its backends, and recreating it on the target network.
///
/// Progress is tracked by a [`MigrationStatus`] marker that only moves up
/// during migration and only moves down, one phase at a time, during
/// rollback.
#[derive(Debug)]
pub struct InternalBackendServiceMigration {
    ctx: MigrationContext,
    service: BackendService,
    region: String,
    status: MigrationStatus,
    transitions: Vec<MigrationStatus>,
    backends: Vec<MigrationHandler>,
    allowed_forwarding_rule: Option<String>,
}

impl InternalBackendServiceMigration {
    pub fn new(ctx: MigrationContext, region: &str, name: &str) -> Self {
        Self {
            service: BackendService::new(ctx.clone(), Scope::Region(region.to_string()), name),
            ctx,
            region: region.to_string(),
            status: MigrationStatus::NotStart,
            transitions: vec![MigrationStatus::NotStart],
            backends: Vec::new(),
            allowed_forwarding_rule: None,
        }
    }

    /// Permit the forwarding rule at `link` to serve the service. Used when
    /// the rule itself is being migrated alongside.
    pub fn allowing_forwarding_rule(mut self, link: impl Into<String>) -> Self {
        self.allowed_forwarding_rule = Some(link.into());
        self
    }

    pub fn status(&self) -> MigrationStatus {
        self.status
    }

    /// Every status the marker held, oldest first.
    pub fn transitions(&self) -> &[MigrationStatus] {
        &self.transitions
    }

    fn set_status(&mut self, status: MigrationStatus) {
        tracing::debug!(backend_service = %self.service.name, from = %self.status, to = %status, "status");
        self.status = status;
        self.transitions.push(status);
    }

    fn is_allowed(&self, rule_link: Option<&str>) -> bool {
        match (self.allowed_forwarding_rule.as_deref(), rule_link) {
            (Some(allowed), Some(link)) => same_resource(allowed, link),
            _ => false,
        }
    }

    /// Refuse before any mutation when forwarding rules still use the service.
    pub(crate) async fn check_forwarding_rules(&self) -> Result<(), MigrationError> {
        let rules = self.service.serving_forwarding_rules().await?;
        let names: Vec<String> = rules.iter().map(|r| r.name.clone()).collect();
        let hint = if rules.len() > 1 {
            "a backend service served by more than one forwarding rule cannot be migrated"
        } else if rules.len() == 1 && !self.is_allowed(rules[0].self_link.as_deref()) {
            "migrate the forwarding rule instead; it takes the backend service along"
        } else {
            return Ok(());
        };
        Err(MigrationError::ForwardingRuleConflict {
            backend_service: self.service.name.clone(),
            rules: names,
            hint: hint.to_string(),
        })
    }

    async fn restore_original(&self) -> Result<(), MigrationError> {
        if self.service.exists().await? {
            return Ok(());
        }
        if let Some(original) = self.service.original() {
            self.service.insert(&insert_body(original)).await?;
        }
        Ok(())
    }

    async fn new_config(&self, original: &BackendServiceConfig) -> Result<BackendServiceConfig, MigrationError> {
        let info = self.ctx.network_info(&self.region).await?;
        let mut working = insert_body(original);
        working.network = Some(info.network);
        Ok(working)
    }
}

#[async_trait]
impl NetworkMigration for InternalBackendServiceMigration {
    fn resource(&self) -> String {
        format!("backend service {}", self.service.name)
    }

    fn context(&self) -> &MigrationContext {
        &self.ctx
    }

    fn self_link(&self) -> String {
        self.service.self_link()
    }

    async fn migrate(&mut self) -> Result<(), MigrationError> {
        let original = self.service.capture().await?.clone();
        self.check_forwarding_rules().await?;
        let working = self.new_config(&original).await?;

        self.set_status(MigrationStatus::Migrating);
        self.service.delete().await?;
        self.set_status(MigrationStatus::OriginalDeleted);

        for backend in original.backend_list() {
            migrate_backend(&self.ctx, backend, &mut self.backends).await?;
        }
        self.set_status(MigrationStatus::BackendsMigrated);

        self.service.insert(&working).await?;
        self.set_status(MigrationStatus::NewCreated);
        tracing::info!(backend_service = %self.service.name, "backend service migrated");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MigrationError> {
        tracing::warn!(backend_service = %self.service.name, status = %self.status, "rolling back backend service");

        if self.status == MigrationStatus::NewCreated {
            if self.service.exists().await? {
                self.service.delete().await?;
            }
            self.set_status(MigrationStatus::BackendsMigrated);
        }
        if self.status >= MigrationStatus::OriginalDeleted {
            for handler in self.backends.iter_mut().rev() {
                handler.rollback().await?;
            }
            if self.status > MigrationStatus::OriginalDeleted {
                self.set_status(MigrationStatus::OriginalDeleted);
            }
        }
        // A delete that failed while `Migrating` may still have taken effect.
        if matches!(self.status, MigrationStatus::OriginalDeleted | MigrationStatus::Migrating) {
            self.restore_original().await?;
            self.set_status(MigrationStatus::NotStart);
        }
        Ok(())
    }
}

/// Migrates the backends of a global `EXTERNAL` or `INTERNAL_SELF_MANAGED`
/// service in place: detach one backend, migrate it, re-attach all, repeat.
#[derive(Debug)]
pub struct ExternalBackendServiceMigration {
    ctx: MigrationContext,
    service: BackendService,
    kind: BackendServiceKind,
    backends: Vec<MigrationHandler>,
    migrated: bool,
}

impl ExternalBackendServiceMigration {
    pub fn new(ctx: MigrationContext, name: &str, kind: BackendServiceKind) -> Self {
        Self {
            service: BackendService::new(ctx.clone(), Scope::Global, name),
            ctx,
            kind,
            backends: Vec::new(),
            migrated: false,
        }
    }

    pub fn kind(&self) -> BackendServiceKind {
        self.kind
    }

    pub fn is_migrated(&self) -> bool {
        self.migrated
    }
}

fn without(all: &[Backend], excluded: &[String]) -> Vec<Backend> {
    all.iter()
        .filter(|b| !excluded.iter().any(|e| same_resource(&b.group, e)))
        .cloned()
        .collect()
}

#[async_trait]
impl NetworkMigration for ExternalBackendServiceMigration {
    fn resource(&self) -> String {
        format!("backend service {}", self.service.name)
    }

    fn context(&self) -> &MigrationContext {
        &self.ctx
    }

    fn self_link(&self) -> String {
        self.service.self_link()
    }

    async fn migrate(&mut self) -> Result<(), MigrationError> {
        let all = self.service.capture().await?.backend_list().to_vec();
        for backend in &all {
            tracing::info!(backend_service = %self.service.name, backend = %backend.group, "detaching backend");
            self.service
                .set_backends(without(&all, std::slice::from_ref(&backend.group)))
                .await?;
            migrate_backend(&self.ctx, backend, &mut self.backends).await?;
            self.service.set_backends(all.clone()).await?;
        }
        self.migrated = true;
        tracing::info!(backend_service = %self.service.name, backends = all.len(), "backend service migrated");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MigrationError> {
        let Some(all) = self.service.original().map(|c| c.backend_list().to_vec()) else {
            return Ok(());
        };
        tracing::warn!(backend_service = %self.service.name, "rolling back backend service");
        if !self.backends.is_empty() {
            let started: Vec<String> = self.backends.iter().map(|h| h.self_link()).collect();
            self.service.set_backends(without(&all, &started)).await?;
            for handler in self.backends.iter_mut().rev() {
                handler.rollback().await?;
            }
        }
        self.service.set_backends(all).await?;
        self.migrated = false;
        Ok(())
    }
}
