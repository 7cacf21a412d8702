//! # Migration Handlers
//!
//! One handler per migratable resource kind. Every handler implements
//! [`NetworkMigration`]: `migrate` runs the forward steps and records how
//! far it got, `rollback` undoes exactly that much.
//!
//! Only the outermost handler runs [`NetworkMigration::network_migrate`].
//! Parents drive their children through `migrate` and keep every child
//! they started, so a failure anywhere in the tree surfaces at the root,
//! whose rollback sweeps the started children in reverse order.
//!
//! ```text
//! ForwardingRule ─▶ TargetPool ─▶ Instance, UnmanagedGroup, ManagedGroup
//!                └▶ InternalBackendService ─▶ UnmanagedGroup ─▶ Instance
//!                                          └▶ ManagedGroup
//! ExternalBackendService ─▶ UnmanagedGroup, ManagedGroup, Instance
//! ```

mod backend_service;
mod forwarding_rule;
mod instance;
mod managed_group;
mod target_pool;
mod unmanaged_group;

pub use backend_service::{ExternalBackendServiceMigration, InternalBackendServiceMigration};
pub use forwarding_rule::ForwardingRuleMigration;
pub use instance::InstanceMigration;
pub use managed_group::ManagedGroupMigration;
pub use target_pool::TargetPoolMigration;
pub use unmanaged_group::UnmanagedGroupMigration;

use async_trait::async_trait;

use crate::context::MigrationContext;
use crate::error::MigrationError;

/// A resource that can be moved to the target network and restored.
#[async_trait]
pub trait NetworkMigration: Send {
    /// Human-readable identity, e.g. `instance vm-1`.
    fn resource(&self) -> String;

    fn context(&self) -> &MigrationContext;

    /// Self-link of the resource as it is addressed after migration.
    fn self_link(&self) -> String;

    /// Forward migration. Leaves enough state behind for `rollback`.
    async fn migrate(&mut self) -> Result<(), MigrationError>;

    /// Undo whatever `migrate` got done. Safe to call after any failure.
    async fn rollback(&mut self) -> Result<(), MigrationError>;

    /// Migrate, rolling back on failure.
    ///
    /// # Errors
    ///
    /// [`MigrationError::MigrationFailed`] when the migration failed and the
    /// rollback restored the resource; [`MigrationError::RollbackFailed`]
    /// when the rollback failed too.
    async fn network_migrate(&mut self) -> Result<(), MigrationError> {
        let resource = self.resource();
        tracing::info!(resource = %resource, "starting network migration");
        let cause = match self.migrate().await {
            Ok(()) => {
                tracing::info!(resource = %resource, "network migration complete");
                return Ok(());
            }
            Err(cause) => cause,
        };

        tracing::warn!(resource = %resource, error = %cause, "migration failed; rolling back");
        match self.rollback().await {
            Ok(()) => {
                tracing::warn!(resource = %resource, "rollback complete");
                Err(MigrationError::MigrationFailed {
                    resource,
                    cause: Box::new(cause),
                })
            }
            Err(rollback) => {
                let backup_log = self.context().backup_path();
                tracing::error!(
                    resource = %resource,
                    error = %rollback,
                    backup_log = %backup_log,
                    "rollback failed"
                );
                Err(MigrationError::RollbackFailed {
                    resource,
                    cause: Box::new(cause),
                    rollback: Box::new(rollback),
                    backup_log,
                })
            }
        }
    }
}

/// Any migration handler, chosen by the dispatcher from a resource's kind.
#[derive(Debug)]
pub enum MigrationHandler {
    Instance(InstanceMigration),
    UnmanagedGroup(UnmanagedGroupMigration),
    ManagedGroup(ManagedGroupMigration),
    InternalBackendService(InternalBackendServiceMigration),
    ExternalBackendService(ExternalBackendServiceMigration),
    TargetPool(TargetPoolMigration),
    ForwardingRule(ForwardingRuleMigration),
}

macro_rules! dispatch {
    ($self:expr, $h:ident => $body:expr) => {
        match $self {
            MigrationHandler::Instance($h) => $body,
            MigrationHandler::UnmanagedGroup($h) => $body,
            MigrationHandler::ManagedGroup($h) => $body,
            MigrationHandler::InternalBackendService($h) => $body,
            MigrationHandler::ExternalBackendService($h) => $body,
            MigrationHandler::TargetPool($h) => $body,
            MigrationHandler::ForwardingRule($h) => $body,
        }
    };
}

#[async_trait]
impl NetworkMigration for MigrationHandler {
    fn resource(&self) -> String {
        dispatch!(self, h => h.resource())
    }

    fn context(&self) -> &MigrationContext {
        dispatch!(self, h => h.context())
    }

    fn self_link(&self) -> String {
        dispatch!(self, h => h.self_link())
    }

    async fn migrate(&mut self) -> Result<(), MigrationError> {
        dispatch!(self, h => h.migrate().await)
    }

    async fn rollback(&mut self) -> Result<(), MigrationError> {
        dispatch!(self, h => h.rollback().await)
    }
}

/// Strip output-only fields before a config is sent back as an insert body.
pub(crate) fn strip_output_fields(extra: &mut vpcmig_compute::resources::Extra) {
    for key in ["id", "creationTimestamp", "fingerprint", "kind", "status", "selfLinkWithId"] {
        extra.remove(key);
    }
}
