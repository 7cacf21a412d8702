//! Shared state of one migration run.

use std::sync::Arc;

use tokio::sync::OnceCell;
use vpcmig_compute::{ComputeApi, Operation, OperationWaiter};

use crate::backup::BackupLog;
use crate::error::MigrationError;
use crate::network::{NetworkInfo, TargetNetwork};
use crate::prompt::OperatorPrompt;

/// Operator-selected migration options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Keep instance external IPs by promoting them to static addresses.
    pub preserve_external_ip: bool,
}

/// The network the operator asked to migrate onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRequest {
    pub network: String,
    pub subnetwork: Option<String>,
}

/// Client handle, collaborators, and options shared by every handler of a
/// run. Cloning is cheap; clones share the resolved target network.
#[derive(Clone)]
pub struct MigrationContext {
    pub api: Arc<dyn ComputeApi>,
    pub waiter: OperationWaiter,
    pub backup: Arc<BackupLog>,
    pub prompt: Arc<dyn OperatorPrompt>,
    /// Project of the resources being migrated.
    pub project: String,
    pub options: MigrationOptions,
    target_project: String,
    target: TargetRequest,
    resolved: Arc<OnceCell<TargetNetwork>>,
}

impl std::fmt::Debug for MigrationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationContext")
            .field("project", &self.project)
            .field("target", &self.target)
            .field("options", &self.options)
            .field("backup", &self.backup.path())
            .finish_non_exhaustive()
    }
}

impl MigrationContext {
    pub fn new(
        api: Arc<dyn ComputeApi>,
        waiter: OperationWaiter,
        backup: Arc<BackupLog>,
        prompt: Arc<dyn OperatorPrompt>,
        project: impl Into<String>,
        target: TargetRequest,
        options: MigrationOptions,
    ) -> Self {
        let project = project.into();
        Self {
            api,
            waiter,
            backup,
            prompt,
            target_project: project.clone(),
            project,
            options,
            target,
            resolved: Arc::new(OnceCell::new()),
        }
    }

    /// Same run, resources addressed in another project. The target network
    /// stays in the run's project.
    pub fn for_project(&self, project: &str) -> Self {
        let mut ctx = self.clone();
        ctx.project = project.to_string();
        ctx
    }

    /// Target network, fetched and validated on first use.
    pub async fn target_network(&self) -> Result<&TargetNetwork, MigrationError> {
        self.resolved
            .get_or_try_init(|| {
                TargetNetwork::resolve(
                    self.api.as_ref(),
                    &self.target_project,
                    &self.target.network,
                    self.target.subnetwork.as_deref(),
                )
            })
            .await
    }

    /// Target links for a resource in `region`.
    pub async fn network_info(&self, region: &str) -> Result<NetworkInfo, MigrationError> {
        Ok(self.target_network().await?.for_region(region))
    }

    /// Wait for `op` to finish.
    pub async fn wait(&self, op: Operation) -> Result<Operation, MigrationError> {
        Ok(self.waiter.wait(self.api.as_ref(), &self.project, op).await?)
    }

    /// Announce a destructive step and ask the operator to confirm it.
    pub fn confirm(&self, message: &str) -> Result<(), MigrationError> {
        tracing::warn!("{message}");
        if self.prompt.confirm(message) {
            Ok(())
        } else {
            Err(MigrationError::OperatorDeclined(message.to_string()))
        }
    }

    pub fn backup_path(&self) -> String {
        self.backup.path().display().to_string()
    }
}
