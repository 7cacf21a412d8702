//! # Migration Subcommands
//!
//! Each subcommand names one root resource. The root handler is built
//! here and run through `network_migrate`, which owns the rollback.

use std::sync::Arc;

use clap::{Args, Subcommand};
use vpcmig_compute::{ComputeApi, ComputeApiConfig, HttpComputeClient};
use vpcmig_core::{ResourceKind, ResourceRef, Scope};
use vpcmig_migrate::{
    resolve, AssumeYes, BackupLog, ForwardingRuleMigration, InstanceMigration, MigrationContext,
    MigrationError, MigrationHandler, MigrationOptions, NetworkMigration, OperatorPrompt,
    TargetPoolMigration, TargetRequest,
};

use crate::cli::GlobalArgs;
use crate::prompt::TerminalPrompt;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Migrate a single VM instance.
    Instance(InstanceArgs),
    /// Migrate an unmanaged or managed instance group and its members.
    InstanceGroup(InstanceGroupArgs),
    /// Migrate a backend service and its backends.
    BackendService(BackendServiceArgs),
    /// Migrate the instances and groups behind a target pool.
    TargetPool(TargetPoolArgs),
    /// Migrate what a forwarding rule serves.
    ForwardingRule(ForwardingRuleArgs),
}

/// Project, target network and options common to every kind.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Project holding the resource.
    #[arg(long)]
    pub project: String,

    /// Target network name or link.
    #[arg(long)]
    pub network: String,

    /// Target subnetwork; required unless the network is auto-mode.
    #[arg(long)]
    pub subnetwork: Option<String>,

    /// Promote ephemeral external IPs to static addresses and keep them.
    #[arg(long)]
    pub preserve_external_ip: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InstanceArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long)]
    pub zone: String,

    /// Name of the instance to migrate.
    #[arg(long)]
    pub instance: String,

    /// Recreate the instance under this name instead.
    #[arg(long)]
    pub new_instance_name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct InstanceGroupArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, required_unless_present = "region", conflicts_with = "region")]
    pub zone: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub instance_group: String,
}

#[derive(Args, Debug, Clone)]
pub struct BackendServiceArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Region of an internal backend service; omit for global services.
    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub backend_service: String,
}

#[derive(Args, Debug, Clone)]
pub struct TargetPoolArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long)]
    pub region: String,

    #[arg(long)]
    pub target_pool: String,
}

#[derive(Args, Debug, Clone)]
pub struct ForwardingRuleArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long)]
    pub region: String,

    #[arg(long)]
    pub forwarding_rule: String,
}

impl Command {
    pub fn target(&self) -> &TargetArgs {
        match self {
            Self::Instance(a) => &a.target,
            Self::InstanceGroup(a) => &a.target,
            Self::BackendService(a) => &a.target,
            Self::TargetPool(a) => &a.target,
            Self::ForwardingRule(a) => &a.target,
        }
    }

    /// Root handler for this subcommand.
    pub async fn handler(&self, ctx: MigrationContext) -> Result<MigrationHandler, MigrationError> {
        let project = ctx.project.clone();
        match self {
            Self::Instance(a) => {
                let handler = match a.new_instance_name.as_deref() {
                    Some(new_name) => InstanceMigration::renamed(ctx, &a.zone, &a.instance, new_name)?,
                    None => InstanceMigration::new(ctx, &a.zone, &a.instance),
                };
                Ok(MigrationHandler::Instance(handler))
            }
            Self::InstanceGroup(a) => {
                let scope = match (&a.zone, &a.region) {
                    (Some(zone), _) => Scope::Zone(zone.clone()),
                    (None, Some(region)) => Scope::Region(region.clone()),
                    (None, None) => {
                        return Err(MigrationError::config_shape(
                            format!("instance group {}", a.instance_group),
                            "neither a zone nor a region was given",
                        ))
                    }
                };
                let link = ResourceRef::new(project, &scope, ResourceKind::InstanceGroup, &a.instance_group);
                resolve_root(&ctx, &link).await
            }
            Self::BackendService(a) => {
                let scope = a.region.clone().map_or(Scope::Global, Scope::Region);
                let link = ResourceRef::new(project, &scope, ResourceKind::BackendService, &a.backend_service);
                resolve_root(&ctx, &link).await
            }
            Self::TargetPool(a) => Ok(MigrationHandler::TargetPool(TargetPoolMigration::new(
                ctx,
                &a.region,
                &a.target_pool,
            ))),
            Self::ForwardingRule(a) => Ok(MigrationHandler::ForwardingRule(
                ForwardingRuleMigration::new(ctx, &a.region, &a.forwarding_rule),
            )),
        }
    }
}

async fn resolve_root(ctx: &MigrationContext, reference: &ResourceRef) -> Result<MigrationHandler, MigrationError> {
    resolve(ctx, &reference.self_link())
        .await?
        .ok_or_else(|| MigrationError::unsupported(reference.kind.to_string(), reference.to_string()))
}

/// Build the run context for `command` on top of `api`.
pub fn context(
    api: Arc<dyn ComputeApi>,
    config: &ComputeApiConfig,
    global: &GlobalArgs,
    command: &Command,
) -> MigrationContext {
    let target = command.target();
    let prompt: Arc<dyn OperatorPrompt> = if global.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(TerminalPrompt)
    };
    MigrationContext::new(
        api,
        config.waiter(),
        Arc::new(BackupLog::new(global.backup_log.clone())),
        prompt,
        target.project.clone(),
        TargetRequest {
            network: target.network.clone(),
            subnetwork: target.subnetwork.clone(),
        },
        MigrationOptions {
            preserve_external_ip: target.preserve_external_ip,
        },
    )
}

/// Confirm up-front choices, then migrate the root resource.
pub async fn execute(ctx: MigrationContext, command: &Command) -> Result<(), MigrationError> {
    if ctx.options.preserve_external_ip {
        ctx.confirm(
            "external IPs will be promoted to static addresses and stay reserved after the migration",
        )?;
    }
    command.handler(ctx).await?.network_migrate().await
}

/// Build the HTTP client from environment plus flags and run `command`.
pub async fn run(global: &GlobalArgs, command: &Command) -> anyhow::Result<()> {
    let mut config = match global.access_token.as_deref() {
        Some(token) => ComputeApiConfig::from_env_with_token(token)?,
        None => ComputeApiConfig::from_env()?,
    };
    if let Some(url) = global.api_url.as_deref() {
        config = config.with_base_url(url)?;
    }
    tracing::debug!(?config, "compute API configuration");
    let api: Arc<dyn ComputeApi> = Arc::new(HttpComputeClient::new(&config)?);
    let ctx = context(api, &config, global, command);
    execute(ctx, command).await?;
    Ok(())
}
