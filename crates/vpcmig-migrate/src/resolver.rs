//! Self-link dispatcher: turns a resource reference into the handler that
//! migrates it.

use vpcmig_core::{ResourceKind, ResourceRef, Scope};

use crate::classify::{classify_backend_service, classify_instance_group, BackendServiceKind, InstanceGroupKind};
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::handlers::{
    ExternalBackendServiceMigration, ForwardingRuleMigration, InstanceMigration,
    InternalBackendServiceMigration, ManagedGroupMigration, MigrationHandler, TargetPoolMigration,
    UnmanagedGroupMigration,
};

/// Build the handler for the resource `link` points at.
///
/// Returns `Ok(None)` for references that do not parse or name a kind with
/// no handler; callers skip those. Classification failures propagate.
pub async fn resolve(
    ctx: &MigrationContext,
    link: &str,
) -> Result<Option<MigrationHandler>, MigrationError> {
    let Some(reference) = ResourceRef::parse(link) else {
        tracing::warn!(link, "unrecognised resource reference");
        return Ok(None);
    };
    if !reference.kind.is_migratable() {
        tracing::warn!(link, kind = %reference.kind, "resource kind has no migration handler");
        return Ok(None);
    }
    let ctx = ctx.for_project(&reference.project);
    let name = reference.name.as_str();
    let zone = reference.zone.as_deref();
    let region = reference.region.as_deref();

    let handler = match reference.kind {
        ResourceKind::Instance => match zone {
            Some(zone) => MigrationHandler::Instance(InstanceMigration::new(ctx, zone, name)),
            None => return unscoped(link),
        },
        ResourceKind::InstanceGroup => match classify_instance_group(&ctx, name, zone, region).await? {
            InstanceGroupKind::Unmanaged { zone } => {
                MigrationHandler::UnmanagedGroup(UnmanagedGroupMigration::new(ctx, &zone, name))
            }
            InstanceGroupKind::ZonalManaged { zone } => MigrationHandler::ManagedGroup(
                ManagedGroupMigration::new(ctx, Scope::Zone(zone), name),
            ),
            InstanceGroupKind::RegionalManaged { region } => MigrationHandler::ManagedGroup(
                ManagedGroupMigration::new(ctx, Scope::Region(region), name),
            ),
        },
        ResourceKind::BackendService => match classify_backend_service(&ctx, name, region).await? {
            BackendServiceKind::Internal => match region {
                Some(region) => MigrationHandler::InternalBackendService(
                    InternalBackendServiceMigration::new(ctx, region, name),
                ),
                None => return unscoped(link),
            },
            kind => MigrationHandler::ExternalBackendService(ExternalBackendServiceMigration::new(
                ctx, name, kind,
            )),
        },
        ResourceKind::TargetPool => match region {
            Some(region) => MigrationHandler::TargetPool(TargetPoolMigration::new(ctx, region, name)),
            None => return unscoped(link),
        },
        ResourceKind::ForwardingRule => match region {
            Some(region) => {
                MigrationHandler::ForwardingRule(ForwardingRuleMigration::new(ctx, region, name))
            }
            None => return unscoped(link),
        },
        _ => return Ok(None),
    };
    tracing::debug!(link, kind = %reference.kind, "resolved migration handler");
    Ok(Some(handler))
}

fn unscoped(link: &str) -> Result<Option<MigrationHandler>, MigrationError> {
    tracing::warn!(link, "reference lacks the zone or region its kind needs");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backup::BackupLog;
    use crate::context::{MigrationOptions, TargetRequest};
    use crate::handlers::NetworkMigration;
    use crate::prompt::AssumeYes;
    use serde_json::json;
    use vpcmig_compute::mock::MockCompute;
    use vpcmig_compute::OperationWaiter;

    fn context(mock: Arc<MockCompute>, dir: &tempfile::TempDir) -> MigrationContext {
        MigrationContext::new(
            mock,
            OperationWaiter::default(),
            Arc::new(BackupLog::new(dir.path().join("backup.jsonl"))),
            Arc::new(AssumeYes),
            "p",
            TargetRequest {
                network: "vpc".into(),
                subnetwork: None,
            },
            MigrationOptions::default(),
        )
    }

    #[tokio::test]
    async fn resolves_each_kind_to_its_handler() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockCompute::new());
        mock.seed_instance_group(
            "p",
            "us-east1-b",
            serde_json::from_value(json!({"name": "ig"})).unwrap(),
            vec![],
        );
        mock.seed_backend_service(
            "p",
            &Scope::Global,
            serde_json::from_value(json!({"name": "web", "loadBalancingScheme": "EXTERNAL"})).unwrap(),
        );
        mock.seed_backend_service(
            "p",
            &Scope::Region("us-east1".into()),
            serde_json::from_value(json!({"name": "ilb", "loadBalancingScheme": "INTERNAL"})).unwrap(),
        );
        let ctx = context(mock, &dir);

        let cases = [
            ("projects/p/zones/us-east1-b/instances/vm", "instance vm"),
            ("projects/p/zones/us-east1-b/instanceGroups/ig", "instance group ig"),
            ("projects/p/global/backendServices/web", "backend service web"),
            ("projects/p/regions/us-east1/backendServices/ilb", "backend service ilb"),
            ("projects/p/regions/us-east1/targetPools/tp", "target pool tp"),
            ("projects/p/regions/us-east1/forwardingRules/fr", "forwarding rule fr"),
        ];
        for (link, resource) in cases {
            let handler = resolve(&ctx, link).await.unwrap().unwrap();
            assert_eq!(handler.resource(), resource, "{link}");
        }

        let internal = resolve(&ctx, "projects/p/regions/us-east1/backendServices/ilb")
            .await
            .unwrap();
        assert!(matches!(internal, Some(MigrationHandler::InternalBackendService(_))));
    }

    #[tokio::test]
    async fn unresolvable_references_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Arc::new(MockCompute::new()), &dir);
        for link in [
            "not a link",
            "projects/p/global/networks/default",
            "projects/p/global/instanceTemplates/t",
        ] {
            assert!(resolve(&ctx, link).await.unwrap().is_none(), "{link}");
        }
    }

    #[tokio::test]
    async fn classification_failures_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Arc::new(MockCompute::new()), &dir);
        let err = resolve(&ctx, "projects/p/global/backendServices/missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
