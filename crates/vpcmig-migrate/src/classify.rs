//! # Kind Classifiers
//!
//! Inspect a resource's remote metadata and return the variant tag that
//! decides which handler gets built.
//!
//! - Instance groups: a zonal group without the manager marker is
//!   unmanaged, with it zonal-managed. A group missing from the zone is
//!   looked up regionally and is regional-managed.
//! - Backend services: global services must be `EXTERNAL` or
//!   `INTERNAL_SELF_MANAGED`; regional ones must be `INTERNAL`.

use vpcmig_core::{region_of_zone, Scope};

use crate::context::MigrationContext;
use crate::error::MigrationError;

/// Instance-group variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceGroupKind {
    Unmanaged { zone: String },
    ZonalManaged { zone: String },
    RegionalManaged { region: String },
}

/// Backend-service variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendServiceKind {
    External,
    InternalSelfManaged,
    Internal,
}

pub async fn classify_instance_group(
    ctx: &MigrationContext,
    name: &str,
    zone: Option<&str>,
    region: Option<&str>,
) -> Result<InstanceGroupKind, MigrationError> {
    if let Some(zone) = zone {
        match ctx
            .api
            .get_instance_group(&ctx.project, &Scope::Zone(zone.to_string()), name)
            .await
        {
            Ok(group) if group.is_managed() => {
                return Ok(InstanceGroupKind::ZonalManaged {
                    zone: zone.to_string(),
                })
            }
            Ok(_) => {
                return Ok(InstanceGroupKind::Unmanaged {
                    zone: zone.to_string(),
                })
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(group = name, zone, "not a zonal group, trying regional");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let region = region
        .or_else(|| zone.and_then(region_of_zone))
        .ok_or_else(|| MigrationError::config_shape(name, "instance group without zone or region"))?;
    ctx.api
        .get_instance_group(&ctx.project, &Scope::Region(region.to_string()), name)
        .await?;
    Ok(InstanceGroupKind::RegionalManaged {
        region: region.to_string(),
    })
}

pub async fn classify_backend_service(
    ctx: &MigrationContext,
    name: &str,
    region: Option<&str>,
) -> Result<BackendServiceKind, MigrationError> {
    let scope = match region {
        Some(r) => Scope::Region(r.to_string()),
        None => Scope::Global,
    };
    let config = ctx.api.get_backend_service(&ctx.project, &scope, name).await?;
    let scheme = config.load_balancing_scheme.as_deref().unwrap_or("");
    match (region, scheme) {
        (None, "EXTERNAL") => Ok(BackendServiceKind::External),
        (None, "INTERNAL_SELF_MANAGED") => Ok(BackendServiceKind::InternalSelfManaged),
        (Some(_), "INTERNAL") => Ok(BackendServiceKind::Internal),
        _ => Err(MigrationError::unsupported(
            "backend service",
            format!("{name} has load balancing scheme '{scheme}' in scope {scope}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backup::BackupLog;
    use crate::context::{MigrationOptions, TargetRequest};
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
    async fn groups_are_classified_by_marker_and_scope() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockCompute::new());
        mock.seed_instance_group(
            "p",
            "us-east1-b",
            serde_json::from_value(json!({"name": "plain"})).unwrap(),
            vec![],
        );
        mock.seed_template("p", serde_json::from_value(json!({"name": "t"})).unwrap());
        mock.seed_manager(
            "p",
            &Scope::Zone("us-east1-b".into()),
            serde_json::from_value(json!({"name": "zonal"})).unwrap(),
        );
        mock.seed_manager(
            "p",
            &Scope::Region("us-east1".into()),
            serde_json::from_value(json!({"name": "regional"})).unwrap(),
        );
        let ctx = context(mock, &dir);

        assert_eq!(
            classify_instance_group(&ctx, "plain", Some("us-east1-b"), None)
                .await
                .unwrap(),
            InstanceGroupKind::Unmanaged {
                zone: "us-east1-b".into()
            }
        );
        assert_eq!(
            classify_instance_group(&ctx, "zonal", Some("us-east1-b"), None)
                .await
                .unwrap(),
            InstanceGroupKind::ZonalManaged {
                zone: "us-east1-b".into()
            }
        );
        assert_eq!(
            classify_instance_group(&ctx, "regional", Some("us-east1-b"), None)
                .await
                .unwrap(),
            InstanceGroupKind::RegionalManaged {
                region: "us-east1".into()
            }
        );
        assert!(classify_instance_group(&ctx, "nowhere", Some("us-east1-b"), None)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn backend_services_are_classified_by_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockCompute::new());
        let region = Scope::Region("us-east1".into());
        for (scope, name, scheme) in [
            (&Scope::Global, "ext", "EXTERNAL"),
            (&Scope::Global, "mesh", "INTERNAL_SELF_MANAGED"),
            (&Scope::Global, "odd", "INTERNAL_MANAGED"),
            (&region, "ilb", "INTERNAL"),
            (&region, "regional-ext", "EXTERNAL"),
        ] {
            mock.seed_backend_service(
                "p",
                scope,
                serde_json::from_value(json!({"name": name, "loadBalancingScheme": scheme})).unwrap(),
            );
        }
        let ctx = context(mock, &dir);

        assert_eq!(
            classify_backend_service(&ctx, "ext", None).await.unwrap(),
            BackendServiceKind::External
        );
        assert_eq!(
            classify_backend_service(&ctx, "mesh", None).await.unwrap(),
            BackendServiceKind::InternalSelfManaged
        );
        assert_eq!(
            classify_backend_service(&ctx, "ilb", Some("us-east1")).await.unwrap(),
            BackendServiceKind::Internal
        );
        for (name, region) in [("odd", None), ("regional-ext", Some("us-east1"))] {
            let err = classify_backend_service(&ctx, name, region).await.unwrap_err();
            assert!(matches!(err, MigrationError::UnsupportedResource { .. }));
        }
    }
}
