//! Target pool scenarios: standalone instances, unmanaged groups, zonal
//! and regional managed groups behind one pool, and forwarding rules that
//! delegate to the pool.

mod common;

use common::*;
use serde_json::json;
use vpcmig_compute::mock::InjectedFailure;
use vpcmig_core::Scope;
use vpcmig_migrate::{ForwardingRuleMigration, MigrationError, MigrationHandler, NetworkMigration, TargetPoolMigration};

const POOL: &str = "projects/p/regions/us-east1/targetPools/tp";

fn zone() -> Scope {
    Scope::Zone(ZONE.into())
}

/// Pool `tp` balancing across standalone `vm-1`, `vm-2` inside unmanaged
/// group `ig-a`, and managed group `mig` which names the pool.
fn seed_pool(fx: &Fixture) {
    fx.seed_vm("vm-1");
    fx.seed_group("ig-a", &["vm-2"]);
    fx.seed_managed_group("mig", &zone(), &[POOL]);
    fx.mock.seed_target_pool(
        PROJECT,
        REGION,
        serde_json::from_value(json!({
            "name": "tp",
            "instances": [instance_link("vm-1"), instance_link("vm-2")],
            "sessionAffinity": "NONE"
        }))
        .unwrap(),
    );
}

fn pool_members(fx: &Fixture) -> Vec<String> {
    let mut members = fx
        .mock
        .target_pool(PROJECT, REGION, "tp")
        .unwrap()
        .instances
        .unwrap_or_default();
    members.sort();
    members
}

#[tokio::test]
async fn pool_members_and_groups_move_to_the_target_network() {
    let fx = Fixture::new();
    seed_pool(&fx);

    TargetPoolMigration::new(fx.ctx(), REGION, "tp")
        .network_migrate()
        .await
        .unwrap();

    for vm in ["vm-1", "vm-2"] {
        assert!(is_target_network(&fx.network_of(vm).unwrap()), "{vm}");
    }
    let group = fx.mock.instance_group(PROJECT, &zone(), "ig-a").unwrap();
    assert!(is_target_network(group.network.as_deref().unwrap()));

    let manager = fx.mock.manager(PROJECT, &zone(), "mig").unwrap();
    assert!(!manager.instance_template.unwrap().ends_with("/instanceTemplates/t"));
    let pools = manager.target_pools.unwrap_or_default();
    assert!(pools.iter().any(|p| vpcmig_core::same_resource(p, POOL)));

    assert_eq!(pool_members(&fx), vec![instance_link("vm-1"), instance_link("vm-2")]);
    assert_eq!(fx.mock.count("delete_target_pool"), 0);
}

#[tokio::test]
async fn standalone_instance_leaves_the_pool_while_it_is_recreated() {
    let fx = Fixture::new();
    seed_pool(&fx);

    TargetPoolMigration::new(fx.ctx(), REGION, "tp")
        .network_migrate()
        .await
        .unwrap();

    let order: Vec<&str> = fx
        .mock
        .mutations()
        .into_iter()
        .filter(|m| {
            matches!(
                *m,
                "remove_instances_from_target_pool" | "add_instances_to_target_pool" | "insert_instance"
            )
        })
        .take(3)
        .collect();
    assert_eq!(
        order,
        vec![
            "remove_instances_from_target_pool",
            "insert_instance",
            "add_instances_to_target_pool"
        ]
    );
}

#[tokio::test]
async fn failed_group_recreate_restores_every_pool_member() {
    let fx = Fixture::new();
    seed_pool(&fx);
    fx.mock.inject(
        "delete_instance_group",
        "ig-a",
        InjectedFailure::Operation {
            code: "RESOURCE_IN_USE_BY_ANOTHER_RESOURCE".into(),
            message: "injected".into(),
        },
        Some(1),
    );

    let err = TargetPoolMigration::new(fx.ctx(), REGION, "tp")
        .network_migrate()
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::MigrationFailed { .. }));
    for vm in ["vm-1", "vm-2"] {
        assert_eq!(fx.network_of(vm).as_deref(), Some(LEGACY), "{vm}");
        assert_eq!(fx.instance(vm).unwrap().status.as_deref(), Some("RUNNING"), "{vm}");
    }
    assert_eq!(pool_members(&fx), vec![instance_link("vm-1"), instance_link("vm-2")]);
    assert_eq!(fx.mock.group_members(PROJECT, ZONE, "ig-a"), vec![instance_link("vm-2")]);
    assert_eq!(fx.mock.template_names(PROJECT), vec!["t".to_string()]);
    assert_eq!(fx.mock.count("delete_instance_group_manager"), 0);
}

#[tokio::test]
async fn regional_managed_group_is_migrated_as_a_group() {
    let fx = Fixture::new();
    let region = Scope::Region(REGION.into());
    fx.seed_vm("vm-1");
    fx.seed_vm("rmig-abcd");
    fx.seed_managed_group("rmig", &region, &[POOL]);
    fx.mock
        .seed_managed_instances(PROJECT, &region, "rmig", vec![instance_link("rmig-abcd")]);
    fx.mock.seed_target_pool(
        PROJECT,
        REGION,
        serde_json::from_value(json!({
            "name": "tp",
            "instances": [instance_link("vm-1"), instance_link("rmig-abcd")]
        }))
        .unwrap(),
    );

    TargetPoolMigration::new(fx.ctx(), REGION, "tp")
        .network_migrate()
        .await
        .unwrap();

    let deleted: Vec<String> = fx
        .mock
        .calls()
        .into_iter()
        .filter(|c| c.method == "delete_instance")
        .map(|c| c.target)
        .collect();
    assert_eq!(deleted, vec!["vm-1".to_string()]);
    assert_eq!(fx.mock.count("delete_instance_group_manager"), 1);

    let manager = fx.mock.manager(PROJECT, &region, "rmig").unwrap();
    assert!(!manager.instance_template.unwrap().ends_with("/instanceTemplates/t"));
    let pools = manager.target_pools.unwrap_or_default();
    assert!(pools.iter().any(|p| vpcmig_core::same_resource(p, POOL)));
    assert_eq!(fx.network_of("rmig-abcd").as_deref(), Some(LEGACY));
}

#[tokio::test]
async fn forwarding_rule_with_target_pool_leaves_the_rule_alone() {
    let fx = Fixture::new();
    fx.seed_vm("vm-1");
    fx.mock.seed_target_pool(
        PROJECT,
        REGION,
        serde_json::from_value(json!({"name": "tp", "instances": [instance_link("vm-1")]})).unwrap(),
    );
    let region = Scope::Region(REGION.into());
    fx.mock.seed_forwarding_rule(
        PROJECT,
        &region,
        serde_json::from_value(json!({
            "name": "fr-web",
            "loadBalancingScheme": "EXTERNAL",
            "target": POOL,
            "IPAddress": "35.9.9.9"
        }))
        .unwrap(),
    );
    let before = fx.mock.forwarding_rule(PROJECT, &region, "fr-web").unwrap();

    let mut handler = ForwardingRuleMigration::new(fx.ctx(), REGION, "fr-web");
    handler.network_migrate().await.unwrap();

    assert!(matches!(handler.inner(), Some(MigrationHandler::TargetPool(_))));
    assert_eq!(fx.mock.forwarding_rule(PROJECT, &region, "fr-web").unwrap(), before);
    assert_eq!(fx.mock.count("delete_forwarding_rule"), 0);
    assert_eq!(fx.mock.count("insert_forwarding_rule"), 0);
    assert!(is_target_network(&fx.network_of("vm-1").unwrap()));
    assert_eq!(pool_members(&fx), vec![instance_link("vm-1")]);
}
