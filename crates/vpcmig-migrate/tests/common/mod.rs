//! Shared fixture for the migration scenario tests: an in-memory compute
//! backend seeded with a legacy network, a custom-mode target network with
//! one subnetwork, and helpers to seed the resources each scenario needs.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use vpcmig_compute::mock::MockCompute;
use vpcmig_compute::{InstanceConfig, OperationWaiter};
use vpcmig_core::Scope;
use vpcmig_migrate::{
    AssumeYes, BackupLog, MigrationContext, MigrationError, MigrationOptions, OperatorPrompt,
    TargetRequest,
};

pub const PROJECT: &str = "p";
pub const ZONE: &str = "us-east1-b";
pub const REGION: &str = "us-east1";
pub const LEGACY: &str = "projects/p/global/networks/legacy";

pub struct Fixture {
    pub mock: Arc<MockCompute>,
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let mock = Arc::new(MockCompute::new());
        mock.seed_network(
            PROJECT,
            serde_json::from_value(json!({"name": "legacy", "IPv4Range": "10.240.0.0/16"})).unwrap(),
        );
        mock.seed_network(
            PROJECT,
            serde_json::from_value(json!({"name": "vpc", "autoCreateSubnetworks": false})).unwrap(),
        );
        mock.seed_network(
            PROJECT,
            serde_json::from_value(json!({"name": "auto", "autoCreateSubnetworks": true})).unwrap(),
        );
        mock.seed_subnetwork(
            PROJECT,
            REGION,
            serde_json::from_value(json!({"name": "sub", "network": "projects/p/global/networks/vpc"}))
                .unwrap(),
        );
        Self {
            mock,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn backup_path(&self) -> std::path::PathBuf {
        self.dir.path().join("backup.jsonl")
    }

    /// Context targeting `vpc` / `sub`.
    pub fn ctx(&self) -> MigrationContext {
        self.ctx_with("vpc", Some("sub"), MigrationOptions::default(), Arc::new(AssumeYes))
    }

    pub fn ctx_with(
        &self,
        network: &str,
        subnetwork: Option<&str>,
        options: MigrationOptions,
        prompt: Arc<dyn OperatorPrompt>,
    ) -> MigrationContext {
        self.build_ctx(Duration::from_secs(5), network, subnetwork, options, prompt)
    }

    /// Default context whose operation waits give up after `timeout`.
    pub fn ctx_with_timeout(&self, timeout: Duration) -> MigrationContext {
        self.build_ctx(timeout, "vpc", Some("sub"), MigrationOptions::default(), Arc::new(AssumeYes))
    }

    fn build_ctx(
        &self,
        timeout: Duration,
        network: &str,
        subnetwork: Option<&str>,
        options: MigrationOptions,
        prompt: Arc<dyn OperatorPrompt>,
    ) -> MigrationContext {
        MigrationContext::new(
            self.mock.clone(),
            OperationWaiter::new(Duration::from_millis(1), timeout),
            Arc::new(BackupLog::new(self.backup_path())),
            prompt,
            PROJECT,
            TargetRequest {
                network: network.to_string(),
                subnetwork: subnetwork.map(str::to_string),
            },
            options,
        )
    }

    /// Seed a RUNNING VM on the legacy network with a boot and a data disk
    /// and an ephemeral external IP.
    pub fn seed_vm(&self, name: &str) {
        self.mock.seed_instance(PROJECT, ZONE, vm(name));
    }

    pub fn seed_group(&self, name: &str, members: &[&str]) {
        for member in members {
            self.seed_vm(member);
        }
        self.mock.seed_instance_group(
            PROJECT,
            ZONE,
            serde_json::from_value(json!({"name": name, "network": LEGACY})).unwrap(),
            members.iter().map(|m| instance_link(m)).collect(),
        );
    }

    /// Seed template `t` and a zonal managed group `name` built from it.
    pub fn seed_managed_group(&self, name: &str, scope: &Scope, target_pools: &[&str]) {
        if self.mock.template(PROJECT, "t").is_none() {
            self.mock.seed_template(PROJECT, template("t"));
        }
        self.mock.seed_manager(
            PROJECT,
            scope,
            serde_json::from_value(json!({
                "name": name,
                "instanceTemplate": "projects/p/global/instanceTemplates/t",
                "targetSize": 2,
                "targetPools": target_pools,
            }))
            .unwrap(),
        );
    }

    pub fn instance(&self, name: &str) -> Option<InstanceConfig> {
        self.mock.instance(PROJECT, ZONE, name)
    }

    /// Network link on the primary interface of instance `name`.
    pub fn network_of(&self, name: &str) -> Option<String> {
        self.instance(name)?
            .network_interfaces?
            .first()?
            .network
            .clone()
    }
}

pub fn vm(name: &str) -> InstanceConfig {
    serde_json::from_value(json!({
        "name": name,
        "machineType": "zones/us-east1-b/machineTypes/e2-small",
        "networkInterfaces": [{
            "network": LEGACY,
            "networkIP": "10.240.0.2",
            "accessConfigs": [{"name": "External NAT", "type": "ONE_TO_ONE_NAT", "natIP": "35.1.2.3"}]
        }],
        "disks": [
            {"deviceName": "boot", "source": format!("projects/p/zones/us-east1-b/disks/{name}"), "boot": true, "autoDelete": true},
            {"deviceName": "data", "source": format!("projects/p/zones/us-east1-b/disks/{name}-data"), "boot": false, "autoDelete": false}
        ]
    }))
    .unwrap()
}

pub fn template(name: &str) -> vpcmig_compute::InstanceTemplateConfig {
    serde_json::from_value(json!({
        "name": name,
        "properties": {
            "machineType": "e2-small",
            "networkInterfaces": [{"network": LEGACY}]
        }
    }))
    .unwrap()
}

pub fn instance_link(name: &str) -> String {
    format!("projects/{PROJECT}/zones/{ZONE}/instances/{name}")
}

pub fn is_target_network(link: &str) -> bool {
    link.ends_with("projects/p/global/networks/vpc")
}

pub fn is_target_subnetwork(link: &str) -> bool {
    link.ends_with("projects/p/regions/us-east1/subnetworks/sub")
}

/// Cause of a `MigrationFailed`, panicking on anything else.
pub fn failed_cause(err: MigrationError) -> MigrationError {
    match err {
        MigrationError::MigrationFailed { cause, .. } => *cause,
        other => panic!("expected MigrationFailed, got {other:?}"),
    }
}
