//! # In-Memory Compute Backend
//!
//! [`MockCompute`] implements [`ComputeApi`] over an in-memory resource
//! store so migration handlers can be exercised end to end without a
//! provider. It mimics the provider rules the handlers depend on:
//!
//! - inserting an existing resource fails with 409;
//! - deleting an instance drops it from every instance group;
//! - a manager cannot be deleted while an autoscaler targets it;
//! - a backend service cannot be deleted while a forwarding rule uses it;
//! - adding a missing instance to a group fails with 400.
//!
//! Every call is recorded. Failures can be injected per method and target,
//! either as an HTTP error or as a finished operation carrying an error
//! payload. Operations can be made to report `RUNNING` for a number of polls
//! before completing.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use vpcmig_core::{ResourceKind, ResourceRef, Scope};

use crate::api::ComputeApi;
use crate::error::ComputeError;
use crate::operation::{
    Operation, OperationErrorBody, OperationErrorItem, OperationStatus,
};
use crate::resources::{
    AddressConfig, AttachedDisk, AutoscalerConfig, BackendServiceConfig, ForwardingRuleConfig,
    InstanceConfig, InstanceGroupConfig, InstanceGroupManagerConfig, InstanceTemplateConfig,
    NetworkConfig, SubnetworkConfig, TargetPoolConfig,
};

/// Method names treated as read-only.
const READ_PREFIXES: [&str; 2] = ["get_", "list_"];

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub method: &'static str,
    pub target: String,
}

impl MockCall {
    /// Whether the call changes remote state.
    pub fn is_mutating(&self) -> bool {
        !READ_PREFIXES.iter().any(|p| self.method.starts_with(p))
    }
}

/// How an injected failure manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    /// The call itself fails with this HTTP status and body.
    Api { status: u16, body: String },
    /// The call returns an operation that finishes with this error payload.
    Operation { code: String, message: String },
    /// The call takes effect but its operation never leaves `RUNNING`.
    Stalled,
}

#[derive(Debug, Clone)]
struct FailureRule {
    method: &'static str,
    target: String,
    failure: InjectedFailure,
    remaining: Option<u32>,
}

type Key = (String, String);
type ScopedKey = (String, Scope, String);

#[derive(Debug, Default)]
struct MockState {
    instances: HashMap<(String, String, String), InstanceConfig>,
    addresses: HashMap<(String, String, String), AddressConfig>,
    networks: HashMap<Key, NetworkConfig>,
    subnetworks: HashMap<(String, String, String), SubnetworkConfig>,
    groups: HashMap<ScopedKey, InstanceGroupConfig>,
    members: HashMap<(String, String, String), Vec<String>>,
    managers: HashMap<ScopedKey, InstanceGroupManagerConfig>,
    managed_instances: HashMap<ScopedKey, Vec<String>>,
    autoscalers: HashMap<ScopedKey, AutoscalerConfig>,
    templates: HashMap<Key, InstanceTemplateConfig>,
    backend_services: HashMap<ScopedKey, BackendServiceConfig>,
    forwarding_rules: HashMap<ScopedKey, ForwardingRuleConfig>,
    target_pools: HashMap<(String, String, String), TargetPoolConfig>,
    operations: HashMap<String, (Operation, u32)>,
    calls: Vec<MockCall>,
    failures: Vec<FailureRule>,
    pending_polls: u32,
    stall_next: bool,
    op_counter: u64,
}

/// In-memory [`ComputeApi`].
#[derive(Debug, Default)]
pub struct MockCompute {
    state: Mutex<MockState>,
}

fn link(project: &str, scope: &Scope, kind: ResourceKind, name: &str) -> String {
    ResourceRef::new(project, scope, kind, name).self_link()
}

fn zone_scope(zone: &str) -> Scope {
    Scope::Zone(zone.to_string())
}

fn region_scope(region: &str) -> Scope {
    Scope::Region(region.to_string())
}

fn not_found(method: &str, target: &str) -> ComputeError {
    ComputeError::NotFound {
        endpoint: format!("{method} {target}"),
    }
}

fn conflict(method: &str, target: &str) -> ComputeError {
    ComputeError::Api {
        endpoint: format!("{method} {target}"),
        status: 409,
        body: format!("The resource '{target}' already exists"),
    }
}

fn bad_request(method: &str, target: &str, body: impl Into<String>) -> ComputeError {
    ComputeError::Api {
        endpoint: format!("{method} {target}"),
        status: 400,
        body: body.into(),
    }
}

impl MockState {
    /// Record the call and apply any matching injected failure.
    ///
    /// `Ok(Some(payload))` means the call should succeed at the HTTP level but
    /// return an operation that finishes with `payload`.
    fn enter(
        &mut self,
        method: &'static str,
        target: &str,
    ) -> Result<Option<OperationErrorBody>, ComputeError> {
        self.calls.push(MockCall {
            method,
            target: target.to_string(),
        });
        self.stall_next = false;
        let Some(rule) = self
            .failures
            .iter_mut()
            .find(|r| r.method == method && target.contains(&r.target) && r.remaining != Some(0))
        else {
            return Ok(None);
        };
        if let Some(n) = rule.remaining.as_mut() {
            *n -= 1;
        }
        match rule.failure.clone() {
            InjectedFailure::Api { status, body } => Err(ComputeError::Api {
                endpoint: format!("{method} {target}"),
                status,
                body,
            }),
            InjectedFailure::Operation { code, message } => Ok(Some(OperationErrorBody {
                errors: vec![OperationErrorItem {
                    code: Some(code),
                    message: Some(message),
                    location: None,
                }],
            })),
            InjectedFailure::Stalled => {
                self.stall_next = true;
                Ok(None)
            }
        }
    }

    fn operation(
        &mut self,
        scope: &Scope,
        target: String,
        error: Option<OperationErrorBody>,
    ) -> Operation {
        self.op_counter += 1;
        let mut op = Operation::done(
            format!("operation-{}", self.op_counter),
            scope,
            Some(target),
        );
        op.error = error;
        let polls = if std::mem::take(&mut self.stall_next) {
            u32::MAX
        } else {
            self.pending_polls
        };
        self.operations.insert(op.name.clone(), (op.clone(), polls));
        if polls > 0 {
            op.status = OperationStatus::Running;
        }
        op
    }
}

impl MockCompute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations report `RUNNING` for `polls` polls before `DONE`.
    pub fn with_pending_polls(self, polls: u32) -> Self {
        self.state.lock().pending_polls = polls;
        self
    }

    // -- Failure injection ---------------------------------------------------

    /// Fail every call of `method` whose target contains `target` with a 500.
    pub fn fail_on(&self, method: &'static str, target: &str) {
        self.inject(
            method,
            target,
            InjectedFailure::Api {
                status: 500,
                body: "injected failure".into(),
            },
            None,
        );
    }

    /// Fail the next `times` matching calls (all when `None`).
    pub fn inject(
        &self,
        method: &'static str,
        target: &str,
        failure: InjectedFailure,
        times: Option<u32>,
    ) {
        self.state.lock().failures.push(FailureRule {
            method,
            target: target.to_string(),
            failure,
            remaining: times,
        });
    }

    /// Drop all injected failures.
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    // -- Call log ------------------------------------------------------------

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Methods of mutating calls, in order.
    pub fn mutations(&self) -> Vec<&'static str> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .map(|c| c.method)
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    // -- Seeding -------------------------------------------------------------

    pub fn seed_instance(&self, project: &str, zone: &str, mut config: InstanceConfig) {
        config.self_link = Some(link(project, &zone_scope(zone), ResourceKind::Instance, &config.name));
        config.zone.get_or_insert_with(|| zone.to_string());
        config.status.get_or_insert_with(|| "RUNNING".to_string());
        self.state.lock().instances.insert(
            (project.to_string(), zone.to_string(), config.name.clone()),
            config,
        );
    }

    pub fn seed_network(&self, project: &str, mut config: NetworkConfig) {
        config.self_link = Some(link(project, &Scope::Global, ResourceKind::Network, &config.name));
        self.state
            .lock()
            .networks
            .insert((project.to_string(), config.name.clone()), config);
    }

    pub fn seed_subnetwork(&self, project: &str, region: &str, mut config: SubnetworkConfig) {
        config.self_link = Some(link(
            project,
            &region_scope(region),
            ResourceKind::Subnetwork,
            &config.name,
        ));
        self.state.lock().subnetworks.insert(
            (project.to_string(), region.to_string(), config.name.clone()),
            config,
        );
    }

    pub fn seed_address(&self, project: &str, region: &str, mut config: AddressConfig) {
        config.region.get_or_insert_with(|| region.to_string());
        config.status.get_or_insert_with(|| "RESERVED".to_string());
        self.state.lock().addresses.insert(
            (project.to_string(), region.to_string(), config.name.clone()),
            config,
        );
    }

    /// Seed a zonal unmanaged group with members (instance self-links).
    pub fn seed_instance_group(
        &self,
        project: &str,
        zone: &str,
        mut config: InstanceGroupConfig,
        members: Vec<String>,
    ) {
        let scope = zone_scope(zone);
        config.self_link = Some(link(project, &scope, ResourceKind::InstanceGroup, &config.name));
        let mut st = self.state.lock();
        st.members.insert(
            (project.to_string(), zone.to_string(), config.name.clone()),
            members,
        );
        st.groups
            .insert((project.to_string(), scope, config.name.clone()), config);
    }

    /// Seed a manager and the managed group it owns.
    pub fn seed_manager(&self, project: &str, scope: &Scope, config: InstanceGroupManagerConfig) {
        let mut st = self.state.lock();
        Self::put_manager(&mut st, project, scope, config);
    }

    /// Seed the instances a manager owns. Zonal managers without an entry
    /// report their group's members.
    pub fn seed_managed_instances(&self, project: &str, scope: &Scope, manager: &str, links: Vec<String>) {
        self.state
            .lock()
            .managed_instances
            .insert((project.to_string(), scope.clone(), manager.to_string()), links);
    }

    pub fn seed_autoscaler(&self, project: &str, scope: &Scope, mut config: AutoscalerConfig) {
        config.self_link = Some(link(project, scope, ResourceKind::Autoscaler, &config.name));
        self.state
            .lock()
            .autoscalers
            .insert((project.to_string(), scope.clone(), config.name.clone()), config);
    }

    pub fn seed_template(&self, project: &str, mut config: InstanceTemplateConfig) {
        config.self_link = Some(link(
            project,
            &Scope::Global,
            ResourceKind::InstanceTemplate,
            &config.name,
        ));
        self.state
            .lock()
            .templates
            .insert((project.to_string(), config.name.clone()), config);
    }

    pub fn seed_backend_service(&self, project: &str, scope: &Scope, mut config: BackendServiceConfig) {
        config.self_link = Some(link(project, scope, ResourceKind::BackendService, &config.name));
        self.state
            .lock()
            .backend_services
            .insert((project.to_string(), scope.clone(), config.name.clone()), config);
    }

    pub fn seed_forwarding_rule(&self, project: &str, scope: &Scope, mut config: ForwardingRuleConfig) {
        config.self_link = Some(link(project, scope, ResourceKind::ForwardingRule, &config.name));
        self.state
            .lock()
            .forwarding_rules
            .insert((project.to_string(), scope.clone(), config.name.clone()), config);
    }

    pub fn seed_target_pool(&self, project: &str, region: &str, mut config: TargetPoolConfig) {
        config.self_link = Some(link(
            project,
            &region_scope(region),
            ResourceKind::TargetPool,
            &config.name,
        ));
        self.state.lock().target_pools.insert(
            (project.to_string(), region.to_string(), config.name.clone()),
            config,
        );
    }

    // -- Inspection ----------------------------------------------------------

    pub fn instance(&self, project: &str, zone: &str, name: &str) -> Option<InstanceConfig> {
        self.state
            .lock()
            .instances
            .get(&(project.to_string(), zone.to_string(), name.to_string()))
            .cloned()
    }

    pub fn instance_group(&self, project: &str, scope: &Scope, name: &str) -> Option<InstanceGroupConfig> {
        self.state
            .lock()
            .groups
            .get(&(project.to_string(), scope.clone(), name.to_string()))
            .cloned()
    }

    pub fn group_members(&self, project: &str, zone: &str, name: &str) -> Vec<String> {
        self.state
            .lock()
            .members
            .get(&(project.to_string(), zone.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn manager(&self, project: &str, scope: &Scope, name: &str) -> Option<InstanceGroupManagerConfig> {
        self.state
            .lock()
            .managers
            .get(&(project.to_string(), scope.clone(), name.to_string()))
            .cloned()
    }

    pub fn autoscaler(&self, project: &str, scope: &Scope, name: &str) -> Option<AutoscalerConfig> {
        self.state
            .lock()
            .autoscalers
            .get(&(project.to_string(), scope.clone(), name.to_string()))
            .cloned()
    }

    pub fn template(&self, project: &str, name: &str) -> Option<InstanceTemplateConfig> {
        self.state
            .lock()
            .templates
            .get(&(project.to_string(), name.to_string()))
            .cloned()
    }

    pub fn template_names(&self, project: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .templates
            .keys()
            .filter(|(p, _)| p == project)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        names
    }

    pub fn backend_service(&self, project: &str, scope: &Scope, name: &str) -> Option<BackendServiceConfig> {
        self.state
            .lock()
            .backend_services
            .get(&(project.to_string(), scope.clone(), name.to_string()))
            .cloned()
    }

    pub fn forwarding_rule(&self, project: &str, scope: &Scope, name: &str) -> Option<ForwardingRuleConfig> {
        self.state
            .lock()
            .forwarding_rules
            .get(&(project.to_string(), scope.clone(), name.to_string()))
            .cloned()
    }

    pub fn target_pool(&self, project: &str, region: &str, name: &str) -> Option<TargetPoolConfig> {
        self.state
            .lock()
            .target_pools
            .get(&(project.to_string(), region.to_string(), name.to_string()))
            .cloned()
    }

    pub fn addresses(&self, project: &str, region: &str) -> Vec<AddressConfig> {
        self.state
            .lock()
            .addresses
            .iter()
            .filter(|((p, r, _), _)| p == project && r == region)
            .map(|(_, a)| a.clone())
            .collect()
    }

    fn put_manager(
        st: &mut MockState,
        project: &str,
        scope: &Scope,
        mut config: InstanceGroupManagerConfig,
    ) {
        let group_link = link(project, scope, ResourceKind::InstanceGroup, &config.name);
        config.self_link = Some(link(
            project,
            scope,
            ResourceKind::InstanceGroupManager,
            &config.name,
        ));
        config.instance_group = Some(group_link.clone());
        let group = InstanceGroupConfig {
            name: config.name.clone(),
            self_link: Some(group_link),
            zone: scope.zone().map(str::to_string),
            region: match scope {
                Scope::Region(r) => Some(r.clone()),
                _ => None,
            },
            description: Some(format!(
                "This instance group is controlled by Instance Group Manager '{}'.",
                config.name
            )),
            network: None,
            subnetwork: None,
            extra: Default::default(),
        };
        st.groups
            .insert((project.to_string(), scope.clone(), config.name.clone()), group);
        st.managers
            .insert((project.to_string(), scope.clone(), config.name.clone()), config);
    }
}

#[async_trait]
impl ComputeApi for MockCompute {
    async fn get_operation(
        &self,
        _project: &str,
        _scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_operation", name)?;
        let (op, remaining) = st
            .operations
            .get_mut(name)
            .ok_or_else(|| not_found("get_operation", name))?;
        if *remaining > 0 {
            *remaining -= 1;
        }
        let mut out = op.clone();
        if *remaining > 0 {
            out.status = OperationStatus::Running;
        }
        Ok(out)
    }

    async fn get_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<InstanceConfig, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_instance", name)?;
        st.instances
            .get(&(project.to_string(), zone.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_instance", name))
    }

    async fn insert_instance(
        &self,
        project: &str,
        zone: &str,
        config: &InstanceConfig,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("insert_instance", &config.name)?;
        let key = (project.to_string(), zone.to_string(), config.name.clone());
        if error.is_none() {
            if st.instances.contains_key(&key) {
                return Err(conflict("insert_instance", &config.name));
            }
            let mut stored = config.clone();
            stored.self_link = Some(link(
                project,
                &zone_scope(zone),
                ResourceKind::Instance,
                &config.name,
            ));
            stored.zone = Some(zone.to_string());
            stored.status = Some("RUNNING".to_string());
            st.instances.insert(key, stored);
        }
        let target = link(project, &zone_scope(zone), ResourceKind::Instance, &config.name);
        Ok(st.operation(&zone_scope(zone), target, error))
    }

    async fn delete_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("delete_instance", name)?;
        let key = (project.to_string(), zone.to_string(), name.to_string());
        if !st.instances.contains_key(&key) {
            return Err(not_found("delete_instance", name));
        }
        let target = link(project, &zone_scope(zone), ResourceKind::Instance, name);
        if error.is_none() {
            st.instances.remove(&key);
            for members in st.members.values_mut() {
                members.retain(|m| !vpcmig_core::same_resource(m, &target));
            }
        }
        Ok(st.operation(&zone_scope(zone), target, error))
    }

    async fn start_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.set_instance_status("start_instance", project, zone, name, "RUNNING")
    }

    async fn stop_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.set_instance_status("stop_instance", project, zone, name, "TERMINATED")
    }

    async fn attach_disk(
        &self,
        project: &str,
        zone: &str,
        instance: &str,
        disk: &AttachedDisk,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let target = format!("{instance}/{}", disk.device_name.as_deref().unwrap_or(""));
        let error = st.enter("attach_disk", &target)?;
        let key = (project.to_string(), zone.to_string(), instance.to_string());
        let stored = st
            .instances
            .get_mut(&key)
            .ok_or_else(|| not_found("attach_disk", instance))?;
        if error.is_none() {
            stored.disks.get_or_insert_with(Vec::new).push(disk.clone());
        }
        let target = link(project, &zone_scope(zone), ResourceKind::Instance, instance);
        Ok(st.operation(&zone_scope(zone), target, error))
    }

    async fn detach_disk(
        &self,
        project: &str,
        zone: &str,
        instance: &str,
        device_name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let target = format!("{instance}/{device_name}");
        let error = st.enter("detach_disk", &target)?;
        let key = (project.to_string(), zone.to_string(), instance.to_string());
        let stored = st
            .instances
            .get_mut(&key)
            .ok_or_else(|| not_found("detach_disk", instance))?;
        let disks = stored.disks.get_or_insert_with(Vec::new);
        if !disks.iter().any(|d| d.device_name.as_deref() == Some(device_name)) {
            return Err(bad_request(
                "detach_disk",
                &target,
                format!("No attached disk found with device name '{device_name}'"),
            ));
        }
        if error.is_none() {
            disks.retain(|d| d.device_name.as_deref() != Some(device_name));
        }
        let target = link(project, &zone_scope(zone), ResourceKind::Instance, instance);
        Ok(st.operation(&zone_scope(zone), target, error))
    }

    async fn list_addresses(
        &self,
        project: &str,
        region: &str,
    ) -> Result<Vec<AddressConfig>, ComputeError> {
        self.state.lock().enter("list_addresses", region)?;
        Ok(self.addresses(project, region))
    }

    async fn insert_address(
        &self,
        project: &str,
        region: &str,
        address: &AddressConfig,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("insert_address", &address.name)?;
        let key = (project.to_string(), region.to_string(), address.name.clone());
        if st.addresses.contains_key(&key) {
            return Err(conflict("insert_address", &address.name));
        }
        if error.is_none() {
            let mut stored = address.clone();
            stored.region = Some(region.to_string());
            stored.status = Some("RESERVED".to_string());
            st.addresses.insert(key, stored);
        }
        let target = link(project, &region_scope(region), ResourceKind::Address, &address.name);
        Ok(st.operation(&region_scope(region), target, error))
    }

    async fn get_network(&self, project: &str, name: &str) -> Result<NetworkConfig, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_network", name)?;
        st.networks
            .get(&(project.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_network", name))
    }

    async fn get_subnetwork(
        &self,
        project: &str,
        region: &str,
        name: &str,
    ) -> Result<SubnetworkConfig, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_subnetwork", name)?;
        st.subnetworks
            .get(&(project.to_string(), region.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_subnetwork", name))
    }

    async fn get_instance_group(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<InstanceGroupConfig, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_instance_group", name)?;
        st.groups
            .get(&(project.to_string(), scope.clone(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_instance_group", name))
    }

    async fn list_instance_groups(
        &self,
        project: &str,
        zone: &str,
    ) -> Result<Vec<InstanceGroupConfig>, ComputeError> {
        let mut st = self.state.lock();
        st.enter("list_instance_groups", zone)?;
        let scope = zone_scope(zone);
        let mut groups: Vec<InstanceGroupConfig> = st
            .groups
            .iter()
            .filter(|((p, s, _), _)| p == project && *s == scope)
            .map(|(_, g)| g.clone())
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn list_group_instances(
        &self,
        project: &str,
        zone: &str,
        group: &str,
    ) -> Result<Vec<String>, ComputeError> {
        let mut st = self.state.lock();
        st.enter("list_group_instances", group)?;
        if !st
            .groups
            .contains_key(&(project.to_string(), zone_scope(zone), group.to_string()))
        {
            return Err(not_found("list_group_instances", group));
        }
        Ok(st
            .members
            .get(&(project.to_string(), zone.to_string(), group.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_instance_group(
        &self,
        project: &str,
        zone: &str,
        config: &InstanceGroupConfig,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("insert_instance_group", &config.name)?;
        let scope = zone_scope(zone);
        let key = (project.to_string(), scope.clone(), config.name.clone());
        if st.groups.contains_key(&key) {
            return Err(conflict("insert_instance_group", &config.name));
        }
        let target = link(project, &scope, ResourceKind::InstanceGroup, &config.name);
        if error.is_none() {
            let mut stored = config.clone();
            stored.self_link = Some(target.clone());
            stored.zone = Some(zone.to_string());
            st.groups.insert(key, stored);
            st.members.insert(
                (project.to_string(), zone.to_string(), config.name.clone()),
                Vec::new(),
            );
        }
        Ok(st.operation(&scope, target, error))
    }

    async fn delete_instance_group(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("delete_instance_group", name)?;
        let scope = zone_scope(zone);
        let key = (project.to_string(), scope.clone(), name.to_string());
        if !st.groups.contains_key(&key) {
            return Err(not_found("delete_instance_group", name));
        }
        if error.is_none() {
            st.groups.remove(&key);
            st.members
                .remove(&(project.to_string(), zone.to_string(), name.to_string()));
        }
        let target = link(project, &scope, ResourceKind::InstanceGroup, name);
        Ok(st.operation(&scope, target, error))
    }

    async fn add_instances_to_group(
        &self,
        project: &str,
        zone: &str,
        group: &str,
        instance_links: &[String],
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("add_instances_to_group", group)?;
        let member_key = (project.to_string(), zone.to_string(), group.to_string());
        if !st.members.contains_key(&member_key) {
            return Err(not_found("add_instances_to_group", group));
        }
        for l in instance_links {
            let exists = ResourceRef::parse(l).is_some_and(|r| {
                st.instances.contains_key(&(
                    r.project.clone(),
                    r.zone.clone().unwrap_or_default(),
                    r.name.clone(),
                ))
            });
            if !exists {
                return Err(bad_request(
                    "add_instances_to_group",
                    group,
                    format!("The resource '{l}' was not found"),
                ));
            }
        }
        if error.is_none() {
            if let Some(members) = st.members.get_mut(&member_key) {
                for l in instance_links {
                    if !members.iter().any(|m| vpcmig_core::same_resource(m, l)) {
                        members.push(l.clone());
                    }
                }
            }
        }
        let target = link(project, &zone_scope(zone), ResourceKind::InstanceGroup, group);
        Ok(st.operation(&zone_scope(zone), target, error))
    }

    async fn get_instance_group_manager(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<InstanceGroupManagerConfig, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_instance_group_manager", name)?;
        st.managers
            .get(&(project.to_string(), scope.clone(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_instance_group_manager", name))
    }

    async fn list_instance_group_managers(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<InstanceGroupManagerConfig>, ComputeError> {
        let mut st = self.state.lock();
        st.enter("list_instance_group_managers", &scope.path())?;
        let mut managers: Vec<InstanceGroupManagerConfig> = st
            .managers
            .iter()
            .filter(|((p, s, _), _)| p == project && s == scope)
            .map(|(_, m)| m.clone())
            .collect();
        managers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(managers)
    }

    async fn list_managed_instances(
        &self,
        project: &str,
        scope: &Scope,
        manager: &str,
    ) -> Result<Vec<String>, ComputeError> {
        let mut st = self.state.lock();
        st.enter("list_managed_instances", manager)?;
        let key = (project.to_string(), scope.clone(), manager.to_string());
        if !st.managers.contains_key(&key) {
            return Err(not_found("list_managed_instances", manager));
        }
        if let Some(links) = st.managed_instances.get(&key) {
            return Ok(links.clone());
        }
        Ok(scope
            .zone()
            .and_then(|zone| {
                st.members
                    .get(&(project.to_string(), zone.to_string(), manager.to_string()))
                    .cloned()
            })
            .unwrap_or_default())
    }

    async fn insert_instance_group_manager(
        &self,
        project: &str,
        scope: &Scope,
        config: &InstanceGroupManagerConfig,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("insert_instance_group_manager", &config.name)?;
        let key = (project.to_string(), scope.clone(), config.name.clone());
        if st.managers.contains_key(&key) {
            return Err(conflict("insert_instance_group_manager", &config.name));
        }
        if let Some(template) = config.instance_template.as_deref() {
            let known = ResourceRef::parse(template).is_some_and(|r| {
                st.templates
                    .contains_key(&(r.project.clone(), r.name.clone()))
            });
            if !known {
                return Err(bad_request(
                    "insert_instance_group_manager",
                    &config.name,
                    format!("The resource '{template}' was not found"),
                ));
            }
        }
        if error.is_none() {
            Self::put_manager(&mut st, project, scope, config.clone());
        }
        let target = link(project, scope, ResourceKind::InstanceGroupManager, &config.name);
        Ok(st.operation(scope, target, error))
    }

    async fn delete_instance_group_manager(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("delete_instance_group_manager", name)?;
        let key = (project.to_string(), scope.clone(), name.to_string());
        let Some(manager) = st.managers.get(&key) else {
            return Err(not_found("delete_instance_group_manager", name));
        };
        let manager_link = manager.self_link.clone().unwrap_or_default();
        let autoscaled = st.autoscalers.iter().any(|((p, s, _), a)| {
            p == project
                && s == scope
                && a.target
                    .as_deref()
                    .is_some_and(|t| vpcmig_core::same_resource(t, &manager_link))
        });
        if autoscaled {
            return Err(bad_request(
                "delete_instance_group_manager",
                name,
                "The instance group manager is in use by an autoscaler",
            ));
        }
        if error.is_none() {
            st.managers.remove(&key);
            st.groups.remove(&key);
        }
        let target = link(project, scope, ResourceKind::InstanceGroupManager, name);
        Ok(st.operation(scope, target, error))
    }

    async fn set_target_pools(
        &self,
        project: &str,
        scope: &Scope,
        manager: &str,
        target_pools: &[String],
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("set_target_pools", manager)?;
        let key = (project.to_string(), scope.clone(), manager.to_string());
        let stored = st
            .managers
            .get_mut(&key)
            .ok_or_else(|| not_found("set_target_pools", manager))?;
        if error.is_none() {
            stored.target_pools = Some(target_pools.to_vec());
        }
        let target = link(project, scope, ResourceKind::InstanceGroupManager, manager);
        Ok(st.operation(scope, target, error))
    }

    async fn list_autoscalers(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<AutoscalerConfig>, ComputeError> {
        let mut st = self.state.lock();
        st.enter("list_autoscalers", &scope.path())?;
        Ok(st
            .autoscalers
            .iter()
            .filter(|((p, s, _), _)| p == project && s == scope)
            .map(|(_, a)| a.clone())
            .collect())
    }

    async fn insert_autoscaler(
        &self,
        project: &str,
        scope: &Scope,
        config: &AutoscalerConfig,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("insert_autoscaler", &config.name)?;
        let key = (project.to_string(), scope.clone(), config.name.clone());
        if st.autoscalers.contains_key(&key) {
            return Err(conflict("insert_autoscaler", &config.name));
        }
        let target = link(project, scope, ResourceKind::Autoscaler, &config.name);
        if error.is_none() {
            let mut stored = config.clone();
            stored.self_link = Some(target.clone());
            st.autoscalers.insert(key, stored);
        }
        Ok(st.operation(scope, target, error))
    }

    async fn delete_autoscaler(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("delete_autoscaler", name)?;
        let key = (project.to_string(), scope.clone(), name.to_string());
        if !st.autoscalers.contains_key(&key) {
            return Err(not_found("delete_autoscaler", name));
        }
        if error.is_none() {
            st.autoscalers.remove(&key);
        }
        let target = link(project, scope, ResourceKind::Autoscaler, name);
        Ok(st.operation(scope, target, error))
    }

    async fn get_instance_template(
        &self,
        project: &str,
        name: &str,
    ) -> Result<InstanceTemplateConfig, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_instance_template", name)?;
        st.templates
            .get(&(project.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_instance_template", name))
    }

    async fn insert_instance_template(
        &self,
        project: &str,
        config: &InstanceTemplateConfig,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("insert_instance_template", &config.name)?;
        let key = (project.to_string(), config.name.clone());
        if st.templates.contains_key(&key) {
            return Err(conflict("insert_instance_template", &config.name));
        }
        let target = link(project, &Scope::Global, ResourceKind::InstanceTemplate, &config.name);
        if error.is_none() {
            let mut stored = config.clone();
            stored.self_link = Some(target.clone());
            st.templates.insert(key, stored);
        }
        Ok(st.operation(&Scope::Global, target, error))
    }

    async fn delete_instance_template(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("delete_instance_template", name)?;
        let key = (project.to_string(), name.to_string());
        if !st.templates.contains_key(&key) {
            return Err(not_found("delete_instance_template", name));
        }
        if error.is_none() {
            st.templates.remove(&key);
        }
        let target = link(project, &Scope::Global, ResourceKind::InstanceTemplate, name);
        Ok(st.operation(&Scope::Global, target, error))
    }

    async fn get_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<BackendServiceConfig, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_backend_service", name)?;
        st.backend_services
            .get(&(project.to_string(), scope.clone(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_backend_service", name))
    }

    async fn insert_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        config: &BackendServiceConfig,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("insert_backend_service", &config.name)?;
        let key = (project.to_string(), scope.clone(), config.name.clone());
        if st.backend_services.contains_key(&key) {
            return Err(conflict("insert_backend_service", &config.name));
        }
        let target = link(project, scope, ResourceKind::BackendService, &config.name);
        if error.is_none() {
            let mut stored = config.clone();
            stored.self_link = Some(target.clone());
            st.backend_services.insert(key, stored);
        }
        Ok(st.operation(scope, target, error))
    }

    async fn delete_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("delete_backend_service", name)?;
        let key = (project.to_string(), scope.clone(), name.to_string());
        if !st.backend_services.contains_key(&key) {
            return Err(not_found("delete_backend_service", name));
        }
        let target = link(project, scope, ResourceKind::BackendService, name);
        let in_use = st.forwarding_rules.values().any(|fr| {
            fr.backend_service
                .as_deref()
                .is_some_and(|b| vpcmig_core::same_resource(b, &target))
        });
        if in_use {
            return Err(bad_request(
                "delete_backend_service",
                name,
                "The backend service is in use by a forwarding rule",
            ));
        }
        if error.is_none() {
            st.backend_services.remove(&key);
        }
        Ok(st.operation(scope, target, error))
    }

    async fn patch_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
        config: &BackendServiceConfig,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("patch_backend_service", name)?;
        let key = (project.to_string(), scope.clone(), name.to_string());
        let stored = st
            .backend_services
            .get_mut(&key)
            .ok_or_else(|| not_found("patch_backend_service", name))?;
        if error.is_none() {
            if config.backends.is_some() {
                stored.backends = config.backends.clone();
            }
            if config.network.is_some() {
                stored.network = config.network.clone();
            }
        }
        let target = link(project, scope, ResourceKind::BackendService, name);
        Ok(st.operation(scope, target, error))
    }

    async fn get_forwarding_rule(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<ForwardingRuleConfig, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_forwarding_rule", name)?;
        st.forwarding_rules
            .get(&(project.to_string(), scope.clone(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_forwarding_rule", name))
    }

    async fn list_forwarding_rules(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<ForwardingRuleConfig>, ComputeError> {
        let mut st = self.state.lock();
        st.enter("list_forwarding_rules", &scope.path())?;
        let mut rules: Vec<ForwardingRuleConfig> = st
            .forwarding_rules
            .iter()
            .filter(|((p, s, _), _)| p == project && s == scope)
            .map(|(_, fr)| fr.clone())
            .collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rules)
    }

    async fn insert_forwarding_rule(
        &self,
        project: &str,
        scope: &Scope,
        config: &ForwardingRuleConfig,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("insert_forwarding_rule", &config.name)?;
        let key = (project.to_string(), scope.clone(), config.name.clone());
        if st.forwarding_rules.contains_key(&key) {
            return Err(conflict("insert_forwarding_rule", &config.name));
        }
        let target = link(project, scope, ResourceKind::ForwardingRule, &config.name);
        if error.is_none() {
            let mut stored = config.clone();
            stored.self_link = Some(target.clone());
            st.forwarding_rules.insert(key, stored);
        }
        Ok(st.operation(scope, target, error))
    }

    async fn delete_forwarding_rule(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("delete_forwarding_rule", name)?;
        let key = (project.to_string(), scope.clone(), name.to_string());
        if !st.forwarding_rules.contains_key(&key) {
            return Err(not_found("delete_forwarding_rule", name));
        }
        if error.is_none() {
            st.forwarding_rules.remove(&key);
        }
        let target = link(project, scope, ResourceKind::ForwardingRule, name);
        Ok(st.operation(scope, target, error))
    }

    async fn get_target_pool(
        &self,
        project: &str,
        region: &str,
        name: &str,
    ) -> Result<TargetPoolConfig, ComputeError> {
        let mut st = self.state.lock();
        st.enter("get_target_pool", name)?;
        st.target_pools
            .get(&(project.to_string(), region.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_target_pool", name))
    }

    async fn add_instances_to_target_pool(
        &self,
        project: &str,
        region: &str,
        pool: &str,
        instance_links: &[String],
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("add_instances_to_target_pool", pool)?;
        let key = (project.to_string(), region.to_string(), pool.to_string());
        let stored = st
            .target_pools
            .get_mut(&key)
            .ok_or_else(|| not_found("add_instances_to_target_pool", pool))?;
        if error.is_none() {
            let members = stored.instances.get_or_insert_with(Vec::new);
            for l in instance_links {
                if !members.iter().any(|m| vpcmig_core::same_resource(m, l)) {
                    members.push(l.clone());
                }
            }
        }
        let target = link(project, &region_scope(region), ResourceKind::TargetPool, pool);
        Ok(st.operation(&region_scope(region), target, error))
    }

    async fn remove_instances_from_target_pool(
        &self,
        project: &str,
        region: &str,
        pool: &str,
        instance_links: &[String],
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter("remove_instances_from_target_pool", pool)?;
        let key = (project.to_string(), region.to_string(), pool.to_string());
        let stored = st
            .target_pools
            .get_mut(&key)
            .ok_or_else(|| not_found("remove_instances_from_target_pool", pool))?;
        if error.is_none() {
            if let Some(members) = stored.instances.as_mut() {
                members.retain(|m| !instance_links.iter().any(|l| vpcmig_core::same_resource(m, l)));
            }
        }
        let target = link(project, &region_scope(region), ResourceKind::TargetPool, pool);
        Ok(st.operation(&region_scope(region), target, error))
    }
}

impl MockCompute {
    fn set_instance_status(
        &self,
        method: &'static str,
        project: &str,
        zone: &str,
        name: &str,
        status: &str,
    ) -> Result<Operation, ComputeError> {
        let mut st = self.state.lock();
        let error = st.enter(method, name)?;
        let key = (project.to_string(), zone.to_string(), name.to_string());
        let stored = st
            .instances
            .get_mut(&key)
            .ok_or_else(|| not_found(method, name))?;
        if error.is_none() {
            stored.status = Some(status.to_string());
        }
        let target = link(project, &zone_scope(zone), ResourceKind::Instance, name);
        Ok(st.operation(&zone_scope(zone), target, error))
    }
}
