//! # Resource Accessors
//!
//! Typed views over one remote resource each. An accessor captures the
//! original config once (recording it in the backup log), exposes the
//! read/create/delete/update primitives handlers sequence, and waits for
//! every operation it issues.

mod backend_service;
mod forwarding_rule;
mod instance;
mod instance_group;
mod instance_template;
mod target_pool;

pub use backend_service::BackendService;
pub use forwarding_rule::ForwardingRule;
pub use instance::Instance;
pub use instance_group::{ManagedInstanceGroup, UnmanagedInstanceGroup};
pub use instance_template::InstanceTemplate;
pub use target_pool::{TargetPool, TargetPoolAttachments};

use vpcmig_core::{region_of_zone, ResourceKind, ResourceRef, Scope};

/// Region containing `zone`, or the zone itself when it has no region part.
pub(crate) fn region_for_zone(zone: &str) -> String {
    region_of_zone(zone).unwrap_or(zone).to_string()
}

pub(crate) fn link(project: &str, scope: &Scope, kind: ResourceKind, name: &str) -> String {
    ResourceRef::new(project, scope, kind, name).self_link()
}
