//! # vpcmig-core — Compute Resource Vocabulary
//!
//! Foundational types shared by every vpcmig crate. Nothing in here talks to
//! the network: the types describe *which* remote resource is meant and *where*
//! a migration stands, never how to reach it.
//!
//! ## Modules
//!
//! - **Self-links** (`self_link.rs`): parse and build the URL-shaped references
//!   the compute provider uses to point at resources.
//! - **Location** (`location.rs`): global / regional / zonal scopes.
//! - **Status** (`status.rs`): instance power state, group existence, and the
//!   ordered backend-service migration marker consumed by rollback.
//! - **Naming** (`naming.rs`): unique, provider-valid resource names derived
//!   from a timestamp suffix.

pub mod error;
pub mod location;
pub mod naming;
pub mod self_link;
pub mod status;

pub use error::CoreError;
pub use location::{region_of_zone, Scope};
pub use naming::{unique_name, unique_name_now, MAX_NAME_LEN};
pub use self_link::{same_resource, ResourceKind, ResourceRef, COMPUTE_API_PREFIX};
pub use status::{GroupStatus, InstanceStatus, MigrationStatus};
