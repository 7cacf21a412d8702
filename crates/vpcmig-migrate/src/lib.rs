//! # vpcmig-migrate — Network Migration Engine
//!
//! Moves compute resources from a legacy network onto a subnet-mode
//! network by recreating them, and restores them when a step fails.
//!
//! ## Modules
//!
//! - **Context** (`context.rs`): the client handle, operation waiter,
//!   backup log, operator prompt, and the lazily resolved target network
//!   shared by every handler of a run.
//! - **Network** (`network.rs`): target validation (auto-mode vs custom vs
//!   legacy) and the interface/template rewrites, always on working copies.
//! - **Resources** (`resources/`): accessors that capture a resource's
//!   original config into the backup log and issue waited mutations.
//! - **Classify** (`classify.rs`): variant tags for instance groups and
//!   backend services.
//! - **Handlers** (`handlers/`): one [`NetworkMigration`] implementation per
//!   kind, composed into [`MigrationHandler`].
//! - **Resolver** (`resolver.rs`): self-link → handler dispatch.
//!
//! ## Execution Model
//!
//! Strictly sequential: every mutating call is followed by a wait for its
//! operation before the next call is issued. A failure anywhere rolls back
//! the whole tree of started handlers in reverse order. A successful
//! rollback still reports [`MigrationError::MigrationFailed`]; a failed one
//! reports [`MigrationError::RollbackFailed`] with the backup log path.

pub mod address;
pub mod backup;
pub mod classify;
pub mod context;
pub mod error;
pub mod handlers;
pub mod network;
pub mod prompt;
pub mod resolver;
pub mod resources;

pub use backup::{BackupEntry, BackupLog};
pub use classify::{BackendServiceKind, InstanceGroupKind};
pub use context::{MigrationContext, MigrationOptions, TargetRequest};
pub use error::MigrationError;
pub use handlers::{
    ExternalBackendServiceMigration, ForwardingRuleMigration, InstanceMigration,
    InternalBackendServiceMigration, ManagedGroupMigration, MigrationHandler, NetworkMigration,
    TargetPoolMigration, UnmanagedGroupMigration,
};
pub use network::{check_network_auto_mode, NetworkInfo, TargetNetwork};
pub use prompt::{AlwaysDecline, AssumeYes, OperatorPrompt};
pub use resolver::resolve;
