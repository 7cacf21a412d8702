//! # vpcmig-cli — Network Migration Command-Line Interface
//!
//! One subcommand per migration kind. Every subcommand resolves the target
//! network, runs the root handler with rollback, and reports the outcome as
//! a process exit code.
//!
//! ## Subcommands
//!
//! - `instance` — a single VM, optionally under a new name
//! - `instance-group` — unmanaged, zonal managed or regional managed group
//! - `backend-service` — global external / self-managed, or regional internal
//! - `target-pool` — standalone members and the groups behind the pool
//! - `forwarding-rule` — an internal rule with its backend service, or the
//!   target pool behind an external rule
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in [`cli`] and [`migrate`]; migration logic
//!   stays in `vpcmig-migrate`.
//! - Errors travel as `anyhow::Error` and are mapped to exit codes in
//!   [`exit`].

pub mod cli;
pub mod exit;
pub mod logging;
pub mod migrate;
pub mod prompt;

pub use cli::{Cli, GlobalArgs};
pub use exit::exit_code_for;
