//! # vpcmig-compute — Compute Provider Client
//!
//! Typed async access to the compute provider's REST surface for the
//! resources a network migration touches.
//!
//! ## Layout
//!
//! - [`ComputeApi`]: the trait migration handlers program against.
//! - [`HttpComputeClient`]: bearer-authenticated `reqwest` implementation
//!   with bounded retry on transport failures.
//! - [`OperationWaiter`]: polls long-running operations to completion.
//! - [`resources`]: serde models for instances, groups, templates, backend
//!   services, forwarding rules, target pools, networks, and addresses.
//! - `mock` (feature `mock`): an in-memory [`ComputeApi`] for scenario tests.
//!
//! ## Configuration
//!
//! [`ComputeApiConfig::from_env`] reads `VPCMIG_ACCESS_TOKEN` (required),
//! `VPCMIG_COMPUTE_URL`, `VPCMIG_TIMEOUT_SECS`, `VPCMIG_POLL_INTERVAL_MS`,
//! and `VPCMIG_OPERATION_TIMEOUT_SECS`.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod operation;
pub mod resources;
pub(crate) mod retry;

#[cfg(feature = "mock")]
pub mod mock;

pub use api::ComputeApi;
pub use config::{ComputeApiConfig, ConfigError};
pub use error::ComputeError;
pub use http::HttpComputeClient;
pub use operation::{Operation, OperationFailure, OperationStatus, OperationWaiter};
pub use resources::*;
