//! Compute API client configuration.
//!
//! Defaults point at the production compute endpoint. Override via
//! environment variables or explicit construction for testing. Credential
//! acquisition is out of scope: the caller supplies a bearer access token.

use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

use crate::operation::OperationWaiter;

/// Default compute API root.
pub const DEFAULT_COMPUTE_URL: &str = "https://compute.googleapis.com/compute/v1/";

/// Configuration for connecting to the compute API.
///
/// Custom `Debug` implementation redacts the `access_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ComputeApiConfig {
    /// API root; resource paths (`projects/...`) are appended to it.
    pub base_url: Url,
    /// Bearer token for API authentication.
    pub access_token: Zeroizing<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Delay between operation status polls.
    pub poll_interval_ms: u64,
    /// Overall bound on waiting for one operation.
    pub operation_timeout_secs: u64,
}

impl std::fmt::Debug for ComputeApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeApiConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .finish()
    }
}

impl ComputeApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `VPCMIG_COMPUTE_URL` (default: `https://compute.googleapis.com/compute/v1/`)
    /// - `VPCMIG_ACCESS_TOKEN` (required)
    /// - `VPCMIG_TIMEOUT_SECS` (default: 30)
    /// - `VPCMIG_POLL_INTERVAL_MS` (default: 2000)
    /// - `VPCMIG_OPERATION_TIMEOUT_SECS` (default: 600)
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_token =
            std::env::var("VPCMIG_ACCESS_TOKEN").map_err(|_| ConfigError::MissingToken)?;
        Self::from_env_with_token(access_token)
    }

    /// Like [`from_env`](Self::from_env), with the token supplied by the caller.
    pub fn from_env_with_token(access_token: impl Into<String>) -> Result<Self, ConfigError> {
        let access_token: String = access_token.into();
        if access_token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(Self {
            base_url: env_url("VPCMIG_COMPUTE_URL", DEFAULT_COMPUTE_URL)?,
            access_token: Zeroizing::new(access_token),
            timeout_secs: env_u64("VPCMIG_TIMEOUT_SECS", 30),
            poll_interval_ms: env_u64("VPCMIG_POLL_INTERVAL_MS", 2_000),
            operation_timeout_secs: env_u64("VPCMIG_OPERATION_TIMEOUT_SECS", 600),
        })
    }

    /// Configuration pointing at a local mock server.
    pub fn local_mock(uri: &str, token: &str) -> Result<Self, ConfigError> {
        let base = format!("{}/compute/v1/", uri.trim_end_matches('/'));
        Ok(Self {
            base_url: Url::parse(&base)
                .map_err(|e| ConfigError::InvalidUrl(uri.to_string(), e.to_string()))?,
            access_token: Zeroizing::new(token.to_string()),
            timeout_secs: 5,
            poll_interval_ms: 10,
            operation_timeout_secs: 5,
        })
    }

    /// Replace the base URL, keeping the trailing slash `Url::join` needs.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_base(raw, "--api-url")?;
        Ok(self)
    }

    /// Operation waiter honouring this configuration's poll cadence and bound.
    pub fn waiter(&self) -> OperationWaiter {
        OperationWaiter::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_secs(self.operation_timeout_secs),
        )
    }
}

fn parse_base(raw: &str, origin: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl(origin.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_base(&raw, var)
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("VPCMIG_ACCESS_TOKEN environment variable is required")]
    MissingToken,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
