//! Compute API client error types.

use crate::operation::OperationFailure;

/// Errors from compute API calls.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The API returned a non-2xx status other than 404.
    #[error("compute API {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The API returned 404 for the addressed resource.
    #[error("compute API {endpoint}: resource not found")]
    NotFound { endpoint: String },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {detail}")]
    Deserialization { endpoint: String, detail: String },
    /// A long-running operation finished with an embedded error payload.
    #[error("{0}")]
    Operation(OperationFailure),
    /// A long-running operation did not reach DONE before the deadline.
    #[error("operation {operation} still {status} after {waited_secs}s")]
    OperationTimeout {
        operation: String,
        status: String,
        waited_secs: u64,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl ComputeError {
    /// Whether the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Api { status, .. } => *status == 404,
            Self::Operation(failure) => failure.has_code("RESOURCE_NOT_FOUND"),
            _ => false,
        }
    }

    /// Whether the provider rejected a static external IP on insert, e.g.
    /// because the reserved address lives in another region or is taken.
    pub fn is_invalid_address(&self) -> bool {
        const MARKERS: [&str; 3] = ["natIP", "IP address", "INVALID_ADDRESS"];
        match self {
            Self::Api { status, body, .. } => {
                *status == 400 && MARKERS.iter().any(|m| body.contains(m))
            }
            Self::Operation(failure) => MARKERS
                .iter()
                .any(|m| failure.errors.iter().any(|e| e.mentions(m))),
            _ => false,
        }
    }
}
