//! # Long-Running Operations
//!
//! Every mutating compute call returns an [`Operation`] handle scoped to a
//! zone, a region, or the project. [`OperationWaiter`] polls the handle at a
//! fixed interval until it reaches `DONE`, then surfaces any embedded error
//! payload as [`ComputeError::Operation`]. Waiting longer than the configured
//! bound yields [`ComputeError::OperationTimeout`]; callers treat that as
//! fatal and never retry it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use vpcmig_core::Scope;

use crate::api::ComputeApi;
use crate::error::ComputeError;
use crate::resources::Extra;

/// Status of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    #[default]
    Pending,
    Running,
    Done,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Running => f.write_str("RUNNING"),
            Self::Done => f.write_str("DONE"),
        }
    }
}

/// Handle of a long-running operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub status: OperationStatus,
    /// Zone URL for zonal operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Region URL for regional operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationErrorBody>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Error payload embedded in a finished operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationErrorBody {
    #[serde(default)]
    pub errors: Vec<OperationErrorItem>,
}

/// One entry of an operation error payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationErrorItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl OperationErrorItem {
    /// Whether the code or message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.code.as_deref().is_some_and(|c| c.contains(needle))
            || self.message.as_deref().is_some_and(|m| m.contains(needle))
    }
}

/// A finished operation that carried an error payload.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationFailure {
    pub operation: String,
    pub target: Option<String>,
    pub errors: Vec<OperationErrorItem>,
}

impl OperationFailure {
    /// Whether any error entry has exactly this code.
    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code.as_deref() == Some(code))
    }
}

impl std::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation {} failed", self.operation)?;
        if let Some(target) = &self.target {
            write!(f, " on {target}")?;
        }
        for (i, e) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(
                f,
                "{sep}{} {}",
                e.code.as_deref().unwrap_or("UNKNOWN"),
                e.message.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}

impl Operation {
    /// A finished operation with no error, as a fake backend would return it.
    pub fn done(name: impl Into<String>, scope: &Scope, target_link: Option<String>) -> Self {
        let (zone, region) = match scope {
            Scope::Zone(z) => (Some(format!("zones/{z}")), None),
            Scope::Region(r) => (None, Some(format!("regions/{r}"))),
            Scope::Global => (None, None),
        };
        Self {
            name: name.into(),
            status: OperationStatus::Done,
            zone,
            region,
            operation_type: None,
            target_link,
            error: None,
            extra: Extra::new(),
        }
    }

    /// Scope the operation must be polled in, derived from its zone/region URL.
    pub fn scope(&self) -> Scope {
        let last = |url: &str| url.rsplit('/').next().unwrap_or(url).to_string();
        match (&self.zone, &self.region) {
            (Some(zone), _) => Scope::Zone(last(zone)),
            (None, Some(region)) => Scope::Region(last(region)),
            (None, None) => Scope::Global,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == OperationStatus::Done
    }

    /// Error payload of a finished operation, if any.
    pub fn failure(&self) -> Option<OperationFailure> {
        let body = self.error.as_ref()?;
        if body.errors.is_empty() {
            return None;
        }
        Some(OperationFailure {
            operation: self.name.clone(),
            target: self.target_link.clone(),
            errors: body.errors.clone(),
        })
    }
}

/// Polls operations until they finish.
#[derive(Debug, Clone, Copy)]
pub struct OperationWaiter {
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for OperationWaiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(600))
    }
}

impl OperationWaiter {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Block until `op` is `DONE`.
    ///
    /// # Errors
    ///
    /// - [`ComputeError::Operation`] when the finished operation carries an
    ///   error payload.
    /// - [`ComputeError::OperationTimeout`] when the bound elapses first.
    /// - Any error from polling itself.
    pub async fn wait(
        &self,
        api: &dyn ComputeApi,
        project: &str,
        op: Operation,
    ) -> Result<Operation, ComputeError> {
        let started = Instant::now();
        let mut current = op;
        loop {
            if current.is_done() {
                return match current.failure() {
                    Some(failure) => Err(ComputeError::Operation(failure)),
                    None => Ok(current),
                };
            }
            if started.elapsed() >= self.timeout {
                return Err(ComputeError::OperationTimeout {
                    operation: current.name,
                    status: current.status.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tracing::trace!(operation = %current.name, status = %current.status, "waiting for operation");
            tokio::time::sleep(self.poll_interval).await;
            current = api
                .get_operation(project, &current.scope(), &current.name)
                .await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scope_from_zone_url() {
        let op: Operation = serde_json::from_value(json!({
            "name": "op-1",
            "status": "RUNNING",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-east1-b"
        }))
        .unwrap();
        assert_eq!(op.scope(), Scope::Zone("us-east1-b".into()));
        assert!(!op.is_done());
    }

    #[test]
    fn failure_carries_payload() {
        let op: Operation = serde_json::from_value(json!({
            "name": "op-2",
            "status": "DONE",
            "targetLink": "projects/p/zones/z/instances/vm",
            "error": {"errors": [{"code": "QUOTA_EXCEEDED", "message": "no room"}]}
        }))
        .unwrap();
        let failure = op.failure().unwrap();
        assert!(failure.has_code("QUOTA_EXCEEDED"));
        assert_eq!(
            failure.to_string(),
            "operation op-2 failed on projects/p/zones/z/instances/vm: QUOTA_EXCEEDED no room"
        );
    }

    #[test]
    fn done_without_errors_is_success() {
        let op = Operation::done("op-3", &Scope::Global, None);
        assert!(op.is_done());
        assert!(op.failure().is_none());
    }
}
