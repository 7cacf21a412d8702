//! Migration error taxonomy.

use vpcmig_compute::{ComputeError, OperationFailure};
use vpcmig_core::CoreError;

/// Errors raised by accessors and migration handlers.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// A compute API call failed.
    #[error("compute API error: {0}")]
    RemoteApi(#[source] ComputeError),

    /// A long-running operation finished with an error payload.
    #[error("{0}")]
    Operation(OperationFailure),

    /// Unrecognised backend-service scheme, forwarding-rule shape, or resource kind.
    #[error("unsupported {kind}: {detail}")]
    UnsupportedResource { kind: String, detail: String },

    /// A fetched config lacks an expected field or has it with the wrong type.
    #[error("unexpected config shape for {resource}: {detail}")]
    ConfigShape { resource: String, detail: String },

    /// Re-adding instances to a recreated instance group failed.
    #[error("failed to add instances to instance group {group}: {source}")]
    AttachInstance {
        group: String,
        #[source]
        source: Box<MigrationError>,
    },

    #[error("network {network} is not an auto-mode network; a target subnetwork is required")]
    MissingTargetSubnetwork { network: String },

    #[error("network {network} is a legacy network and cannot be a migration target")]
    InvalidTargetNetwork { network: String },

    #[error("the new instance name must differ from the original name {name}")]
    UnchangedName { name: String },

    /// The backend service is bound to forwarding rules the current path
    /// cannot migrate safely.
    #[error("backend service {backend_service} is served by forwarding rule(s) {}; {hint}", .rules.join(", "))]
    ForwardingRuleConflict {
        backend_service: String,
        rules: Vec<String>,
        hint: String,
    },

    /// The operator refused a confirmation prompt.
    #[error("operator declined: {0}")]
    OperatorDeclined(String),

    /// Terminal: the migration failed and its rollback completed.
    #[error("migration of {resource} failed and was rolled back: {cause}")]
    MigrationFailed {
        resource: String,
        #[source]
        cause: Box<MigrationError>,
    },

    /// Terminal: rollback itself failed. Resources may be lost.
    #[error(
        "migration of {resource} failed ({cause}) and rollback failed: {rollback}; \
         original configurations are recorded in {backup_log}"
    )]
    RollbackFailed {
        resource: String,
        cause: Box<MigrationError>,
        #[source]
        rollback: Box<MigrationError>,
        backup_log: String,
    },

    #[error("backup log {path}: {source}")]
    Backup {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl MigrationError {
    pub fn config_shape(resource: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ConfigShape {
            resource: resource.into(),
            detail: detail.into(),
        }
    }

    pub fn unsupported(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnsupportedResource {
            kind: kind.into(),
            detail: detail.into(),
        }
    }

    /// Whether the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RemoteApi(e) => e.is_not_found(),
            Self::Operation(f) => f.has_code("RESOURCE_NOT_FOUND"),
            _ => false,
        }
    }

    /// Whether the provider rejected a static external IP.
    pub fn is_invalid_address(&self) -> bool {
        match self {
            Self::RemoteApi(e) => e.is_invalid_address(),
            Self::Operation(f) => ComputeError::Operation(f.clone()).is_invalid_address(),
            _ => false,
        }
    }

    /// Whether an operator refusal is the root of this error.
    pub fn is_declined(&self) -> bool {
        match self {
            Self::OperatorDeclined(_) => true,
            Self::MigrationFailed { cause, .. } => cause.is_declined(),
            _ => false,
        }
    }
}

impl From<ComputeError> for MigrationError {
    fn from(e: ComputeError) -> Self {
        match e {
            ComputeError::Operation(failure) => Self::Operation(failure),
            ComputeError::Deserialization { endpoint, detail } => Self::ConfigShape {
                resource: endpoint,
                detail,
            },
            other => Self::RemoteApi(other),
        }
    }
}

impl From<CoreError> for MigrationError {
    fn from(e: CoreError) -> Self {
        Self::UnsupportedResource {
            kind: "reference".into(),
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpcmig_compute::operation::OperationErrorItem;

    #[test]
    fn operation_failures_keep_their_own_variant() {
        let failure = OperationFailure {
            operation: "op-1".into(),
            target: None,
            errors: vec![OperationErrorItem {
                code: Some("RESOURCE_NOT_FOUND".into()),
                message: None,
                location: None,
            }],
        };
        let err = MigrationError::from(ComputeError::Operation(failure));
        assert!(matches!(err, MigrationError::Operation(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn malformed_bodies_are_config_shape_errors() {
        let err = MigrationError::from(ComputeError::Deserialization {
            endpoint: "GET instances/vm".into(),
            detail: "invalid type: string, expected a sequence".into(),
        });
        assert!(matches!(err, MigrationError::ConfigShape { .. }));
    }

    #[test]
    fn declined_is_found_through_migration_failed() {
        let err = MigrationError::MigrationFailed {
            resource: "ig".into(),
            cause: Box::new(MigrationError::OperatorDeclined("autoscaler".into())),
        };
        assert!(err.is_declined());
        assert!(!MigrationError::UnchangedName { name: "vm".into() }.is_declined());
    }

    #[test]
    fn conflict_message_lists_rules() {
        let err = MigrationError::ForwardingRuleConflict {
            backend_service: "bs".into(),
            rules: vec!["fr-1".into(), "fr-2".into()],
            hint: "ambiguous ownership".into(),
        };
        assert_eq!(
            err.to_string(),
            "backend service bs is served by forwarding rule(s) fr-1, fr-2; ambiguous ownership"
        );
    }
}
