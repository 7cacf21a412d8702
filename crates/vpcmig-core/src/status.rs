//! # Lifecycle Status Markers
//!
//! Status values observed on remote resources during a migration run, and
//! the ordered progress marker the backend-service handler advances.

use serde::{Deserialize, Serialize};

/// Power state of an instance as seen by a migration handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Running,
    Terminated,
    /// The instance could not be found.
    NotExists,
    /// Any transitional provider state (PROVISIONING, STOPPING, ...).
    Other(String),
}

impl InstanceStatus {
    /// Map a provider status string.
    pub fn from_api(status: Option<&str>) -> Self {
        match status {
            Some("RUNNING") => Self::Running,
            Some("TERMINATED") | Some("STOPPED") => Self::Terminated,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other("UNKNOWN".to_string()),
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => f.write_str("RUNNING"),
            Self::Terminated => f.write_str("TERMINATED"),
            Self::NotExists => f.write_str("NOTEXISTS"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Existence of an instance group (or its manager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    Exists,
    NotExists,
}

/// Forward progress of an internal backend-service migration.
///
/// ```text
/// NOT_START → MIGRATING → ORIGINAL_DELETED → BACKENDS_MIGRATED → NEW_CREATED
/// ```
///
/// Variants are declared in progress order so the derived `Ord` compares
/// them by how far the migration got. Forward migration only moves the
/// marker up; rollback only moves it down, one phase at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationStatus {
    NotStart,
    Migrating,
    OriginalDeleted,
    BackendsMigrated,
    NewCreated,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStart => "NOT_START",
            Self::Migrating => "MIGRATING",
            Self::OriginalDeleted => "ORIGINAL_DELETED",
            Self::BackendsMigrated => "BACKENDS_MIGRATED",
            Self::NewCreated => "NEW_CREATED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_status_orders_by_progress() {
        assert!(MigrationStatus::NotStart < MigrationStatus::Migrating);
        assert!(MigrationStatus::Migrating < MigrationStatus::OriginalDeleted);
        assert!(MigrationStatus::OriginalDeleted < MigrationStatus::BackendsMigrated);
        assert!(MigrationStatus::BackendsMigrated < MigrationStatus::NewCreated);
    }

    #[test]
    fn instance_status_from_api() {
        assert_eq!(InstanceStatus::from_api(Some("RUNNING")), InstanceStatus::Running);
        assert_eq!(
            InstanceStatus::from_api(Some("TERMINATED")),
            InstanceStatus::Terminated
        );
        assert_eq!(
            InstanceStatus::from_api(Some("STOPPING")),
            InstanceStatus::Other("STOPPING".into())
        );
    }

    #[test]
    fn migration_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&MigrationStatus::OriginalDeleted).unwrap();
        assert_eq!(json, "\"ORIGINAL_DELETED\"");
    }
}
