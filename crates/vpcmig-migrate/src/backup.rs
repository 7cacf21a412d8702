//! # Original-Config Backup Log
//!
//! Append-only JSON-lines file holding every resource config captured before
//! the first mutating call of a run. It is the manual-recovery aid named in
//! [`MigrationError::RollbackFailed`](crate::MigrationError::RollbackFailed).
//!
//! ```text
//! {"recorded_at":"2026-10-16T09:30:00Z","run_id":"…","kind":"instance","self_link":"…","config":{…}}
//! ```

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vpcmig_core::ResourceKind;

use crate::error::MigrationError;

/// One backup record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub recorded_at: DateTime<Utc>,
    pub run_id: Uuid,
    pub kind: ResourceKind,
    pub self_link: String,
    pub config: serde_json::Value,
}

/// Append-only backup file shared by every handler of a run.
#[derive(Debug)]
pub struct BackupLog {
    path: PathBuf,
    run_id: Uuid,
    write_lock: Mutex<()>,
}

impl BackupLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            run_id: Uuid::new_v4(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn io_error(&self, source: std::io::Error) -> MigrationError {
        MigrationError::Backup {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Append `config` under `self_link`.
    pub fn record<T: Serialize>(
        &self,
        kind: ResourceKind,
        self_link: &str,
        config: &T,
    ) -> Result<(), MigrationError> {
        let entry = BackupEntry {
            recorded_at: Utc::now(),
            run_id: self.run_id,
            kind,
            self_link: self_link.to_string(),
            config: serde_json::to_value(config)
                .map_err(|e| self.io_error(std::io::Error::other(e)))?,
        };
        let mut line =
            serde_json::to_string(&entry).map_err(|e| self.io_error(std::io::Error::other(e)))?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes()).map_err(|e| self.io_error(e))?;
        tracing::debug!(%kind, self_link, path = %self.path.display(), "recorded original config");
        Ok(())
    }

    /// Read every entry back, oldest first.
    pub fn read_entries(path: &Path) -> Result<Vec<BackupEntry>, MigrationError> {
        let wrap = |source| MigrationError::Backup {
            path: path.display().to_string(),
            source,
        };
        let file = std::fs::File::open(path).map_err(wrap)?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(wrap)?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| wrap(std::io::Error::other(e)))?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn appends_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.jsonl");

        let first = BackupLog::new(&path);
        first
            .record(
                ResourceKind::Instance,
                "projects/p/zones/z-a/instances/vm",
                &json!({"name": "vm"}),
            )
            .unwrap();
        let second = BackupLog::new(&path);
        second
            .record(
                ResourceKind::TargetPool,
                "projects/p/regions/r/targetPools/pool",
                &json!({"name": "pool"}),
            )
            .unwrap();

        let entries = BackupLog::read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, ResourceKind::Instance);
        assert_eq!(entries[0].config["name"], "vm");
        assert_eq!(entries[1].run_id, second.run_id());
        assert_ne!(entries[0].run_id, entries[1].run_id);
    }

    #[test]
    fn unwritable_path_is_a_backup_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = BackupLog::new(dir.path().join("missing").join("backup.jsonl"));
        let err = log
            .record(ResourceKind::Instance, "x", &json!({}))
            .unwrap_err();
        assert!(matches!(err, MigrationError::Backup { .. }));
    }
}
