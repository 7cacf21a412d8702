//! Process exit codes.

use vpcmig_migrate::MigrationError;

pub const SUCCESS: u8 = 0;
/// The migration failed (rolled back) or the run never started.
pub const FAILED: u8 = 1;
/// Rollback failed; resources may be lost and the backup log is needed.
pub const ROLLBACK_FAILED: u8 = 2;
/// The operator refused a confirmation.
pub const DECLINED: u8 = 3;

/// Exit code for a run that ended in `err`.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<MigrationError>() {
        Some(MigrationError::RollbackFailed { .. }) => ROLLBACK_FAILED,
        Some(e) if e.is_declined() => DECLINED,
        _ => FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cause() -> Box<MigrationError> {
        Box::new(MigrationError::UnchangedName { name: "vm".into() })
    }

    #[test]
    fn rollback_failure_is_distinguished() {
        let err = anyhow::Error::new(MigrationError::RollbackFailed {
            resource: "instance vm".into(),
            cause: cause(),
            rollback: cause(),
            backup_log: "backup.jsonl".into(),
        });
        assert_eq!(exit_code_for(&err), ROLLBACK_FAILED);
    }

    #[test]
    fn declines_are_found_inside_migration_failed() {
        let err = anyhow::Error::new(MigrationError::MigrationFailed {
            resource: "instance group ig".into(),
            cause: Box::new(MigrationError::OperatorDeclined("autoscaler".into())),
        });
        assert_eq!(exit_code_for(&err), DECLINED);
        let direct = anyhow::Error::new(MigrationError::OperatorDeclined("ip".into()));
        assert_eq!(exit_code_for(&direct), DECLINED);
    }

    #[test]
    fn everything_else_is_a_plain_failure() {
        let rolled_back = anyhow::Error::new(MigrationError::MigrationFailed {
            resource: "instance vm".into(),
            cause: cause(),
        });
        assert_eq!(exit_code_for(&rolled_back), FAILED);
        assert_eq!(exit_code_for(&anyhow::anyhow!("no token")), FAILED);
    }
}
