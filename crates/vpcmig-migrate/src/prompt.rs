//! Operator confirmation seam.

/// Asks the operator to confirm a destructive or irreversible step.
pub trait OperatorPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Confirms everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl OperatorPrompt for AssumeYes {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

/// Refuses everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl OperatorPrompt for AlwaysDecline {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}
