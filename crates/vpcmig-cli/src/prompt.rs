//! Interactive confirmation on the operator's terminal.

use vpcmig_migrate::OperatorPrompt;

/// Asks on stderr via `dialoguer`; defaults to "no". A prompt that cannot be
/// shown (no terminal, read error) counts as a refusal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl OperatorPrompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> bool {
        match dialoguer::Confirm::new()
            .with_prompt(format!("{message}. Continue?"))
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "confirmation prompt unavailable; treating as declined");
                false
            }
        }
    }
}
