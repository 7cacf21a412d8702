//! Errors raised while interpreting resource references.

use thiserror::Error;

/// Error interpreting a compute resource reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The reference does not name a project and a known resource collection.
    #[error("unresolvable resource reference: {0}")]
    UnresolvableReference(String),

    /// The reference resolved, but to a different kind than required.
    #[error("expected a {expected} reference, got {actual} in {link}")]
    UnexpectedKind {
        /// Kind the caller asked for.
        expected: String,
        /// Kind found in the reference.
        actual: String,
        /// The offending reference.
        link: String,
    },
}
