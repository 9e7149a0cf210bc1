//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of ledger structure invariants.
///
/// The recalculation engine itself never fails; these are raised when a
/// ledger is constructed from untrusted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    #[error("node with label '{label}' has an empty id")]
    EmptyId { label: String },

    #[error("node '{id}' has a non-finite value")]
    NonFiniteValue { id: String },
}
