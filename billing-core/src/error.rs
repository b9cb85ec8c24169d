//! Error types for the billing engine

use thiserror::Error;

/// Result type for billing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Billing errors
///
/// Charge ineligibility is not represented here: `charge` and `batch_charge`
/// report it as a typed outcome carrying a [`crate::types::ChargeReason`],
/// because a declined charge is an expected business result, not a defect.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or duplicate input, rejected before any mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced plan/subscription/order absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller lacks the required role
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation invalid for the current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// External ledger rejected a push/pull
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Snapshot storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::ledger::LedgerError> for Error {
    fn from(err: crate::ledger::LedgerError) -> Self {
        Error::Transfer(err.to_string())
    }
}

impl Error {
    /// True for the validation/authorization/not-found/state family that
    /// aborts an operation with zero side effects.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::NotFound(_) | Error::Unauthorized(_) | Error::InvalidState(_)
        )
    }
}
