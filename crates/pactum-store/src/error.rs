//! Error types for the store module.

use pactum_core::ContractStatus;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Contract (or other entity) not found or soft-deleted.
    #[error("not found: {0}")]
    NotFound(String),

    /// The contract's status is not one the operation accepts.
    #[error("status conflict: expected one of {expected:?}, found {actual}")]
    StatusConflict {
        expected: Vec<ContractStatus>,
        actual: ContractStatus,
    },

    /// Party not found on the contract.
    #[error("party not found: {0}")]
    PartyNotFound(String),

    /// Party has already signed the current version.
    #[error("party already signed: {0}")]
    PartyAlreadySigned(String),

    /// The contract's file changed since the signer's snapshot.
    #[error("file changed: {0}")]
    FileChanged(String),

    /// A contract cannot await signatures without parties.
    #[error("no parties: {0}")]
    NoParties(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob store rejected the request or is unavailable.
    #[error("blob store error: {0}")]
    Blob(String),

    /// Internal lock poisoned or blocking task failed.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn status_conflict(expected: &[ContractStatus], actual: ContractStatus) -> Self {
        StoreError::StatusConflict {
            expected: expected.to_vec(),
            actual,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for pactum_perms::PermsError {
    fn from(e: StoreError) -> Self {
        pactum_perms::PermsError::Directory(e.to_string())
    }
}
