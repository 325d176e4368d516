//! Error types for the lifecycle engine.
//!
//! Every operation returns exactly one of these kinds. Lower-layer errors are
//! classified on the way up; nothing is logged and swallowed.

use pactum_core::{ContractStatus, TransitionError, ValidationError};
use pactum_perms::PermsError;
use pactum_store::StoreError;
use thiserror::Error;

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Entity absent or soft-deleted.
    #[error("not found: {0}")]
    NotFound(String),

    /// The actor lacks the required capability or relationship.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested status change is illegal from the current status.
    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: ContractStatus,
        to: ContractStatus,
    },

    /// The party has already signed the current version.
    #[error("party already signed: {0}")]
    AlreadySigned(String),

    /// Key derivation, AEAD sealing, or blob write failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Key derivation, AEAD authentication, integrity check, or blob read failed.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Malformed input.
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// The underlying store is unavailable or failed.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl From<TransitionError> for LifecycleError {
    fn from(e: TransitionError) -> Self {
        LifecycleError::InvalidStatusTransition {
            from: e.from,
            to: e.to,
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => LifecycleError::NotFound(what),
            StoreError::PartyNotFound(id) => LifecycleError::NotFound(format!("party {}", id)),
            StoreError::PartyAlreadySigned(id) => LifecycleError::AlreadySigned(id),
            StoreError::FileChanged(_) => ValidationError::AttestationFailed.into(),
            StoreError::NoParties(_) => ValidationError::NoParties.into(),
            StoreError::StatusConflict { expected, actual } => {
                LifecycleError::InvalidStatusTransition {
                    from: actual,
                    to: expected.first().copied().unwrap_or(actual),
                }
            }
            other => LifecycleError::StorageFailure(other.to_string()),
        }
    }
}

impl From<PermsError> for LifecycleError {
    fn from(e: PermsError) -> Self {
        match e {
            PermsError::FirmNotFound(what)
            | PermsError::RoleNotFound(what)
            | PermsError::MembershipNotFound(what) => LifecycleError::NotFound(what),
            PermsError::EncryptionError(msg) | PermsError::KeyDerivationError(msg) => {
                LifecycleError::EncryptionFailed(msg)
            }
            PermsError::DecryptionError(msg) => LifecycleError::DecryptionFailed(msg),
            PermsError::Directory(msg) => LifecycleError::StorageFailure(msg),
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;
