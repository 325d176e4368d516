//! Error types for the Pactum core.

use thiserror::Error;

use crate::status::ContractStatus;

/// A caller requested a status change the transition table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition from {from} to {to}")]
pub struct TransitionError {
    pub from: ContractStatus,
    pub to: ContractStatus,
}

/// Malformed input rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} is too long: {len} > {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("invalid mobile number: {0}")]
    InvalidMobile(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("file is empty")]
    EmptyFile,

    #[error("file too large: {size} > {max} bytes")]
    FileTooLarge { size: usize, max: usize },

    #[error("expiry {expires_at} precedes creation {created_at}")]
    ExpiryBeforeCreation { expires_at: i64, created_at: i64 },

    #[error("signature payload is empty")]
    EmptySignature,

    #[error("malformed signature attestation: {0}")]
    MalformedAttestation(String),

    #[error("signature attestation does not verify")]
    AttestationFailed,

    #[error("contract has no file to sign against")]
    MissingFile,

    #[error("contract has no parties to sign")]
    NoParties,
}

/// Errors decoding persisted values back into core types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("invalid verifying key: {0}")]
    InvalidVerifyingKey(String),

    #[error(transparent)]
    UnknownStatus(#[from] crate::status::UnknownStatus),
}
