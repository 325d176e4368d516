//! Error types for the permissions module.

use thiserror::Error;

/// Errors that can occur during permission and encryption operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The firm/role/membership backend failed.
    #[error("directory error: {0}")]
    Directory(String),

    /// Referenced firm does not exist.
    #[error("firm not found: {0}")]
    FirmNotFound(String),

    /// Referenced role does not exist or is deleted.
    #[error("role not found: {0}")]
    RoleNotFound(String),

    /// Referenced membership does not exist.
    #[error("membership not found: {0}")]
    MembershipNotFound(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error (authentication failure or truncated input).
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Key derivation error.
    #[error("key derivation error: {0}")]
    KeyDerivationError(String),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
