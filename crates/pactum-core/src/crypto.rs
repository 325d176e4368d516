//! Content hashing and signature attestation.
//!
//! File content is addressed by SHA-256. Parties that register an Ed25519
//! verifying key sign an attestation binding the contract id to the hash of
//! the file they saw.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{CoreError, ValidationError};
use crate::types::ContractId;

/// Domain prefix for signature attestations.
pub const ATTESTATION_DOMAIN: &[u8] = b"pactum-sign-v1:";

/// A 32-byte SHA-256 content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHash(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidHash(format!("expected 32 bytes: {s}")))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHA256({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An Ed25519 verifying key registered on a contract party.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyKey(pub [u8; 32]);

impl PartyKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes =
            hex::decode(s).map_err(|e| CoreError::InvalidVerifyingKey(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidVerifyingKey("expected 32 bytes".into()))?;
        Ok(Self(arr))
    }

    /// Verify a hex-encoded signature over the attestation for a contract file.
    pub fn verify_attestation(
        &self,
        contract_id: &ContractId,
        file_hash: &ContentHash,
        signature_hex: &str,
    ) -> Result<(), ValidationError> {
        let key = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| ValidationError::MalformedAttestation(e.to_string()))?;

        let sig_bytes = hex::decode(signature_hex.trim())
            .map_err(|e| ValidationError::MalformedAttestation(e.to_string()))?;
        let sig_arr: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| ValidationError::MalformedAttestation("expected 64 bytes".into()))?;
        let signature = Signature::from_bytes(&sig_arr);

        let message = attestation_message(contract_id, file_hash);
        key.verify(&message, &signature)
            .map_err(|_| ValidationError::AttestationFailed)
    }
}

impl fmt::Debug for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartyKey({})", &self.to_hex()[..16])
    }
}

/// The message a keyed party signs: `domain || contract_id || ":" || file_hash`.
pub fn attestation_message(contract_id: &ContractId, file_hash: &ContentHash) -> Vec<u8> {
    let mut msg = Vec::with_capacity(ATTESTATION_DOMAIN.len() + 36 + 1 + 64);
    msg.extend_from_slice(ATTESTATION_DOMAIN);
    msg.extend_from_slice(contract_id.to_string().as_bytes());
    msg.push(b':');
    msg.extend_from_slice(file_hash.to_hex().as_bytes());
    msg
}
