//! Per-contract content encryption.
//!
//! Each contract gets its own 256-bit key, derived deterministically from the
//! master secret and the contract id:
//!
//! ```text
//! mac = HMAC-SHA256(master_secret, contract_id)
//! key = BLAKE3-derive-key("pactum-contract-file-v1", mac)
//! ```
//!
//! Files are sealed with ChaCha20-Poly1305. The 12-byte random nonce is
//! prepended to the ciphertext. Rotating the master secret makes every stored
//! file unreadable at once.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use pactum_core::ContractId;

use crate::error::{PermsError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Context string for the BLAKE3 key derivation step.
pub const KEY_DERIVATION_CONTEXT: &str = "pactum-contract-file-v1";

/// Nonce length prepended to every ciphertext.
pub const NONCE_LEN: usize = 12;

/// Poly1305 authentication tag length.
pub const TAG_LEN: usize = 16;

/// The process-wide master secret. Never printed.
#[derive(Clone)]
pub struct MasterSecret(Vec<u8>);

impl MasterSecret {
    /// Wrap secret bytes. Empty secrets are rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(PermsError::KeyDerivationError(
                "master secret is empty".into(),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterSecret([REDACTED; {}])", self.0.len())
    }
}

/// A 256-bit ChaCha20-Poly1305 key scoped to one contract.
#[derive(Clone, PartialEq, Eq)]
pub struct ContractKey([u8; 32]);

impl ContractKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContractKey([REDACTED])")
    }
}

/// Derives per-contract keys and seals/opens file contents.
#[derive(Debug, Clone)]
pub struct ContentEncryptionService {
    master: MasterSecret,
}

impl ContentEncryptionService {
    pub fn new(master: MasterSecret) -> Self {
        Self { master }
    }

    /// Derive the key for a contract. Deterministic for a fixed master secret.
    pub fn derive_key(&self, contract_id: &ContractId) -> Result<ContractKey> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.master.as_bytes())
            .map_err(|e| PermsError::KeyDerivationError(e.to_string()))?;
        mac.update(contract_id.to_string().as_bytes());
        let tag = mac.finalize().into_bytes();

        let mut hasher = blake3::Hasher::new_derive_key(KEY_DERIVATION_CONTEXT);
        hasher.update(&tag);
        Ok(ContractKey(*hasher.finalize().as_bytes()))
    }

    /// Encrypt under `key`. Output is `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8], key: &ContractKey) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|e| PermsError::EncryptionError(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| PermsError::EncryptionError(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt output of [`encrypt`](Self::encrypt).
    ///
    /// Fails on truncated input or any authentication failure.
    pub fn decrypt(&self, ciphertext: &[u8], key: &ContractKey) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(PermsError::DecryptionError(format!(
                "ciphertext too short: {} bytes",
                ciphertext.len()
            )));
        }

        let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|e| PermsError::DecryptionError(e.to_string()))?;

        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| PermsError::DecryptionError("authentication failed".into()))
    }

    /// Derive the contract key and encrypt.
    pub fn seal(&self, contract_id: &ContractId, plaintext: &[u8]) -> Result<Vec<u8>> {
        let key = self.derive_key(contract_id)?;
        self.encrypt(plaintext, &key)
    }

    /// Derive the contract key and decrypt.
    pub fn open(&self, contract_id: &ContractId, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let key = self.derive_key(contract_id)?;
        self.decrypt(ciphertext, &key)
    }
}
