//! # Pactum Permissions
//!
//! Firm-scoped authorization and per-contract file encryption.
//!
//! ## Authorization Model
//!
//! - **Firm owner**: a single user id on the firm record. Holds every capability.
//! - **Role**: four independent flags (`read`, `write`, `manage`, `firm_admin`).
//! - **Membership**: binds a user to a firm with exactly one role.
//!
//! [`PermissionEvaluator`] resolves roles through a [`Directory`] and caches the
//! answer in a [`RoleCache`] that administrative writes invalidate.
//!
//! ## Encryption Model
//!
//! [`ContentEncryptionService`] derives one key per contract from a master
//! secret (HMAC-SHA256, then BLAKE3 key derivation) and seals files with
//! ChaCha20-Poly1305.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pactum_perms::{Capability, MemoryDirectory, PermissionEvaluator, RoleCache};
//!
//! # async fn demo(user: pactum_core::UserId, firm: pactum_core::FirmId) -> pactum_perms::Result<()> {
//! let directory = Arc::new(MemoryDirectory::new());
//! let cache = Arc::new(RoleCache::new(Duration::from_secs(60)));
//! let evaluator = PermissionEvaluator::new(directory, cache);
//! let may_read = evaluator.has_permission(&user, &firm, Capability::Read).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod capability;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod evaluator;

pub use cache::RoleCache;
pub use capability::{Capability, Firm, LawFirmRole, Membership, RoleFlags};
pub use crypto::{ContentEncryptionService, ContractKey, MasterSecret, NONCE_LEN, TAG_LEN};
pub use directory::{Directory, MemoryDirectory};
pub use error::{PermsError, Result};
pub use evaluator::PermissionEvaluator;
