//! # Pactum Store
//!
//! Storage abstraction for Pactum. Provides trait-based interfaces for
//! contract persistence and opaque blob storage, with SQLite, filesystem, and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`ContractStore`] - Async trait for contracts, parties, and the audit trail
//! - [`BlobStore`] - Async trait for put/get/delete of encrypted file bytes
//! - [`SqliteStore`] - SQLite storage; also implements the permissions `Directory`
//! - [`FsBlobStore`] - Blob storage on the local filesystem
//! - [`MemoryContractStore`], [`MemoryBlobStore`] - In-memory storage for tests
//! - [`ListFilter`] - Typed filters and ordering for listings
//! - [`SignOutcome`] - Result of the transactional sign operation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pactum_store::{ContractStore, ListFilter, SqliteStore};
//!
//! async fn example(firm: pactum_core::FirmId) {
//!     let store = SqliteStore::open("pactum.db").unwrap();
//!     let drafts = store
//!         .list_contracts(&firm, &ListFilter::new().status(pactum_core::ContractStatus::Draft))
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Compare-and-swap status**: every write that depends on the current
//!   status re-checks it inside the same transaction and reports
//!   `StatusConflict` if it moved.
//! - **Exactly-once completion**: `sign_party` marks the party, appends the
//!   event, counts unsigned parties, and completes the contract atomically.
//! - **Soft delete**: deleted contracts stay in storage but are never returned.

pub mod error;
pub mod fs_blob;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs_blob::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryContractStore};
pub use sqlite::SqliteStore;
pub use traits::{
    BlobObject, BlobStore, ContractStore, ListFilter, OrderField, SignOutcome, SortDirection,
};
