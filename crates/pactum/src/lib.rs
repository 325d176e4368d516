//! # Pactum
//!
//! Contract lifecycle and multi-party signature engine for law firms.
//!
//! ## Overview
//!
//! Pactum drives a contract from draft to signed:
//!
//! - **Contracts**: Firm-owned records with a status state machine
//! - **Files**: Each document version is encrypted under a per-contract key
//! - **Parties**: Editable while a draft; locked once signing begins
//! - **Signatures**: Append-only audit trail; the last signer completes the
//!   contract exactly once
//! - **Roles**: Firm members hold one role with independent capability flags;
//!   the firm owner holds every capability
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pactum::{ContractLifecycle, EngineConfig};
//! use pactum::core::{FirmId, NewContract, UserId};
//! use pactum::store::{FsBlobStore, SqliteStore};
//!
//! async fn example(actor: UserId, firm: FirmId) {
//!     let config = EngineConfig::from_env().unwrap();
//!
//!     // One SQLite database holds contracts and the firm directory
//!     let db = Arc::new(SqliteStore::open("pactum.db").unwrap());
//!     let blobs = Arc::new(FsBlobStore::new("blobs"));
//!
//!     let engine = ContractLifecycle::new(Arc::clone(&db), blobs, db, config);
//!
//!     let contract = engine
//!         .create_contract(&actor, &firm, NewContract::titled("NDA"))
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `pactum::core` - Data model, status table, validation
//! - `pactum::perms` - Capabilities, role cache, per-contract encryption
//! - `pactum::store` - Contract and blob storage

pub mod config;
pub mod engine;
pub mod error;
pub mod firm;

pub use pactum_core as core;
pub use pactum_perms as perms;
pub use pactum_store as store;

pub use config::{ConfigError, EngineConfig};
pub use engine::{ContractFile, ContractLifecycle};
pub use error::{LifecycleError, Result};
pub use firm::FirmAdmin;

pub use pactum_core::{
    Contract, ContractId, ContractParty, ContractPatch, ContractRecord, ContractStatus, FileRef,
    FirmId, NewContract, NewParty, PartyId, SignatureEvent, SignatureRequest, UserId,
};
pub use pactum_perms::{Capability, RoleFlags};
pub use pactum_store::{ListFilter, OrderField, SignOutcome, SortDirection};
