//! # Pactum Core
//!
//! Pure data model for the Pactum contract engine: contracts, parties,
//! signature events, and the status transition table.
//!
//! This crate contains no I/O, no storage, no encryption. It is pure
//! computation over plain records.
//!
//! ## Key Types
//!
//! - [`Contract`] - A contract owned by a law firm
//! - [`ContractStatus`] - `draft`, `pending_signature`, `signed`, `void`
//! - [`ContractParty`] - Someone who must sign
//! - [`SignatureEvent`] - Append-only audit entry
//! - [`Lifecycle`] - Active or soft-deleted (with the deletion time)
//!
//! ## Status Transitions
//!
//! ```text
//! draft ──────────► pending_signature ──(last party signs)──► signed
//!   │                      │                                    │
//!   └──────────► void ◄────┴────────────────────────────────────┘
//! ```
//!
//! Uploading a new file forces any status back to `draft`.

pub mod contract;
pub mod crypto;
pub mod error;
pub mod party;
pub mod signature;
pub mod status;
pub mod types;
pub mod validation;

pub use contract::{Contract, ContractPatch, ContractRecord, FileRef, Lifecycle, NewContract};
pub use crypto::{attestation_message, ContentHash, PartyKey, ATTESTATION_DOMAIN};
pub use error::{CoreError, TransitionError, ValidationError};
pub use party::{ContractParty, NewParty, SignState};
pub use signature::{SignatureEvent, SignatureRequest, ACTION_SIGNED};
pub use status::{ContractStatus, UnknownStatus};
pub use types::{
    now_millis, ContractId, FirmId, MembershipId, PartyId, RoleId, SignatureEventId, Timestamp,
    UserId, Uuid,
};
