//! Storage traits: contract persistence and opaque blob storage.
//!
//! The lifecycle engine is storage-agnostic. Implementations include SQLite
//! (primary) and in-memory (for tests).

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use pactum_core::{
    ContentHash, Contract, ContractId, ContractParty, ContractRecord, ContractStatus, FileRef, FirmId, PartyId,
    SignatureEvent, Timestamp,
};

use crate::error::Result;

/// Column a contract listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Status,
    ExpiresAt,
}

impl OrderField {
    /// The SQL column for this field. Never built from caller input.
    pub const fn column(self) -> &'static str {
        match self {
            OrderField::CreatedAt => "created_at",
            OrderField::UpdatedAt => "updated_at",
            OrderField::Title => "title",
            OrderField::Status => "status",
            OrderField::ExpiresAt => "expires_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filters for listing a firm's contracts.
///
/// Every field is optional. `offset` is only honored together with `limit`.
/// The default ordering is newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    pub status: Option<ContractStatus>,
    pub is_template: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: OrderField,
    pub direction: SortDirection,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ContractStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn templates(mut self, is_template: bool) -> Self {
        self.is_template = Some(is_template);
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order_by(mut self, field: OrderField, direction: SortDirection) -> Self {
        self.order_by = field;
        self.direction = direction;
        self
    }

    /// Check if a contract passes the status/template filters.
    pub fn matches(&self, contract: &Contract) -> bool {
        self.status.map_or(true, |s| contract.status == s)
            && self.is_template.map_or(true, |t| contract.is_template == t)
    }
}

/// Result of a transactional signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutcome {
    /// The party after signing.
    pub party: ContractParty,
    /// The appended audit event.
    pub event: SignatureEvent,
    /// True if this call signed the last unsigned party and moved the
    /// contract to `signed`. Exactly one signer observes `true`.
    pub contract_signed: bool,
}

/// Async interface for contract persistence.
///
/// Every method that reads a status and then writes must do both atomically
/// with respect to other callers on the same contract.
#[async_trait]
pub trait ContractStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Contracts
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new contract.
    async fn insert_contract(&self, contract: &Contract) -> Result<()>;

    /// Get a live contract with its parties and audit trail.
    ///
    /// Soft-deleted contracts are reported as absent.
    async fn get_contract(&self, id: &ContractId) -> Result<Option<ContractRecord>>;

    /// List live contracts of a firm.
    async fn list_contracts(&self, firm_id: &FirmId, filter: &ListFilter) -> Result<Vec<Contract>>;

    /// Overwrite the mutable fields of a live contract, status included.
    ///
    /// The stored status must still equal `expected` or a `StatusConflict`
    /// is returned and nothing is written.
    async fn update_contract(&self, contract: &Contract, expected: ContractStatus) -> Result<()>;

    /// Compare-and-swap the status of a live contract.
    ///
    /// Moving into `pending_signature` fails with `NoParties` when the
    /// contract has none. The same holds for `update_contract`.
    async fn transition_status(
        &self,
        id: &ContractId,
        expected: ContractStatus,
        to: ContractStatus,
        at: Timestamp,
    ) -> Result<()>;

    /// Soft-delete a contract if its status is in `allowed`.
    async fn soft_delete_contract(
        &self,
        id: &ContractId,
        allowed: &[ContractStatus],
        at: Timestamp,
    ) -> Result<()>;

    /// Record a new file version.
    ///
    /// Atomically: set the file reference, reset every party to unsigned, and
    /// force the status to `draft`. Signature events are left untouched.
    async fn record_file(&self, id: &ContractId, file: &FileRef, at: Timestamp) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Parties
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a party. The contract must still be `draft`.
    async fn insert_party(&self, party: &ContractParty) -> Result<()>;

    /// Remove a party. The contract must still be `draft`.
    async fn delete_party(&self, contract_id: &ContractId, party_id: &PartyId) -> Result<()>;

    /// Mark a party signed, append the event, and complete the contract if no
    /// unsigned party remains. All in one transaction.
    ///
    /// Fails with `StatusConflict` unless the contract is `pending_signature`,
    /// and with `PartyAlreadySigned` if the party signed first. When
    /// `expected_file` is given, the contract's current file hash must still
    /// equal it or `FileChanged` is returned and nothing is written.
    async fn sign_party(
        &self,
        contract_id: &ContractId,
        party_id: &PartyId,
        expected_file: Option<&ContentHash>,
        event: &SignatureEvent,
    ) -> Result<SignOutcome>;
}

/// A stored blob with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    pub data: Bytes,
    pub content_type: String,
}

/// Opaque object storage addressed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path`, replacing any previous object.
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Fetch the object at `path`.
    async fn get(&self, path: &str) -> Result<Option<BlobObject>>;

    /// Delete the object at `path`. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::{NewContract, UserId};

    #[test]
    fn test_default_filter_is_newest_first() {
        let filter = ListFilter::default();
        assert_eq!(filter.order_by, OrderField::CreatedAt);
        assert_eq!(filter.direction, SortDirection::Desc);
        assert!(filter.limit.is_none());
    }

    #[test]
    fn test_filter_matches() {
        let mut contract = Contract::new(
            NewContract::titled("NDA").template(true),
            FirmId::generate(),
            UserId::generate(),
            0,
        );
        assert!(ListFilter::new().matches(&contract));
        assert!(ListFilter::new().templates(true).matches(&contract));
        assert!(!ListFilter::new().templates(false).matches(&contract));

        contract.status = ContractStatus::Void;
        assert!(!ListFilter::new().status(ContractStatus::Draft).matches(&contract));
        assert!(ListFilter::new().status(ContractStatus::Void).matches(&contract));
    }
}
