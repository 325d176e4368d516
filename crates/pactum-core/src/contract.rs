//! Contracts: the record whose status the lifecycle engine drives.

use serde::{Deserialize, Serialize};

use crate::crypto::ContentHash;
use crate::error::TransitionError;
use crate::party::ContractParty;
use crate::signature::SignatureEvent;
use crate::status::ContractStatus;
use crate::types::{ContractId, FirmId, Timestamp, UserId};

/// Whether a contract is live or soft-deleted.
///
/// A deleted contract always carries its deletion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Deleted { at: Timestamp },
}

impl Lifecycle {
    /// Check if the contract is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        matches!(self, Lifecycle::Deleted { .. })
    }

    /// The deletion time, if deleted.
    pub fn deleted_at(&self) -> Option<Timestamp> {
        match self {
            Lifecycle::Active => None,
            Lifecycle::Deleted { at } => Some(*at),
        }
    }
}

/// Reference to the encrypted document stored for a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Blob store path: `contracts/{contract_id}/{file_name}`.
    pub path: String,
    /// URL the HTTP layer serves the file from.
    pub url: String,
    /// SHA-256 of the plaintext.
    pub hash: ContentHash,
    /// Original file name.
    pub file_name: String,
    /// Original MIME type.
    pub content_type: String,
    /// Plaintext size in bytes.
    pub size: u64,
}

impl FileRef {
    /// Deterministic blob path for a contract file.
    pub fn blob_path(contract_id: &ContractId, file_name: &str) -> String {
        format!("contracts/{}/{}", contract_id, file_name)
    }

    /// The file name component of a blob path.
    pub fn file_name_from_path(path: &str) -> Option<&str> {
        path.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

/// A contract record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub firm_id: FirmId,
    pub creator_id: UserId,
    pub title: String,
    pub description: String,
    pub content: String,
    pub file: Option<FileRef>,
    pub status: ContractStatus,
    pub is_template: bool,
    pub expires_at: Option<Timestamp>,
    pub lifecycle: Lifecycle,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContract {
    pub title: String,
    pub description: String,
    pub content: String,
    pub is_template: bool,
    pub expires_at: Option<Timestamp>,
}

impl NewContract {
    /// Start a contract input with the given title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn template(mut self, is_template: bool) -> Self {
        self.is_template = is_template;
        self
    }

    pub fn expires_at(mut self, at: Timestamp) -> Self {
        self.expires_at = Some(at);
        self
    }
}

impl Contract {
    /// Build a fresh draft contract.
    pub fn new(input: NewContract, firm_id: FirmId, creator_id: UserId, now: Timestamp) -> Self {
        Self {
            id: ContractId::generate(),
            firm_id,
            creator_id,
            title: input.title,
            description: input.description,
            content: input.content,
            file: None,
            status: ContractStatus::Draft,
            is_template: input.is_template,
            expires_at: input.expires_at,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the contract is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted()
    }
}

/// A partial update. Absent or empty fields leave the contract untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub status: Option<ContractStatus>,
    pub expires_at: Option<Timestamp>,
}

impl ContractPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn status(mut self, status: ContractStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn expires_at(mut self, at: Timestamp) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Whether applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        present(&self.title).is_none()
            && present(&self.description).is_none()
            && present(&self.content).is_none()
            && self.status.is_none()
            && self.expires_at.is_none()
    }

    /// Apply the patch to a contract.
    ///
    /// The status change, if any, is validated first; on an invalid transition
    /// the contract is returned untouched. Returns the previous status when the
    /// status changed.
    pub fn apply(
        &self,
        contract: &mut Contract,
        now: Timestamp,
    ) -> Result<Option<ContractStatus>, TransitionError> {
        if let Some(target) = self.status {
            contract.status.check_transition(target)?;
        }

        if let Some(title) = present(&self.title) {
            contract.title = title.to_string();
        }
        if let Some(description) = present(&self.description) {
            contract.description = description.to_string();
        }
        if let Some(content) = present(&self.content) {
            contract.content = content.to_string();
        }
        if let Some(at) = self.expires_at {
            contract.expires_at = Some(at);
        }

        let previous = self.status.map(|target| {
            let from = contract.status;
            contract.status = target;
            from
        });

        contract.updated_at = now;
        Ok(previous)
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// A contract together with its parties and audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract: Contract,
    pub parties: Vec<ContractParty>,
    pub signature_events: Vec<SignatureEvent>,
}

impl ContractRecord {
    /// Find a party by id.
    pub fn party(&self, party_id: &crate::types::PartyId) -> Option<&ContractParty> {
        self.parties.iter().find(|p| &p.id == party_id)
    }

    /// Find the party linked to a registered user.
    pub fn party_for_user(&self, user_id: &UserId) -> Option<&ContractParty> {
        self.parties.iter().find(|p| p.user_id.as_ref() == Some(user_id))
    }

    /// Check if a user is a listed party.
    pub fn is_party(&self, user_id: &UserId) -> bool {
        self.party_for_user(user_id).is_some()
    }

    /// Number of parties that have not signed.
    pub fn unsigned_count(&self) -> usize {
        self.parties.iter().filter(|p| !p.has_signed()).count()
    }
}
