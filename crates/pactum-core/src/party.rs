//! Contract parties: the people or organizations who must sign.

use serde::{Deserialize, Serialize};

use crate::crypto::PartyKey;
use crate::types::{ContractId, PartyId, Timestamp, UserId};

/// Whether a party has signed the current version of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SignState {
    Unsigned,
    Signed { at: Timestamp },
}

/// A party named on a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractParty {
    pub id: PartyId,
    pub contract_id: ContractId,
    /// Registered user this party corresponds to, if any.
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    /// Free-form label, e.g. "client" or "counterparty".
    pub role: String,
    /// When set, signature payloads must be attestations under this key.
    pub verifying_key: Option<PartyKey>,
    pub sign_state: SignState,
    pub created_at: Timestamp,
}

impl ContractParty {
    /// Build an unsigned party for a contract.
    pub fn new(contract_id: ContractId, input: NewParty, now: Timestamp) -> Self {
        Self {
            id: PartyId::generate(),
            contract_id,
            user_id: input.user_id,
            name: input.name.trim().to_string(),
            email: input.email,
            mobile: input.mobile,
            role: input.role,
            verifying_key: input.verifying_key,
            sign_state: SignState::Unsigned,
            created_at: now,
        }
    }

    pub fn has_signed(&self) -> bool {
        matches!(self.sign_state, SignState::Signed { .. })
    }

    pub fn signed_at(&self) -> Option<Timestamp> {
        match self.sign_state {
            SignState::Unsigned => None,
            SignState::Signed { at } => Some(at),
        }
    }

    /// Mark the party as signed.
    pub fn mark_signed(&mut self, at: Timestamp) {
        self.sign_state = SignState::Signed { at };
    }

    /// Clear any signature (a new document version was uploaded).
    pub fn reset_signature(&mut self) {
        self.sign_state = SignState::Unsigned;
    }
}

/// Input for adding a party to a contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParty {
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub role: String,
    pub verifying_key: Option<PartyKey>,
}

impl NewParty {
    /// Start a party input with a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile = Some(mobile.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn verifying_key(mut self, key: PartyKey) -> Self {
        self.verifying_key = Some(key);
        self
    }
}
