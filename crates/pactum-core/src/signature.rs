//! Signature events: the append-only audit trail of a contract.

use serde::{Deserialize, Serialize};

use crate::types::{ContractId, PartyId, SignatureEventId, Timestamp, UserId};

/// Action label recorded when a party signs.
pub const ACTION_SIGNED: &str = "signed";

/// One entry in a contract's signature audit trail. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEvent {
    pub id: SignatureEventId,
    pub contract_id: ContractId,
    pub user_id: UserId,
    pub party_id: PartyId,
    pub action: String,
    /// Opaque signature payload (attestation hex, base64 image, ...).
    pub signature: String,
    pub ip_address: String,
    pub user_agent: String,
    pub timestamp: Timestamp,
}

/// Request metadata captured alongside a signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub signature: String,
    pub ip_address: String,
    pub user_agent: String,
}

impl SignatureRequest {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            ..Self::default()
        }
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = ip.into();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }
}

impl SignatureEvent {
    /// Build a "signed" event for a party.
    pub fn signed(
        contract_id: ContractId,
        party_id: PartyId,
        user_id: UserId,
        request: SignatureRequest,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SignatureEventId::generate(),
            contract_id,
            user_id,
            party_id,
            action: ACTION_SIGNED.to_string(),
            signature: request.signature,
            ip_address: request.ip_address,
            user_agent: request.user_agent,
            timestamp: now,
        }
    }
}
