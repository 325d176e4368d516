//! Contract status and the transition table that governs it.
//!
//! Callers may only request the transitions listed in
//! [`ContractStatus::allowed_targets`]. The move from `pending_signature` to
//! `signed` is never requested directly; it happens inside the store when the
//! last unsigned party signs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TransitionError;

/// The lifecycle status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Editable. Parties may be added or removed.
    Draft,
    /// Signature collection is open. Parties are locked.
    PendingSignature,
    /// Every party has signed.
    Signed,
    /// Cancelled. Terminal.
    Void,
}

impl ContractStatus {
    /// Every status, in declaration order.
    pub const ALL: [ContractStatus; 4] = [
        ContractStatus::Draft,
        ContractStatus::PendingSignature,
        ContractStatus::Signed,
        ContractStatus::Void,
    ];

    /// Statuses a caller may request from this status.
    pub fn allowed_targets(self) -> &'static [ContractStatus] {
        match self {
            ContractStatus::Draft => &[ContractStatus::PendingSignature, ContractStatus::Void],
            ContractStatus::PendingSignature => &[ContractStatus::Void],
            ContractStatus::Signed => &[ContractStatus::Void],
            ContractStatus::Void => &[],
        }
    }

    /// Check if a caller may move a contract from this status to `target`.
    pub fn can_transition_to(self, target: ContractStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Validate a caller-requested transition.
    pub fn check_transition(self, target: ContractStatus) -> Result<(), TransitionError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(TransitionError {
                from: self,
                to: target,
            })
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Whether the parties list may still change.
    pub fn parties_editable(self) -> bool {
        matches!(self, ContractStatus::Draft)
    }

    /// Whether a contract in this status may be soft-deleted.
    pub fn is_deletable(self) -> bool {
        matches!(self, ContractStatus::Draft | ContractStatus::Void)
    }

    /// The wire/database label.
    pub const fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::PendingSignature => "pending_signature",
            ContractStatus::Signed => "signed",
            ContractStatus::Void => "void",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown contract status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ContractStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ContractStatus::Draft),
            "pending_signature" => Ok(ContractStatus::PendingSignature),
            "signed" => Ok(ContractStatus::Signed),
            "void" => Ok(ContractStatus::Void),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
