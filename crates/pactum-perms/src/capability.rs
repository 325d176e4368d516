//! Capabilities, roles, memberships, and firms.
//!
//! A role carries four independent flags. Holding one flag never implies
//! another: a role with `write` but not `read` cannot list contracts.

use serde::{Deserialize, Serialize};
use std::fmt;

use pactum_core::{FirmId, MembershipId, RoleId, Timestamp, UserId};

/// A permission a role may grant over a firm's resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// View contracts, roles, and members.
    Read,
    /// Create and edit contracts, upload files, manage parties.
    Write,
    /// Destructive contract actions (soft delete).
    Manage,
    /// Administer roles and memberships.
    FirmAdmin,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Read,
        Capability::Write,
        Capability::Manage,
        Capability::FirmAdmin,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::Manage => "manage",
            Capability::FirmAdmin => "admin",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four independent permission flags of a role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleFlags {
    pub read: bool,
    pub write: bool,
    pub manage: bool,
    pub firm_admin: bool,
}

impl RoleFlags {
    /// No permissions.
    pub const NONE: Self = Self {
        read: false,
        write: false,
        manage: false,
        firm_admin: false,
    };

    /// Every permission.
    pub const ALL: Self = Self {
        read: true,
        write: true,
        manage: true,
        firm_admin: true,
    };

    /// Flags granting exactly the listed capabilities.
    pub fn of(capabilities: &[Capability]) -> Self {
        let mut flags = Self::NONE;
        for cap in capabilities {
            flags.set(*cap, true);
        }
        flags
    }

    /// Check if these flags grant a capability.
    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.read,
            Capability::Write => self.write,
            Capability::Manage => self.manage,
            Capability::FirmAdmin => self.firm_admin,
        }
    }

    /// Set or clear a single flag.
    pub fn set(&mut self, capability: Capability, value: bool) {
        match capability {
            Capability::Read => self.read = value,
            Capability::Write => self.write = value,
            Capability::Manage => self.manage = value,
            Capability::FirmAdmin => self.firm_admin = value,
        }
    }
}

/// A firm-scoped role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawFirmRole {
    pub id: RoleId,
    pub firm_id: FirmId,
    pub name: String,
    pub flags: RoleFlags,
    pub is_deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LawFirmRole {
    /// Create a new live role.
    pub fn new(firm_id: FirmId, name: impl Into<String>, flags: RoleFlags, now: Timestamp) -> Self {
        Self {
            id: RoleId::generate(),
            firm_id,
            name: name.into(),
            flags,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this role grants a capability on the given firm.
    pub fn grants(&self, firm_id: &FirmId, capability: Capability) -> bool {
        !self.is_deleted && &self.firm_id == firm_id && self.flags.grants(capability)
    }
}

/// Binds a user to a firm with exactly one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub firm_id: FirmId,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Membership {
    pub fn new(firm_id: FirmId, user_id: UserId, role_id: RoleId, now: Timestamp) -> Self {
        Self {
            id: MembershipId::generate(),
            firm_id,
            user_id,
            role_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A law firm. The owner holds every capability regardless of roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firm {
    pub id: FirmId,
    pub name: String,
    pub owner_id: UserId,
    pub is_deleted: bool,
    pub created_at: Timestamp,
}

impl Firm {
    pub fn new(name: impl Into<String>, owner_id: UserId, now: Timestamp) -> Self {
        Self {
            id: FirmId::generate(),
            name: name.into(),
            owner_id,
            is_deleted: false,
            created_at: now,
        }
    }

    /// Check if a user owns this (live) firm.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        !self.is_deleted && &self.owner_id == user_id
    }
}
