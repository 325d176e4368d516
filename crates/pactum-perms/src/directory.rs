//! Directory: the query interface over firms, roles, and memberships.
//!
//! The permission evaluator only reads through this trait; the firm
//! administration service writes through it. [`MemoryDirectory`] backs tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use pactum_core::{FirmId, RoleId, Timestamp, UserId};

use crate::capability::{Firm, LawFirmRole, Membership};
use crate::error::{PermsError, Result};

/// Async interface for firm, role, and membership storage.
#[async_trait]
pub trait Directory: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Firms
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a firm by id (deleted firms included).
    async fn get_firm(&self, firm_id: &FirmId) -> Result<Option<Firm>>;

    /// Insert or replace a firm.
    async fn put_firm(&self, firm: &Firm) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a role by id (deleted roles included).
    async fn get_role(&self, role_id: &RoleId) -> Result<Option<LawFirmRole>>;

    /// Insert or replace a role.
    async fn put_role(&self, role: &LawFirmRole) -> Result<()>;

    /// Soft-delete a role. Returns whether a live role was deleted.
    async fn delete_role(&self, role_id: &RoleId, at: Timestamp) -> Result<bool>;

    /// List live roles of a firm.
    async fn list_roles(&self, firm_id: &FirmId) -> Result<Vec<LawFirmRole>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Memberships
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a user's membership in a firm.
    async fn get_membership(&self, user_id: &UserId, firm_id: &FirmId)
        -> Result<Option<Membership>>;

    /// Insert a membership, replacing any existing one for the same user and firm.
    async fn put_membership(&self, membership: &Membership) -> Result<()>;

    /// Remove a user's membership. Returns whether one existed.
    async fn remove_membership(&self, user_id: &UserId, firm_id: &FirmId) -> Result<bool>;

    /// List memberships of a firm.
    async fn list_members(&self, firm_id: &FirmId) -> Result<Vec<Membership>>;
}

/// In-memory directory.
///
/// All data is lost when dropped. Thread-safe via RwLock.
pub struct MemoryDirectory {
    inner: RwLock<MemoryDirectoryInner>,
}

#[derive(Default)]
struct MemoryDirectoryInner {
    firms: HashMap<FirmId, Firm>,
    roles: HashMap<RoleId, LawFirmRole>,
    /// Keyed by (user, firm): one membership per user per firm.
    memberships: HashMap<(UserId, FirmId), Membership>,
}

impl MemoryDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryDirectoryInner::default()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryDirectoryInner>> {
        self.inner
            .read()
            .map_err(|e| PermsError::Directory(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryDirectoryInner>> {
        self.inner
            .write()
            .map_err(|e| PermsError::Directory(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn get_firm(&self, firm_id: &FirmId) -> Result<Option<Firm>> {
        Ok(self.read()?.firms.get(firm_id).cloned())
    }

    async fn put_firm(&self, firm: &Firm) -> Result<()> {
        self.write()?.firms.insert(firm.id, firm.clone());
        Ok(())
    }

    async fn get_role(&self, role_id: &RoleId) -> Result<Option<LawFirmRole>> {
        Ok(self.read()?.roles.get(role_id).cloned())
    }

    async fn put_role(&self, role: &LawFirmRole) -> Result<()> {
        self.write()?.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn delete_role(&self, role_id: &RoleId, at: Timestamp) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.roles.get_mut(role_id) {
            Some(role) if !role.is_deleted => {
                role.is_deleted = true;
                role.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_roles(&self, firm_id: &FirmId) -> Result<Vec<LawFirmRole>> {
        let inner = self.read()?;
        let mut roles: Vec<_> = inner
            .roles
            .values()
            .filter(|r| &r.firm_id == firm_id && !r.is_deleted)
            .cloned()
            .collect();
        roles.sort_by_key(|r| (r.created_at, r.id));
        Ok(roles)
    }

    async fn get_membership(
        &self,
        user_id: &UserId,
        firm_id: &FirmId,
    ) -> Result<Option<Membership>> {
        Ok(self.read()?.memberships.get(&(*user_id, *firm_id)).cloned())
    }

    async fn put_membership(&self, membership: &Membership) -> Result<()> {
        self.write()?
            .memberships
            .insert((membership.user_id, membership.firm_id), membership.clone());
        Ok(())
    }

    async fn remove_membership(&self, user_id: &UserId, firm_id: &FirmId) -> Result<bool> {
        Ok(self
            .write()?
            .memberships
            .remove(&(*user_id, *firm_id))
            .is_some())
    }

    async fn list_members(&self, firm_id: &FirmId) -> Result<Vec<Membership>> {
        let inner = self.read()?;
        let mut members: Vec<_> = inner
            .memberships
            .values()
            .filter(|m| &m.firm_id == firm_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.created_at, m.id));
        Ok(members)
    }
}
