//! Permission evaluation.
//!
//! Answers "may this user exercise this capability on this firm?". The firm
//! owner always may. Everyone else needs a live membership whose live role
//! carries the specific flag.

use std::sync::Arc;

use pactum_core::{FirmId, UserId};

use crate::cache::RoleCache;
use crate::capability::{Capability, LawFirmRole};
use crate::directory::Directory;
use crate::error::Result;

/// Evaluates capabilities against a [`Directory`], caching role resolution.
pub struct PermissionEvaluator<D: Directory> {
    directory: Arc<D>,
    cache: Arc<RoleCache>,
}

impl<D: Directory> PermissionEvaluator<D> {
    /// Create an evaluator over a directory, sharing the given cache.
    pub fn new(directory: Arc<D>, cache: Arc<RoleCache>) -> Self {
        Self { directory, cache }
    }

    /// Get the underlying directory.
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Get the role cache.
    pub fn cache(&self) -> &Arc<RoleCache> {
        &self.cache
    }

    /// Check if `user_id` owns the firm. Deleted or missing firms have no owner.
    pub async fn is_owner(&self, user_id: &UserId, firm_id: &FirmId) -> Result<bool> {
        Ok(self
            .directory
            .get_firm(firm_id)
            .await?
            .map(|firm| firm.is_owned_by(user_id))
            .unwrap_or(false))
    }

    /// Check a capability.
    ///
    /// Ownership short-circuits to `true`. Flags are independent: holding
    /// `write` does not imply `read`.
    pub async fn has_permission(
        &self,
        user_id: &UserId,
        firm_id: &FirmId,
        capability: Capability,
    ) -> Result<bool> {
        let firm = match self.directory.get_firm(firm_id).await? {
            Some(firm) if !firm.is_deleted => firm,
            _ => return Ok(false),
        };

        if firm.owner_id == *user_id {
            return Ok(true);
        }

        let granted = self
            .resolve_role(user_id, firm_id)
            .await?
            .map(|role| role.grants(firm_id, capability))
            .unwrap_or(false);

        if !granted {
            tracing::debug!(
                actor = %user_id,
                firm_id = %firm_id,
                capability = %capability,
                "capability not granted"
            );
        }
        Ok(granted)
    }

    /// Resolve the user's live role in a firm, reading through the cache.
    ///
    /// A membership pointing at a deleted role, or at a role of another firm,
    /// resolves to `None`.
    pub async fn resolve_role(
        &self,
        user_id: &UserId,
        firm_id: &FirmId,
    ) -> Result<Option<LawFirmRole>> {
        if let Some(cached) = self.cache.get(user_id, firm_id) {
            return Ok(cached);
        }

        let role = match self.directory.get_membership(user_id, firm_id).await? {
            Some(membership) => self
                .directory
                .get_role(&membership.role_id)
                .await?
                .filter(|role| !role.is_deleted && role.firm_id == *firm_id),
            None => None,
        };

        self.cache.insert(*user_id, *firm_id, role.clone());
        Ok(role)
    }
}
