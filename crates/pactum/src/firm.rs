//! Firm administration: roles and memberships.
//!
//! Role and membership mutations need the `firm_admin` capability. Granting
//! or revoking `firm_admin` is reserved to the firm owner, whether through a
//! role's flags, deleting an admin role, or moving a member onto or off one.
//! Every mutation invalidates the affected role cache entries.

use std::sync::Arc;

use pactum_core::validation::MAX_NAME_LEN;
use pactum_core::{now_millis, FirmId, RoleId, UserId, ValidationError};
use pactum_perms::{
    Capability, Directory, LawFirmRole, Membership, PermissionEvaluator, RoleCache, RoleFlags,
};

use crate::error::{LifecycleError, Result};

/// Administers a firm's roles and memberships.
pub struct FirmAdmin<D: Directory> {
    permissions: PermissionEvaluator<D>,
}

impl<D: Directory> FirmAdmin<D> {
    /// Create an administrator over a directory, sharing the given cache.
    pub fn new(directory: Arc<D>, cache: Arc<RoleCache>) -> Self {
        Self {
            permissions: PermissionEvaluator::new(directory, cache),
        }
    }

    fn directory(&self) -> &D {
        self.permissions.directory()
    }

    fn cache(&self) -> &RoleCache {
        self.permissions.cache()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a role in a firm.
    pub async fn create_role(
        &self,
        actor: &UserId,
        firm_id: &FirmId,
        name: &str,
        flags: RoleFlags,
    ) -> Result<LawFirmRole> {
        self.require_admin(actor, firm_id).await?;
        if flags.firm_admin {
            self.require_owner(actor, firm_id).await?;
        }
        let name = validate_role_name(name)?;

        let role = LawFirmRole::new(*firm_id, name, flags, now_millis());
        self.directory().put_role(&role).await?;

        tracing::info!(firm_id = %firm_id, role_id = %role.id, actor = %actor, "role created");
        Ok(role)
    }

    /// Rename a role and replace its flags.
    pub async fn update_role(
        &self,
        actor: &UserId,
        role_id: &RoleId,
        name: Option<&str>,
        flags: RoleFlags,
    ) -> Result<LawFirmRole> {
        let mut role = self.live_role(role_id).await?;
        self.require_admin(actor, &role.firm_id).await?;
        if flags.firm_admin != role.flags.firm_admin {
            self.require_owner(actor, &role.firm_id).await?;
        }

        if let Some(name) = name.filter(|n| !n.is_empty()) {
            role.name = validate_role_name(name)?;
        }
        role.flags = flags;
        role.updated_at = now_millis();

        self.directory().put_role(&role).await?;
        self.cache().invalidate_firm(&role.firm_id);

        tracing::info!(firm_id = %role.firm_id, role_id = %role.id, actor = %actor, "role updated");
        Ok(role)
    }

    /// Soft-delete a role. Members holding it lose every capability it granted.
    pub async fn delete_role(&self, actor: &UserId, role_id: &RoleId) -> Result<()> {
        let role = self.live_role(role_id).await?;
        self.require_admin(actor, &role.firm_id).await?;
        if role.flags.firm_admin {
            self.require_owner(actor, &role.firm_id).await?;
        }

        if !self.directory().delete_role(role_id, now_millis()).await? {
            return Err(LifecycleError::NotFound(format!("role {}", role_id)));
        }
        self.cache().invalidate_firm(&role.firm_id);

        tracing::info!(firm_id = %role.firm_id, role_id = %role_id, actor = %actor, "role deleted");
        Ok(())
    }

    /// Grant the `firm_admin` flag to a role. Owner only.
    pub async fn promote_role_to_admin(
        &self,
        actor: &UserId,
        role_id: &RoleId,
    ) -> Result<LawFirmRole> {
        self.set_admin_flag(actor, role_id, true).await
    }

    /// Revoke the `firm_admin` flag from a role. Owner only.
    pub async fn demote_role_from_admin(
        &self,
        actor: &UserId,
        role_id: &RoleId,
    ) -> Result<LawFirmRole> {
        self.set_admin_flag(actor, role_id, false).await
    }

    /// List a firm's live roles.
    pub async fn list_roles(&self, actor: &UserId, firm_id: &FirmId) -> Result<Vec<LawFirmRole>> {
        self.require(actor, firm_id, Capability::Read).await?;
        Ok(self.directory().list_roles(firm_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Members
    // ─────────────────────────────────────────────────────────────────────────

    /// Give a user a role in a firm, replacing any role they held.
    pub async fn assign_member(
        &self,
        actor: &UserId,
        firm_id: &FirmId,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<Membership> {
        self.require_admin(actor, firm_id).await?;

        let role = self.live_role(role_id).await?;
        if role.firm_id != *firm_id {
            return Err(LifecycleError::NotFound(format!(
                "role {} in firm {}",
                role_id, firm_id
            )));
        }

        let existing = self.directory().get_membership(user_id, firm_id).await?;
        let replaces_admin = match &existing {
            Some(m) => self.grants_admin(&m.role_id).await?,
            None => false,
        };
        if role.flags.firm_admin || replaces_admin {
            self.require_owner(actor, firm_id).await?;
        }

        let now = now_millis();
        let membership = match existing {
            Some(mut existing) => {
                existing.role_id = *role_id;
                existing.updated_at = now;
                existing
            }
            None => Membership::new(*firm_id, *user_id, *role_id, now),
        };

        self.directory().put_membership(&membership).await?;
        self.cache().invalidate_member(user_id, firm_id);

        tracing::info!(
            firm_id = %firm_id,
            user_id = %user_id,
            role_id = %role_id,
            actor = %actor,
            "member assigned"
        );
        Ok(membership)
    }

    /// Remove a user from a firm.
    pub async fn remove_member(
        &self,
        actor: &UserId,
        firm_id: &FirmId,
        user_id: &UserId,
    ) -> Result<()> {
        self.require_admin(actor, firm_id).await?;
        if let Some(existing) = self.directory().get_membership(user_id, firm_id).await? {
            if self.grants_admin(&existing.role_id).await? {
                self.require_owner(actor, firm_id).await?;
            }
        }

        if !self.directory().remove_membership(user_id, firm_id).await? {
            return Err(LifecycleError::NotFound(format!(
                "membership of {} in firm {}",
                user_id, firm_id
            )));
        }
        self.cache().invalidate_member(user_id, firm_id);

        tracing::info!(firm_id = %firm_id, user_id = %user_id, actor = %actor, "member removed");
        Ok(())
    }

    /// List a firm's memberships.
    pub async fn list_members(&self, actor: &UserId, firm_id: &FirmId) -> Result<Vec<Membership>> {
        self.require(actor, firm_id, Capability::Read).await?;
        Ok(self.directory().list_members(firm_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn set_admin_flag(
        &self,
        actor: &UserId,
        role_id: &RoleId,
        value: bool,
    ) -> Result<LawFirmRole> {
        let mut role = self.live_role(role_id).await?;
        self.require_owner(actor, &role.firm_id).await?;

        if role.flags.firm_admin == value {
            return Ok(role);
        }
        role.flags.set(Capability::FirmAdmin, value);
        role.updated_at = now_millis();

        self.directory().put_role(&role).await?;
        self.cache().invalidate_firm(&role.firm_id);

        tracing::info!(
            firm_id = %role.firm_id,
            role_id = %role.id,
            firm_admin = value,
            "role admin flag changed"
        );
        Ok(role)
    }

    async fn live_role(&self, role_id: &RoleId) -> Result<LawFirmRole> {
        self.directory()
            .get_role(role_id)
            .await?
            .filter(|role| !role.is_deleted)
            .ok_or_else(|| LifecycleError::NotFound(format!("role {}", role_id)))
    }

    /// Whether a live role carries `firm_admin`.
    async fn grants_admin(&self, role_id: &RoleId) -> Result<bool> {
        Ok(self
            .directory()
            .get_role(role_id)
            .await?
            .map_or(false, |role| !role.is_deleted && role.flags.firm_admin))
    }

    async fn require(&self, actor: &UserId, firm_id: &FirmId, capability: Capability) -> Result<()> {
        if self
            .permissions
            .has_permission(actor, firm_id, capability)
            .await?
        {
            Ok(())
        } else {
            Err(LifecycleError::Forbidden(format!(
                "{} lacks {} on firm {}",
                actor, capability, firm_id
            )))
        }
    }

    async fn require_admin(&self, actor: &UserId, firm_id: &FirmId) -> Result<()> {
        self.require(actor, firm_id, Capability::FirmAdmin).await
    }

    async fn require_owner(&self, actor: &UserId, firm_id: &FirmId) -> Result<()> {
        if self.permissions.is_owner(actor, firm_id).await? {
            Ok(())
        } else {
            Err(LifecycleError::Forbidden(format!(
                "{} does not own firm {}",
                actor, firm_id
            )))
        }
    }
}

fn validate_role_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required { field: "name" }.into());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name",
            len: name.len(),
            max: MAX_NAME_LEN,
        }
        .into());
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_perms::{Firm, MemoryDirectory};
    use std::time::Duration;

    struct Setup {
        admin: FirmAdmin<MemoryDirectory>,
        directory: Arc<MemoryDirectory>,
        firm: FirmId,
        owner: UserId,
    }

    async fn setup() -> Setup {
        let directory = Arc::new(MemoryDirectory::new());
        let owner = UserId::generate();
        let firm = Firm::new("Acme LLP", owner, 0);
        directory.put_firm(&firm).await.unwrap();

        let cache = Arc::new(RoleCache::new(Duration::from_secs(3600)));
        Setup {
            admin: FirmAdmin::new(Arc::clone(&directory), cache),
            directory,
            firm: firm.id,
            owner,
        }
    }

    #[tokio::test]
    async fn test_owner_manages_roles() {
        let s = setup().await;
        let role = s
            .admin
            .create_role(&s.owner, &s.firm, " Paralegal ", RoleFlags::of(&[Capability::Read]))
            .await
            .unwrap();
        assert_eq!(role.name, "Paralegal");

        let updated = s
            .admin
            .update_role(&s.owner, &role.id, Some("Associate"), RoleFlags::ALL)
            .await
            .unwrap();
        assert_eq!(updated.name, "Associate");
        assert!(updated.flags.firm_admin);

        s.admin.delete_role(&s.owner, &role.id).await.unwrap();
        assert!(s.admin.list_roles(&s.owner, &s.firm).await.unwrap().is_empty());
        assert!(matches!(
            s.admin.delete_role(&s.owner, &role.id).await,
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reassignment_replaces_role() {
        let s = setup().await;
        let reader = s
            .admin
            .create_role(&s.owner, &s.firm, "Reader", RoleFlags::of(&[Capability::Read]))
            .await
            .unwrap();
        let writer = s
            .admin
            .create_role(&s.owner, &s.firm, "Writer", RoleFlags::of(&[Capability::Write]))
            .await
            .unwrap();
        let user = UserId::generate();

        let first = s
            .admin
            .assign_member(&s.owner, &s.firm, &user, &reader.id)
            .await
            .unwrap();
        assert!(s
            .admin
            .permissions
            .has_permission(&user, &s.firm, Capability::Read)
            .await
            .unwrap());

        let second = s
            .admin
            .assign_member(&s.owner, &s.firm, &user, &writer.id)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(s.directory.list_members(&s.firm).await.unwrap().len(), 1);

        // The cached reader role was invalidated by the reassignment.
        assert!(!s
            .admin
            .permissions
            .has_permission(&user, &s.firm, Capability::Read)
            .await
            .unwrap());
        assert!(s
            .admin
            .permissions
            .has_permission(&user, &s.firm, Capability::Write)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_admin_cannot_grant_admin() {
        let s = setup().await;
        let admin_role = s
            .admin
            .create_role(&s.owner, &s.firm, "Admin", RoleFlags::of(&[Capability::FirmAdmin]))
            .await
            .unwrap();
        let admin = UserId::generate();
        s.admin
            .assign_member(&s.owner, &s.firm, &admin, &admin_role.id)
            .await
            .unwrap();

        let plain = s
            .admin
            .create_role(&admin, &s.firm, "Clerk", RoleFlags::of(&[Capability::Read]))
            .await
            .unwrap();

        assert!(matches!(
            s.admin
                .create_role(&admin, &s.firm, "Boss", RoleFlags::ALL)
                .await,
            Err(LifecycleError::Forbidden(_))
        ));
        assert!(matches!(
            s.admin.promote_role_to_admin(&admin, &plain.id).await,
            Err(LifecycleError::Forbidden(_))
        ));

        let promoted = s
            .admin
            .promote_role_to_admin(&s.owner, &plain.id)
            .await
            .unwrap();
        assert!(promoted.flags.firm_admin);
        let demoted = s
            .admin
            .demote_role_from_admin(&s.owner, &plain.id)
            .await
            .unwrap();
        assert!(!demoted.flags.firm_admin);
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let s = setup().await;
        let role = s
            .admin
            .create_role(&s.owner, &s.firm, "Manager", RoleFlags::of(&[Capability::Manage]))
            .await
            .unwrap();
        let manager = UserId::generate();
        s.admin
            .assign_member(&s.owner, &s.firm, &manager, &role.id)
            .await
            .unwrap();

        assert!(matches!(
            s.admin.delete_role(&manager, &role.id).await,
            Err(LifecycleError::Forbidden(_))
        ));
        assert!(matches!(
            s.admin.remove_member(&manager, &s.firm, &s.owner).await,
            Err(LifecycleError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_member() {
        let s = setup().await;
        let role = s
            .admin
            .create_role(&s.owner, &s.firm, "Reader", RoleFlags::of(&[Capability::Read]))
            .await
            .unwrap();
        let user = UserId::generate();
        s.admin
            .assign_member(&s.owner, &s.firm, &user, &role.id)
            .await
            .unwrap();
        assert!(s.admin.list_members(&user, &s.firm).await.is_ok());

        s.admin.remove_member(&s.owner, &s.firm, &user).await.unwrap();
        assert!(matches!(
            s.admin.list_members(&user, &s.firm).await,
            Err(LifecycleError::Forbidden(_))
        ));
        assert!(matches!(
            s.admin.remove_member(&s.owner, &s.firm, &user).await,
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_role_from_other_firm_rejected() {
        let s = setup().await;
        let other_owner = UserId::generate();
        let other = Firm::new("Other LLP", other_owner, 0);
        s.directory.put_firm(&other).await.unwrap();
        let foreign = s
            .admin
            .create_role(&other_owner, &other.id, "Reader", RoleFlags::of(&[Capability::Read]))
            .await
            .unwrap();

        let err = s
            .admin
            .assign_member(&s.owner, &s.firm, &UserId::generate(), &foreign.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
    }
}
