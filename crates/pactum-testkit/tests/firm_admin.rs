//! Firm administration through the engine's shared role cache.

use pactum::{Capability, LifecycleError, ListFilter, NewContract, RoleFlags, UserId};
use pactum_testkit::TestFixture;

#[tokio::test]
async fn role_changes_take_effect_immediately() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let admin = fx.engine.firm_admin();

    let role = admin
        .create_role(
            &fx.admin,
            &fx.firm.id,
            "Viewer",
            RoleFlags::of(&[Capability::Read]),
        )
        .await?;
    let user = UserId::generate();
    admin
        .assign_member(&fx.admin, &fx.firm.id, &user, &role.id)
        .await?;

    // Warm the cache.
    fx.engine
        .list_contracts(&user, &fx.firm.id, &ListFilter::new())
        .await?;
    assert!(matches!(
        fx.engine
            .create_contract(&user, &fx.firm.id, NewContract::titled("X"))
            .await,
        Err(LifecycleError::Forbidden(_))
    ));

    admin
        .update_role(
            &fx.admin,
            &role.id,
            None,
            RoleFlags::of(&[Capability::Read, Capability::Write]),
        )
        .await?;
    fx.engine
        .create_contract(&user, &fx.firm.id, NewContract::titled("X"))
        .await?;

    admin.remove_member(&fx.admin, &fx.firm.id, &user).await?;
    assert!(matches!(
        fx.engine
            .list_contracts(&user, &fx.firm.id, &ListFilter::new())
            .await,
        Err(LifecycleError::Forbidden(_))
    ));
    Ok(())
}

#[tokio::test]
async fn only_admins_mutate_roles() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let admin = fx.engine.firm_admin();

    for actor in [fx.reader, fx.writer, fx.editor, fx.manager] {
        assert!(matches!(
            admin
                .create_role(&actor, &fx.firm.id, "Rogue", RoleFlags::NONE)
                .await,
            Err(LifecycleError::Forbidden(_))
        ));
    }

    let roles_before = admin.list_roles(&fx.reader, &fx.firm.id).await?.len();
    admin
        .create_role(&fx.admin, &fx.firm.id, "Clerk", RoleFlags::NONE)
        .await?;
    assert_eq!(
        admin.list_roles(&fx.reader, &fx.firm.id).await?.len(),
        roles_before + 1
    );

    // Listing needs read.
    assert!(matches!(
        admin.list_members(&fx.writer, &fx.firm.id).await,
        Err(LifecycleError::Forbidden(_))
    ));
    Ok(())
}

#[tokio::test]
async fn promotion_is_owner_only() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let admin = fx.engine.firm_admin();

    let role = admin
        .create_role(&fx.admin, &fx.firm.id, "Partner", RoleFlags::of(&[Capability::Read]))
        .await?;
    let partner = UserId::generate();
    admin
        .assign_member(&fx.admin, &fx.firm.id, &partner, &role.id)
        .await?;

    assert!(matches!(
        admin.promote_role_to_admin(&fx.admin, &role.id).await,
        Err(LifecycleError::Forbidden(_))
    ));

    admin.promote_role_to_admin(&fx.owner, &role.id).await?;
    assert!(fx
        .engine
        .permissions()
        .has_permission(&partner, &fx.firm.id, Capability::FirmAdmin)
        .await?);

    admin.demote_role_from_admin(&fx.owner, &role.id).await?;
    assert!(!fx
        .engine
        .permissions()
        .has_permission(&partner, &fx.firm.id, Capability::FirmAdmin)
        .await?);
    Ok(())
}

#[tokio::test]
async fn invalid_role_names_rejected() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let admin = fx.engine.firm_admin();

    assert!(matches!(
        admin
            .create_role(&fx.owner, &fx.firm.id, "   ", RoleFlags::NONE)
            .await,
        Err(LifecycleError::ValidationFailed(_))
    ));
    assert!(matches!(
        admin
            .create_role(&fx.owner, &fx.firm.id, &"x".repeat(300), RoleFlags::NONE)
            .await,
        Err(LifecycleError::ValidationFailed(_))
    ));
    Ok(())
}

#[tokio::test]
async fn admin_membership_changes_are_owner_only() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let admin = fx.engine.firm_admin();

    let admin_role = admin
        .create_role(&fx.owner, &fx.firm.id, "Partners", RoleFlags::of(&[Capability::FirmAdmin]))
        .await?;
    let clerk_role = admin
        .create_role(&fx.admin, &fx.firm.id, "Clerks", RoleFlags::of(&[Capability::Read]))
        .await?;

    // Granting admin through membership.
    let outsider = UserId::generate();
    assert!(matches!(
        admin
            .assign_member(&fx.admin, &fx.firm.id, &outsider, &admin_role.id)
            .await,
        Err(LifecycleError::Forbidden(_))
    ));
    assert!(!fx
        .engine
        .permissions()
        .has_permission(&outsider, &fx.firm.id, Capability::FirmAdmin)
        .await?);

    let partner = UserId::generate();
    admin
        .assign_member(&fx.owner, &fx.firm.id, &partner, &admin_role.id)
        .await?;

    // Revoking admin by moving a member off an admin role.
    assert!(matches!(
        admin
            .assign_member(&fx.admin, &fx.firm.id, &partner, &clerk_role.id)
            .await,
        Err(LifecycleError::Forbidden(_))
    ));
    // Revoking admin by removing the member.
    assert!(matches!(
        admin.remove_member(&fx.admin, &fx.firm.id, &partner).await,
        Err(LifecycleError::Forbidden(_))
    ));
    // Revoking admin from every holder by deleting the role.
    assert!(matches!(
        admin.delete_role(&fx.admin, &admin_role.id).await,
        Err(LifecycleError::Forbidden(_))
    ));
    assert!(fx
        .engine
        .permissions()
        .has_permission(&partner, &fx.firm.id, Capability::FirmAdmin)
        .await?);

    // Non-admin memberships stay with admins.
    let clerk = UserId::generate();
    admin
        .assign_member(&fx.admin, &fx.firm.id, &clerk, &clerk_role.id)
        .await?;
    admin.remove_member(&fx.admin, &fx.firm.id, &clerk).await?;
    admin.delete_role(&fx.admin, &clerk_role.id).await?;

    // The owner may do all of it.
    admin.remove_member(&fx.owner, &fx.firm.id, &partner).await?;
    admin.delete_role(&fx.owner, &admin_role.id).await?;
    assert!(!fx
        .engine
        .permissions()
        .has_permission(&partner, &fx.firm.id, Capability::FirmAdmin)
        .await?);
    Ok(())
}
