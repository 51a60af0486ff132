use sqlx::SqlitePool;

use crate::database::profile_repo;

/// Coarse authorization classification. `Unauthenticated` (no identity on
/// the request) is deliberately distinct from an authenticated guest whose
/// profile row does not exist yet; the latter resolves to `Invite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Invite,
    Unauthenticated,
}

/// Gate outcome, interpreted by the web boundary. Gates never render error
/// pages; a mismatch is always a redirect to a lower-privilege landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allowed,
    RedirectTo(&'static str),
}

// A missing or unrecognized role string is never elevated privilege.
pub fn parse_role(raw: Option<&str>) -> Role {
    match raw.map(str::trim) {
        Some("admin") => Role::Admin,
        _ => Role::Invite,
    }
}

pub async fn resolve_role(pool: &SqlitePool, user_id: Option<&str>) -> sqlx::Result<Role> {
    let Some(user_id) = user_id else {
        return Ok(Role::Unauthenticated);
    };

    let profile = profile_repo::load_profile(pool, user_id).await?;
    Ok(match profile {
        Some(p) => parse_role(p.role.as_deref()),
        None => Role::Invite,
    })
}

pub fn admin_gate(role: Role) -> Access {
    match role {
        Role::Admin => Access::Allowed,
        Role::Invite => Access::RedirectTo("/events"),
        Role::Unauthenticated => Access::RedirectTo("/login"),
    }
}

/// Main application pages require a finished onboarding. Admins bypass the
/// gate regardless of their own onboarding flag.
pub fn onboarded_gate(role: Role, onboarding_completed: bool) -> Access {
    match role {
        Role::Admin => Access::Allowed,
        Role::Invite if onboarding_completed => Access::Allowed,
        Role::Invite => Access::RedirectTo("/onboarding"),
        Role::Unauthenticated => Access::RedirectTo("/login"),
    }
}

/// The onboarding form itself redirects away once the work is done.
pub fn onboarding_form_gate(role: Role, onboarding_completed: bool) -> Access {
    match role {
        Role::Admin => Access::RedirectTo("/events"),
        Role::Invite if onboarding_completed => Access::RedirectTo("/events"),
        Role::Invite => Access::Allowed,
        Role::Unauthenticated => Access::RedirectTo("/login"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::profile_repo;
    use crate::test_support::test_pool;

    #[test]
    fn unknown_role_strings_stay_lowest_privilege() {
        assert_eq!(parse_role(Some("admin")), Role::Admin);
        assert_eq!(parse_role(Some("invite")), Role::Invite);
        assert_eq!(parse_role(Some("superuser")), Role::Invite);
        assert_eq!(parse_role(Some("")), Role::Invite);
        assert_eq!(parse_role(None), Role::Invite);
    }

    #[tokio::test]
    async fn missing_profile_never_resolves_to_admin() {
        let pool = test_pool().await;

        let role = resolve_role(&pool, Some("ghost")).await.unwrap();
        assert_eq!(role, Role::Invite);
    }

    #[tokio::test]
    async fn no_identity_resolves_to_unauthenticated() {
        let pool = test_pool().await;

        let role = resolve_role(&pool, None).await.unwrap();
        assert_eq!(role, Role::Unauthenticated);
    }

    #[tokio::test]
    async fn stored_admin_role_resolves_to_admin() {
        let pool = test_pool().await;
        profile_repo::insert_admin_profile(&pool, "u1", "host@example.com")
            .await
            .unwrap();

        let role = resolve_role(&pool, Some("u1")).await.unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn gates_redirect_instead_of_erroring() {
        assert_eq!(admin_gate(Role::Invite), Access::RedirectTo("/events"));
        assert_eq!(admin_gate(Role::Admin), Access::Allowed);
        assert_eq!(
            onboarded_gate(Role::Invite, false),
            Access::RedirectTo("/onboarding")
        );
        assert_eq!(onboarded_gate(Role::Invite, true), Access::Allowed);
        // Admins skip onboarding entirely, even with their own flag unset.
        assert_eq!(onboarded_gate(Role::Admin, false), Access::Allowed);
        assert_eq!(
            onboarding_form_gate(Role::Admin, false),
            Access::RedirectTo("/events")
        );
        assert_eq!(
            onboarding_form_gate(Role::Invite, true),
            Access::RedirectTo("/events")
        );
        assert_eq!(onboarding_form_gate(Role::Invite, false), Access::Allowed);
    }
}
