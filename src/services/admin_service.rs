use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::announcement_repo::{self, NewAnnouncement};
use crate::database::profile_repo;
use crate::error::{PortalError, PortalResult};
use crate::services::notification_service::{self, NotificationStatus};

pub struct GuestView {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub onboarded: bool,
    pub group_name: String,
    pub stay_label: String,
    pub family_count: i64,
}

pub async fn list_guests(pool: &SqlitePool) -> sqlx::Result<Vec<GuestView>> {
    let rows = profile_repo::list_guest_overview(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let stay_label = match (row.arrival_date.as_deref(), row.departure_date.as_deref()) {
                (Some(a), Some(d)) => format!("{} – {}", a, d),
                _ => String::new(),
            };
            GuestView {
                user_id: row.user_id,
                email: row.email.unwrap_or_default(),
                role: row.role.unwrap_or_else(|| "invite".to_string()),
                onboarded: row.onboarding_completed == 1,
                group_name: row.group_name.unwrap_or_default(),
                stay_label,
                family_count: row.family_count,
            }
        })
        .collect())
}

pub async fn create_announcement(
    pool: &SqlitePool,
    admin_user_id: &str,
    title: &str,
    body: &str,
) -> PortalResult<()> {
    let title = title.trim();
    let body = body.trim();
    if title.is_empty() || body.is_empty() {
        return Err(PortalError::InvalidArgument(
            "announcement needs a title and a body".to_string(),
        ));
    }

    let id = Uuid::new_v4().to_string();
    announcement_repo::insert_announcement(
        pool,
        NewAnnouncement {
            id: &id,
            title,
            body,
            created_by: admin_user_id,
        },
    )
    .await?;
    Ok(())
}

/// Privileged role change, the only way a profile's role moves.
pub async fn change_guest_role(pool: &SqlitePool, user_id: &str, role: &str) -> PortalResult<()> {
    let role = role.trim();
    if role != "admin" && role != "invite" {
        return Err(PortalError::InvalidArgument(format!(
            "unknown role '{}'",
            role
        )));
    }

    let updated = profile_repo::update_role(pool, user_id, role).await?;
    if updated == 0 {
        return Err(PortalError::InvalidArgument("unknown guest".to_string()));
    }
    Ok(())
}

pub struct ProvisionReport {
    pub user_id: String,
    pub created: bool,
    pub invitation: Option<NotificationStatus>,
}

/// Out-of-band admin provisioning (see `src/bin/provision_admin.rs`).
/// Idempotent on email: an existing profile is promoted in place and no
/// second invitation goes out.
pub async fn provision_admin(
    pool: &SqlitePool,
    client: &reqwest::Client,
    notify_url: &str,
    email: &str,
) -> PortalResult<ProvisionReport> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(PortalError::InvalidArgument(
            "a valid email address is required".to_string(),
        ));
    }

    if let Some(existing) = profile_repo::load_profile_by_email(pool, &email).await? {
        profile_repo::update_role(pool, &existing.user_id, "admin").await?;
        return Ok(ProvisionReport {
            user_id: existing.user_id,
            created: false,
            invitation: None,
        });
    }

    let user_id = Uuid::new_v4().to_string();
    profile_repo::insert_admin_profile(pool, &user_id, &email).await?;

    let invitation = notification_service::dispatch(
        client,
        notify_url,
        "admin_invitation",
        &email,
        serde_json::json!({}),
    )
    .await;

    Ok(ProvisionReport {
        user_id,
        created: true,
        invitation: Some(invitation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::profile_repo;
    use crate::services::role_service::{self, Role};
    use crate::test_support::test_pool;

    #[tokio::test]
    async fn role_change_validates_role_and_guest() {
        let pool = test_pool().await;
        profile_repo::ensure_profile(&pool, "g1", Some("g1@example.com"))
            .await
            .unwrap();

        change_guest_role(&pool, "g1", "admin").await.unwrap();
        assert_eq!(
            role_service::resolve_role(&pool, Some("g1")).await.unwrap(),
            Role::Admin
        );

        change_guest_role(&pool, "g1", "invite").await.unwrap();
        assert_eq!(
            role_service::resolve_role(&pool, Some("g1")).await.unwrap(),
            Role::Invite
        );

        let res = change_guest_role(&pool, "g1", "root").await;
        assert!(matches!(res, Err(PortalError::InvalidArgument(_))));
        let res = change_guest_role(&pool, "missing", "admin").await;
        assert!(matches!(res, Err(PortalError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn announcements_reject_empty_fields() {
        let pool = test_pool().await;

        let res = create_announcement(&pool, "a1", " ", "body").await;
        assert!(matches!(res, Err(PortalError::InvalidArgument(_))));

        create_announcement(&pool, "a1", "Welcome", "Dinner moved to 19:00")
            .await
            .unwrap();
        let announcements = crate::database::announcement_repo::list_recent(&pool, 10)
            .await
            .unwrap();
        assert_eq!(announcements.len(), 1);
        assert_eq!(announcements[0].title, "Welcome");
    }

    #[tokio::test]
    async fn provisioning_is_idempotent_per_email() {
        let pool = test_pool().await;
        // Unroutable notify endpoint: the invitation status reports the
        // failure, provisioning itself still succeeds.
        let client = notification_service::build_client();

        let first = provision_admin(&pool, &client, "http://127.0.0.1:1", "Host@Example.com")
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.invitation.map(|s| s.delivered), Some(false));

        let second = provision_admin(&pool, &client, "http://127.0.0.1:1", "host@example.com")
            .await
            .unwrap();
        assert!(!second.created);
        assert!(second.invitation.is_none());
        assert_eq!(second.user_id, first.user_id);

        assert_eq!(
            role_service::resolve_role(&pool, Some(&first.user_id))
                .await
                .unwrap(),
            Role::Admin
        );
    }
}
