use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::family_member_repo::{self, NewFamilyMember};
use crate::database::profile_repo::{self, TripDetails};
use crate::error::{PortalError, PortalResult};
use crate::services::notification_service;

#[derive(Debug, Clone, Deserialize)]
pub struct FamilyMemberInput {
    pub name: String,
    #[serde(default)]
    pub is_minor: bool,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingSubmission {
    pub arrival_date: String,
    pub departure_date: String,
    pub transport_mode: String,
    #[serde(default)]
    pub airport: Option<String>,
    #[serde(default)]
    pub residence: Option<String>,
    pub family_members: Vec<FamilyMemberInput>,
}

/// One-shot transition NEEDS_ONBOARDING -> COMPLETE. Trip fields, family
/// rows and the completion flag land in a single transaction; the
/// monotonic flag update doubles as the retry guard, so a second submission
/// writes nothing at all.
pub async fn submit_onboarding(
    pool: &SqlitePool,
    user_id: &str,
    submission: &OnboardingSubmission,
) -> PortalResult<()> {
    validate_submission(submission)?;

    if profile_repo::load_profile(pool, user_id).await?.is_none() {
        return Err(PortalError::Unauthenticated);
    }

    let mut tx = pool.begin().await?;

    let flipped = profile_repo::complete_onboarding(
        &mut tx,
        user_id,
        TripDetails {
            arrival_date: submission.arrival_date.trim(),
            departure_date: submission.departure_date.trim(),
            transport_mode: submission.transport_mode.trim(),
            airport: trimmed_opt(submission.airport.as_deref()),
            residence: trimmed_opt(submission.residence.as_deref()),
        },
    )
    .await?;

    if flipped == 0 {
        // COMPLETE is terminal; dropping the transaction rolls back.
        return Err(PortalError::InvalidArgument(
            "onboarding already completed".to_string(),
        ));
    }

    for member in &submission.family_members {
        let id = Uuid::new_v4().to_string();
        family_member_repo::insert_family_member(
            &mut tx,
            NewFamilyMember {
                id: &id,
                profile_user_id: user_id,
                name: member.name.trim(),
                is_minor: member.is_minor,
                email: trimmed_opt(member.email.as_deref()),
            },
        )
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InvitationReport {
    pub attempted: usize,
    pub delivered: usize,
}

/// Invite family members that left a contact address. Runs after the
/// onboarding commit; delivery failures only show up in the report and are
/// retried on the next run because `invitation_sent_at` stays NULL.
pub async fn send_family_invitations(
    pool: &SqlitePool,
    client: &reqwest::Client,
    notify_url: &str,
    user_id: &str,
) -> PortalResult<InvitationReport> {
    let members = family_member_repo::list_for_profile(pool, user_id).await?;

    let mut report = InvitationReport::default();
    for member in members {
        let Some(email) = member.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        if member.invitation_sent_at.is_some() {
            continue;
        }

        report.attempted += 1;
        let status = notification_service::dispatch(
            client,
            notify_url,
            "family_invitation",
            email,
            serde_json::json!({ "name": member.name }),
        )
        .await;

        if status.delivered {
            family_member_repo::mark_invitation_sent(pool, &member.id).await?;
            report.delivered += 1;
        }
    }

    Ok(report)
}

/// A family member registers their own account later and gets linked to
/// the row the inviting guest created. The link is write-once.
pub async fn link_family_member(
    pool: &SqlitePool,
    member_id: &str,
    linked_user_id: &str,
) -> PortalResult<()> {
    let updated = family_member_repo::link_user(pool, member_id, linked_user_id).await?;
    if updated > 0 {
        return Ok(());
    }

    if family_member_repo::load_family_member(pool, member_id)
        .await?
        .is_none()
    {
        return Err(PortalError::InvalidArgument(
            "unknown family member".to_string(),
        ));
    }
    Err(PortalError::InvalidArgument(
        "family member is already linked to another account".to_string(),
    ))
}

fn validate_submission(submission: &OnboardingSubmission) -> PortalResult<()> {
    let arrival = parse_ymd(submission.arrival_date.trim())
        .ok_or_else(|| PortalError::InvalidArgument("invalid arrival date".to_string()))?;
    let departure = parse_ymd(submission.departure_date.trim())
        .ok_or_else(|| PortalError::InvalidArgument("invalid departure date".to_string()))?;
    if departure < arrival {
        return Err(PortalError::InvalidArgument(
            "departure before arrival".to_string(),
        ));
    }
    if submission.transport_mode.trim().is_empty() {
        return Err(PortalError::InvalidArgument(
            "transport mode is required".to_string(),
        ));
    }
    if submission.family_members.is_empty() {
        return Err(PortalError::InvalidArgument(
            "at least one family member is required".to_string(),
        ));
    }
    for member in &submission.family_members {
        if member.name.trim().is_empty() {
            return Err(PortalError::InvalidArgument(
                "family member name is required".to_string(),
            ));
        }
    }
    Ok(())
}

fn trimmed_opt(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_ymd(date: &str) -> Option<(i32, i32, i32)> {
    let mut parts = date.split('-');
    let y: i32 = parts.next()?.parse().ok()?;
    let m: i32 = parts.next()?.parse().ok()?;
    let d: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }
    Some((y, m, d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{family_member_repo, profile_repo};
    use crate::test_support::test_pool;

    fn submission() -> OnboardingSubmission {
        OnboardingSubmission {
            arrival_date: "2026-09-18".to_string(),
            departure_date: "2026-09-21".to_string(),
            transport_mode: "plane".to_string(),
            airport: Some("FCO".to_string()),
            residence: Some("Hotel Aurora".to_string()),
            family_members: vec![
                FamilyMemberInput {
                    name: "Sam".to_string(),
                    is_minor: false,
                    email: Some("sam@example.com".to_string()),
                },
                FamilyMemberInput {
                    name: "Noa".to_string(),
                    is_minor: true,
                    email: None,
                },
            ],
        }
    }

    async fn seed_guest(pool: &sqlx::SqlitePool, user_id: &str) {
        profile_repo::ensure_profile(pool, user_id, Some(&format!("{user_id}@example.com")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn submission_persists_trip_and_family_atomically() {
        let pool = test_pool().await;
        seed_guest(&pool, "g1").await;

        submit_onboarding(&pool, "g1", &submission()).await.unwrap();

        let profile = profile_repo::load_profile(&pool, "g1").await.unwrap().unwrap();
        assert_eq!(profile.onboarding_completed, 1);
        assert_eq!(profile.arrival_date.as_deref(), Some("2026-09-18"));
        assert_eq!(profile.transport_mode.as_deref(), Some("plane"));

        let family = family_member_repo::list_for_profile(&pool, "g1").await.unwrap();
        assert_eq!(family.len(), 2);
    }

    #[tokio::test]
    async fn retry_is_rejected_and_leaves_one_family_set() {
        let pool = test_pool().await;
        seed_guest(&pool, "g1").await;

        submit_onboarding(&pool, "g1", &submission()).await.unwrap();
        let second = submit_onboarding(&pool, "g1", &submission()).await;
        assert!(matches!(second, Err(PortalError::InvalidArgument(_))));

        let family = family_member_repo::list_for_profile(&pool, "g1").await.unwrap();
        assert_eq!(family.len(), 2);
        let profile = profile_repo::load_profile(&pool, "g1").await.unwrap().unwrap();
        assert_eq!(profile.onboarding_completed, 1);
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_before_any_write() {
        let pool = test_pool().await;
        seed_guest(&pool, "g1").await;

        let mut empty_family = submission();
        empty_family.family_members.clear();
        let res = submit_onboarding(&pool, "g1", &empty_family).await;
        assert!(matches!(res, Err(PortalError::InvalidArgument(_))));

        let mut bad_dates = submission();
        bad_dates.departure_date = "2026-09-01".to_string();
        let res = submit_onboarding(&pool, "g1", &bad_dates).await;
        assert!(matches!(res, Err(PortalError::InvalidArgument(_))));

        let mut bad_format = submission();
        bad_format.arrival_date = "september 18th".to_string();
        let res = submit_onboarding(&pool, "g1", &bad_format).await;
        assert!(matches!(res, Err(PortalError::InvalidArgument(_))));

        let profile = profile_repo::load_profile(&pool, "g1").await.unwrap().unwrap();
        assert_eq!(profile.onboarding_completed, 0);
        assert!(family_member_repo::list_for_profile(&pool, "g1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn family_link_is_write_once() {
        let pool = test_pool().await;
        seed_guest(&pool, "g1").await;
        submit_onboarding(&pool, "g1", &submission()).await.unwrap();

        let member = &family_member_repo::list_for_profile(&pool, "g1").await.unwrap()[0];

        link_family_member(&pool, &member.id, "u-sam").await.unwrap();
        // Same identity again is a no-op success.
        link_family_member(&pool, &member.id, "u-sam").await.unwrap();
        // A different identity is rejected.
        let res = link_family_member(&pool, &member.id, "u-other").await;
        assert!(matches!(res, Err(PortalError::InvalidArgument(_))));

        let reloaded = family_member_repo::load_family_member(&pool, &member.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.linked_user_id.as_deref(), Some("u-sam"));
    }
}
