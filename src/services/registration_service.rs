use sqlx::SqlitePool;

use crate::database::{announcement_repo, event_repo, registration_repo};
use crate::error::{PortalError, PortalResult};

/// Register (or re-register) a guest party for an event. The capacity
/// check runs inside the guarded upsert, so concurrent near-capacity
/// registrations serialize on the event's live rows.
pub async fn register(
    pool: &SqlitePool,
    profile_user_id: &str,
    event_id: &str,
    num_participants: i64,
) -> PortalResult<()> {
    if num_participants < 1 {
        return Err(PortalError::InvalidArgument(
            "number of participants must be at least 1".to_string(),
        ));
    }

    let Some(event) = event_repo::load_event(pool, event_id).await? else {
        return Err(PortalError::InvalidArgument("unknown event".to_string()));
    };

    let written = registration_repo::upsert_registration_guarded(
        pool,
        profile_user_id,
        event_id,
        num_participants,
    )
    .await?;
    if written > 0 {
        return Ok(());
    }

    let taken_by_others =
        registration_repo::sum_for_event_excluding(pool, event_id, profile_user_id).await?;
    let remaining = event
        .max_participants
        .map(|max| (max - taken_by_others).max(0))
        .unwrap_or(0);
    Err(PortalError::CapacityExceeded {
        requested: num_participants,
        remaining,
    })
}

/// Cancelling something that does not exist is a success, not an error.
pub async fn cancel(pool: &SqlitePool, profile_user_id: &str, event_id: &str) -> PortalResult<()> {
    registration_repo::delete_registration(pool, profile_user_id, event_id).await?;
    Ok(())
}

pub struct EventCardView {
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub event_type: String,
    pub date_label: String,
    pub time_label: String,
    pub location_label: String,
    pub participants_count: i64,
    pub capacity_label: String,
    pub is_limited: bool,
    pub is_full: bool,
    pub is_registered: bool,
    pub my_participants: i64,
}

pub struct AnnouncementView {
    pub title: String,
    pub body: String,
    pub date_label: String,
}

pub struct EventsPageData {
    pub events: Vec<EventCardView>,
    pub announcements: Vec<AnnouncementView>,
    pub notice: String,
}

pub async fn build_events_page(
    pool: &SqlitePool,
    viewer_user_id: &str,
    notice: Option<String>,
) -> sqlx::Result<EventsPageData> {
    let rows = event_repo::list_events_with_details(pool, viewer_user_id).await?;
    let announcement_rows = announcement_repo::list_recent(pool, 10).await.unwrap_or_default();

    let events = rows
        .into_iter()
        .map(|row| {
            let (date_label, time_label) = format_scheduled_labels(&row.scheduled_at);
            let my_participants = row.my_participants.unwrap_or(0);
            let is_full = row
                .max_participants
                .map(|max| row.participants_count >= max)
                .unwrap_or(false);
            let capacity_label = match row.max_participants {
                Some(max) => format!("{} / {}", row.participants_count, max),
                None => format!("{}", row.participants_count),
            };

            EventCardView {
                event_id: row.event_id,
                title: row.title,
                description: row.description.unwrap_or_default(),
                event_type: row.event_type,
                date_label,
                time_label,
                location_label: row.location.unwrap_or_default(),
                participants_count: row.participants_count,
                capacity_label,
                is_limited: row.max_participants.is_some(),
                is_full,
                is_registered: my_participants > 0,
                my_participants,
            }
        })
        .collect();

    let announcements = announcement_rows
        .into_iter()
        .map(|row| {
            let (date_label, _) = format_scheduled_labels(&row.created_at);
            AnnouncementView {
                title: row.title,
                body: row.body,
                date_label,
            }
        })
        .collect();

    Ok(EventsPageData {
        events,
        announcements,
        notice: notice.unwrap_or_default(),
    })
}

fn format_scheduled_labels(scheduled_at: &str) -> (String, String) {
    // Input is an ISO-ish string like: 2026-09-19T15:30:00
    let date = scheduled_at.get(0..10).unwrap_or(scheduled_at);
    let time = scheduled_at.get(11..16).unwrap_or("");
    (format_date_short(date), time.to_string())
}

fn format_date_short(date: &str) -> String {
    let (y, m, d) = match parse_ymd(date) {
        Some(v) => v,
        None => return date.to_string(),
    };

    let wd_name = match weekday_sun0(y, m, d) {
        0 => "Sun",
        1 => "Mon",
        2 => "Tue",
        3 => "Wed",
        4 => "Thu",
        5 => "Fri",
        6 => "Sat",
        _ => "",
    };

    let month = match m {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "",
    };

    format!("{} {} {}", wd_name, d, month)
}

fn parse_ymd(date: &str) -> Option<(i32, i32, i32)> {
    let mut parts = date.split('-');
    let y: i32 = parts.next()?.parse().ok()?;
    let m: i32 = parts.next()?.parse().ok()?;
    let d: i32 = parts.next()?.parse().ok()?;
    Some((y, m, d))
}

// Returns weekday with Sunday=0..Saturday=6 (Sakamoto algorithm).
fn weekday_sun0(y: i32, m: i32, d: i32) -> i32 {
    let t = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];
    let mut year = y;
    if m < 3 {
        year -= 1;
    }
    (year + year / 4 - year / 100 + year / 400 + t[(m - 1) as usize] + d) % 7
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::event_repo::{self, NewEvent};
    use crate::database::{profile_repo, registration_repo};
    use crate::test_support::test_pool;

    async fn seed_event(pool: &SqlitePool, event_id: &str, max: Option<i64>) {
        event_repo::insert_event(
            pool,
            NewEvent {
                event_id,
                title: "Boat trip",
                description: None,
                event_type: "programme",
                scheduled_at: "2026-09-19T15:30:00",
                location: Some("Harbour"),
                max_participants: max,
            },
        )
        .await
        .unwrap();
    }

    async fn seed_guest(pool: &SqlitePool, user_id: &str) {
        profile_repo::ensure_profile(pool, user_id, Some(&format!("{user_id}@example.com")))
            .await
            .unwrap();
    }

    async fn count_for_event(pool: &SqlitePool, event_id: &str) -> i64 {
        registration_repo::sum_for_event_excluding(pool, event_id, "nobody")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn rejects_non_positive_party_sizes() {
        let pool = test_pool().await;
        seed_event(&pool, "e1", Some(10)).await;
        seed_guest(&pool, "g1").await;

        for n in [0, -3] {
            let res = register(&pool, "g1", "e1", n).await;
            assert!(matches!(res, Err(PortalError::InvalidArgument(_))));
        }
        assert_eq!(count_for_event(&pool, "e1").await, 0);
    }

    #[tokio::test]
    async fn rejects_unknown_events() {
        let pool = test_pool().await;
        seed_guest(&pool, "g1").await;

        let res = register(&pool, "g1", "missing", 2).await;
        assert!(matches!(res, Err(PortalError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn capacity_is_never_exceeded() {
        let pool = test_pool().await;
        seed_event(&pool, "e1", Some(10)).await;
        for g in ["g1", "g2", "g3"] {
            seed_guest(&pool, g).await;
        }

        register(&pool, "g1", "e1", 6).await.unwrap();
        register(&pool, "g2", "e1", 4).await.unwrap();

        let res = register(&pool, "g3", "e1", 1).await;
        match res {
            Err(PortalError::CapacityExceeded {
                requested,
                remaining,
            }) => {
                assert_eq!(requested, 1);
                assert_eq!(remaining, 0);
            }
            other => panic!("expected CapacityExceeded, got {:?}", other.err()),
        }
        assert_eq!(count_for_event(&pool, "e1").await, 10);
    }

    #[tokio::test]
    async fn concurrent_registrations_cannot_oversubscribe() {
        let pool = test_pool().await;
        seed_event(&pool, "e1", Some(10)).await;
        seed_guest(&pool, "a").await;
        seed_guest(&pool, "b").await;

        // 6 + 6 > 10: whatever the interleaving, at most one succeeds.
        let (ra, rb) = tokio::join!(
            register(&pool, "a", "e1", 6),
            register(&pool, "b", "e1", 6),
        );
        let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(count_for_event(&pool, "e1").await <= 10);
    }

    #[tokio::test]
    async fn re_register_updates_in_place_with_delta_check() {
        let pool = test_pool().await;
        seed_guest(&pool, "me").await;
        seed_guest(&pool, "others").await;

        // Capacity 11: 6 taken by others, my 2 -> 5 passes (5 + 6 <= 11).
        seed_event(&pool, "roomy", Some(11)).await;
        register(&pool, "others", "roomy", 6).await.unwrap();
        register(&pool, "me", "roomy", 2).await.unwrap();
        register(&pool, "me", "roomy", 5).await.unwrap();

        let mine = registration_repo::load_registration(&pool, "me", "roomy")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mine.num_participants, 5);
        assert_eq!(count_for_event(&pool, "roomy").await, 11);

        // Capacity 10: same move fails (5 + 6 > 10) and the old row stays.
        seed_event(&pool, "tight", Some(10)).await;
        register(&pool, "others", "tight", 6).await.unwrap();
        register(&pool, "me", "tight", 2).await.unwrap();
        let res = register(&pool, "me", "tight", 5).await;
        assert!(matches!(res, Err(PortalError::CapacityExceeded { .. })));

        let mine = registration_repo::load_registration(&pool, "me", "tight")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mine.num_participants, 2);
    }

    #[tokio::test]
    async fn unbounded_events_accept_any_party() {
        let pool = test_pool().await;
        seed_event(&pool, "open", None).await;
        seed_guest(&pool, "g1").await;

        register(&pool, "g1", "open", 250).await.unwrap();
        assert_eq!(count_for_event(&pool, "open").await, 250);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let pool = test_pool().await;
        seed_event(&pool, "e1", Some(10)).await;
        seed_guest(&pool, "g1").await;

        register(&pool, "g1", "e1", 3).await.unwrap();
        cancel(&pool, "g1", "e1").await.unwrap();
        cancel(&pool, "g1", "e1").await.unwrap();
        // Even for a pair that never registered.
        cancel(&pool, "g1", "other").await.unwrap();

        assert_eq!(count_for_event(&pool, "e1").await, 0);
    }

    #[tokio::test]
    async fn events_page_counts_match_live_rows() {
        let pool = test_pool().await;
        seed_event(&pool, "e1", Some(10)).await;
        seed_event(&pool, "e2", None).await;
        seed_guest(&pool, "g1").await;
        seed_guest(&pool, "g2").await;

        register(&pool, "g1", "e1", 4).await.unwrap();
        register(&pool, "g2", "e1", 6).await.unwrap();

        let page = build_events_page(&pool, "g1", None).await.unwrap();
        assert_eq!(page.events.len(), 2);

        let e1 = page.events.iter().find(|e| e.event_id == "e1").unwrap();
        assert_eq!(e1.participants_count, 10);
        assert_eq!(e1.capacity_label, "10 / 10");
        assert!(e1.is_full);
        assert!(e1.is_registered);
        assert_eq!(e1.my_participants, 4);

        let e2 = page.events.iter().find(|e| e.event_id == "e2").unwrap();
        assert!(!e2.is_limited);
        assert!(!e2.is_full);
        assert!(!e2.is_registered);
    }
}
