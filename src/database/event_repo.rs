use sqlx::SqlitePool;

use crate::models::{EventRow, EventWithDetailsRow};

const SQL_LOAD_EVENT: &str = r#"
SELECT
  event_id,
  title,
  description,
  event_type,
  scheduled_at,
  location,
  max_participants
FROM events
WHERE event_id = ?1
LIMIT 1
"#;

pub async fn load_event(pool: &SqlitePool, event_id: &str) -> sqlx::Result<Option<EventRow>> {
    sqlx::query_as::<_, EventRow>(SQL_LOAD_EVENT)
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

// The one aggregation used everywhere a participant count is shown or
// checked. Counts come from live registration rows, never a cached column.
const SQL_LIST_EVENTS_WITH_DETAILS: &str = r#"
SELECT
  e.event_id,
  e.title,
  e.description,
  e.event_type,
  e.scheduled_at,
  e.location,
  e.max_participants,
  (
    SELECT COALESCE(SUM(r.num_participants), 0)
    FROM event_registrations r
    WHERE r.event_id = e.event_id
  ) AS participants_count,
  (
    SELECT r.num_participants
    FROM event_registrations r
    WHERE r.event_id = e.event_id
      AND r.profile_user_id = ?1
  ) AS my_participants
FROM events e
ORDER BY datetime(e.scheduled_at) ASC
"#;

pub async fn list_events_with_details(
    pool: &SqlitePool,
    viewer_user_id: &str,
) -> sqlx::Result<Vec<EventWithDetailsRow>> {
    sqlx::query_as::<_, EventWithDetailsRow>(SQL_LIST_EVENTS_WITH_DETAILS)
        .bind(viewer_user_id)
        .fetch_all(pool)
        .await
}

pub struct NewEvent<'a> {
    pub event_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub event_type: &'a str,
    pub scheduled_at: &'a str,
    pub location: Option<&'a str>,
    pub max_participants: Option<i64>,
}

const SQL_INSERT_EVENT: &str = r#"
INSERT INTO events (
  event_id,
  title,
  description,
  event_type,
  scheduled_at,
  location,
  max_participants
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

pub async fn insert_event(pool: &SqlitePool, event: NewEvent<'_>) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_EVENT)
        .bind(event.event_id)
        .bind(event.title)
        .bind(event.description)
        .bind(event.event_type)
        .bind(event.scheduled_at)
        .bind(event.location)
        .bind(event.max_participants)
        .execute(pool)
        .await?;
    Ok(())
}
