use sqlx::SqlitePool;

use crate::models::EventRegistrationRow;

// Capacity check and write in one statement, so two near-capacity
// registrations can never both slip through. The insert-select recomputes
// the aggregate from live rows, excluding the caller's own reservation so
// an update is checked against the remaining capacity (delta semantics).
// Zero affected rows means the guard rejected the write.
const SQL_UPSERT_REGISTRATION_GUARDED: &str = r#"
INSERT INTO event_registrations (profile_user_id, event_id, num_participants, updated_at)
SELECT ?1, ?2, ?3, datetime('now')
FROM events e
WHERE e.event_id = ?2
  AND (
    e.max_participants IS NULL
    OR (
      SELECT COALESCE(SUM(r.num_participants), 0)
      FROM event_registrations r
      WHERE r.event_id = ?2
        AND r.profile_user_id != ?1
    ) + ?3 <= e.max_participants
  )
ON CONFLICT (profile_user_id, event_id) DO UPDATE SET
  num_participants = excluded.num_participants,
  updated_at = excluded.updated_at
"#;

pub async fn upsert_registration_guarded(
    pool: &SqlitePool,
    profile_user_id: &str,
    event_id: &str,
    num_participants: i64,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPSERT_REGISTRATION_GUARDED)
        .bind(profile_user_id)
        .bind(event_id)
        .bind(num_participants)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DELETE_REGISTRATION: &str = r#"
DELETE FROM event_registrations
WHERE profile_user_id = ?1
  AND event_id = ?2
"#;

pub async fn delete_registration(
    pool: &SqlitePool,
    profile_user_id: &str,
    event_id: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_REGISTRATION)
        .bind(profile_user_id)
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LOAD_REGISTRATION: &str = r#"
SELECT
  profile_user_id,
  event_id,
  num_participants,
  updated_at
FROM event_registrations
WHERE profile_user_id = ?1
  AND event_id = ?2
LIMIT 1
"#;

pub async fn load_registration(
    pool: &SqlitePool,
    profile_user_id: &str,
    event_id: &str,
) -> sqlx::Result<Option<EventRegistrationRow>> {
    sqlx::query_as::<_, EventRegistrationRow>(SQL_LOAD_REGISTRATION)
        .bind(profile_user_id)
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

const SQL_SUM_FOR_EVENT_EXCLUDING: &str = r#"
SELECT COALESCE(SUM(num_participants), 0)
FROM event_registrations
WHERE event_id = ?1
  AND profile_user_id != ?2
"#;

pub async fn sum_for_event_excluding(
    pool: &SqlitePool,
    event_id: &str,
    profile_user_id: &str,
) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(SQL_SUM_FOR_EVENT_EXCLUDING)
        .bind(event_id)
        .bind(profile_user_id)
        .fetch_one(pool)
        .await
}
