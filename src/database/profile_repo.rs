use sqlx::{SqliteConnection, SqlitePool};

use crate::models::ProfileRow;

pub const SQL_LOAD_PROFILE: &str = r#"
SELECT
  user_id,
  email,
  role,
  onboarding_completed,
  arrival_date,
  departure_date,
  transport_mode,
  airport,
  residence,
  group_name,
  updated_at
FROM profiles
WHERE user_id = ?1
LIMIT 1
"#;

pub async fn load_profile(pool: &SqlitePool, user_id: &str) -> sqlx::Result<Option<ProfileRow>> {
    sqlx::query_as::<_, ProfileRow>(SQL_LOAD_PROFILE)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

const SQL_LOAD_PROFILE_BY_EMAIL: &str = r#"
SELECT
  user_id,
  email,
  role,
  onboarding_completed,
  arrival_date,
  departure_date,
  transport_mode,
  airport,
  residence,
  group_name,
  updated_at
FROM profiles
WHERE email = ?1
LIMIT 1
"#;

pub async fn load_profile_by_email(
    pool: &SqlitePool,
    email: &str,
) -> sqlx::Result<Option<ProfileRow>> {
    sqlx::query_as::<_, ProfileRow>(SQL_LOAD_PROFILE_BY_EMAIL)
        .bind(email)
        .fetch_optional(pool)
        .await
}

// Lazy creation on first successful authentication. An existing row wins;
// the guest keeps whatever role and onboarding state it already has.
const SQL_ENSURE_PROFILE: &str = r#"
INSERT OR IGNORE INTO profiles (user_id, email, role, onboarding_completed, updated_at)
VALUES (?1, ?2, 'invite', 0, datetime('now'))
"#;

pub async fn ensure_profile(
    pool: &SqlitePool,
    user_id: &str,
    email: Option<&str>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_ENSURE_PROFILE)
        .bind(user_id)
        .bind(email)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_INSERT_ADMIN_PROFILE: &str = r#"
INSERT INTO profiles (user_id, email, role, onboarding_completed, updated_at)
VALUES (?1, ?2, 'admin', 0, datetime('now'))
"#;

pub async fn insert_admin_profile(
    pool: &SqlitePool,
    user_id: &str,
    email: &str,
) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_ADMIN_PROFILE)
        .bind(user_id)
        .bind(email)
        .execute(pool)
        .await?;
    Ok(())
}

// A profile provisioned by email (before its owner ever signed in) gets
// claimed by the real identity key on first login.
const SQL_ADOPT_PROFILE_IDENTITY: &str = r#"
UPDATE profiles
SET user_id = ?2, updated_at = datetime('now')
WHERE email = ?1
"#;

pub async fn adopt_profile_identity(
    pool: &SqlitePool,
    email: &str,
    user_id: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_ADOPT_PROFILE_IDENTITY)
        .bind(email)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_UPDATE_ROLE: &str = r#"
UPDATE profiles
SET role = ?2, updated_at = datetime('now')
WHERE user_id = ?1
"#;

pub async fn update_role(pool: &SqlitePool, user_id: &str, role: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_ROLE)
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub struct TripDetails<'a> {
    pub arrival_date: &'a str,
    pub departure_date: &'a str,
    pub transport_mode: &'a str,
    pub airport: Option<&'a str>,
    pub residence: Option<&'a str>,
}

// The `onboarding_completed = 0` guard keeps the flag monotonic: a second
// submission matches zero rows and the surrounding transaction writes nothing.
const SQL_COMPLETE_ONBOARDING: &str = r#"
UPDATE profiles
SET
  arrival_date = ?2,
  departure_date = ?3,
  transport_mode = ?4,
  airport = ?5,
  residence = ?6,
  onboarding_completed = 1,
  updated_at = datetime('now')
WHERE user_id = ?1
  AND onboarding_completed = 0
"#;

pub async fn complete_onboarding(
    conn: &mut SqliteConnection,
    user_id: &str,
    trip: TripDetails<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_COMPLETE_ONBOARDING)
        .bind(user_id)
        .bind(trip.arrival_date)
        .bind(trip.departure_date)
        .bind(trip.transport_mode)
        .bind(trip.airport)
        .bind(trip.residence)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected())
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GuestOverviewRow {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub onboarding_completed: i64,
    pub group_name: Option<String>,
    pub arrival_date: Option<String>,
    pub departure_date: Option<String>,
    pub family_count: i64,
}

const SQL_LIST_GUEST_OVERVIEW: &str = r#"
SELECT
  p.user_id,
  p.email,
  p.role,
  p.onboarding_completed,
  p.group_name,
  p.arrival_date,
  p.departure_date,
  (
    SELECT COUNT(*)
    FROM family_members f
    WHERE f.profile_user_id = p.user_id
  ) AS family_count
FROM profiles p
ORDER BY p.email ASC
"#;

pub async fn list_guest_overview(pool: &SqlitePool) -> sqlx::Result<Vec<GuestOverviewRow>> {
    sqlx::query_as::<_, GuestOverviewRow>(SQL_LIST_GUEST_OVERVIEW)
        .fetch_all(pool)
        .await
}
