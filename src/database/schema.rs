use sqlx::SqlitePool;

/// Applied at startup and by the test helpers. Every statement is
/// idempotent so the binaries can share one database file.
pub const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS profiles (
  user_id TEXT PRIMARY KEY,
  email TEXT UNIQUE,
  role TEXT NOT NULL DEFAULT 'invite',
  onboarding_completed INTEGER NOT NULL DEFAULT 0,
  arrival_date TEXT,
  departure_date TEXT,
  transport_mode TEXT,
  airport TEXT,
  residence TEXT,
  group_name TEXT,
  updated_at TEXT
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS family_members (
  id TEXT PRIMARY KEY,
  profile_user_id TEXT NOT NULL REFERENCES profiles(user_id) ON DELETE CASCADE,
  name TEXT NOT NULL,
  is_minor INTEGER NOT NULL DEFAULT 0,
  email TEXT,
  invitation_sent_at TEXT,
  linked_user_id TEXT
)
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_family_members_profile
ON family_members (profile_user_id)
"#,
    r#"
CREATE TABLE IF NOT EXISTS events (
  event_id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  description TEXT,
  event_type TEXT NOT NULL DEFAULT 'programme',
  scheduled_at TEXT NOT NULL,
  location TEXT,
  max_participants INTEGER
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS event_registrations (
  profile_user_id TEXT NOT NULL REFERENCES profiles(user_id) ON DELETE CASCADE,
  event_id TEXT NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
  num_participants INTEGER NOT NULL CHECK (num_participants >= 1),
  updated_at TEXT,
  PRIMARY KEY (profile_user_id, event_id)
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS announcements (
  id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  body TEXT NOT NULL,
  created_by TEXT NOT NULL,
  created_at TEXT NOT NULL
)
"#,
];

pub async fn apply_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
