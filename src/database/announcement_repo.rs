use sqlx::SqlitePool;

use crate::models::AnnouncementRow;

pub struct NewAnnouncement<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub created_by: &'a str,
}

const SQL_INSERT_ANNOUNCEMENT: &str = r#"
INSERT INTO announcements (
  id,
  title,
  body,
  created_by,
  created_at
) VALUES (?1, ?2, ?3, ?4, datetime('now'))
"#;

pub async fn insert_announcement(
    pool: &SqlitePool,
    announcement: NewAnnouncement<'_>,
) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_ANNOUNCEMENT)
        .bind(announcement.id)
        .bind(announcement.title)
        .bind(announcement.body)
        .bind(announcement.created_by)
        .execute(pool)
        .await?;
    Ok(())
}

const SQL_LIST_RECENT: &str = r#"
SELECT
  id,
  title,
  body,
  created_by,
  created_at
FROM announcements
ORDER BY datetime(created_at) DESC
LIMIT ?1
"#;

pub async fn list_recent(pool: &SqlitePool, limit: i64) -> sqlx::Result<Vec<AnnouncementRow>> {
    sqlx::query_as::<_, AnnouncementRow>(SQL_LIST_RECENT)
        .bind(limit)
        .fetch_all(pool)
        .await
}
