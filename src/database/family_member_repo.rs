use sqlx::{SqliteConnection, SqlitePool};

use crate::models::FamilyMemberRow;

pub struct NewFamilyMember<'a> {
    pub id: &'a str,
    pub profile_user_id: &'a str,
    pub name: &'a str,
    pub is_minor: bool,
    pub email: Option<&'a str>,
}

const SQL_INSERT_FAMILY_MEMBER: &str = r#"
INSERT INTO family_members (
  id,
  profile_user_id,
  name,
  is_minor,
  email
) VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub async fn insert_family_member(
    conn: &mut SqliteConnection,
    member: NewFamilyMember<'_>,
) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_FAMILY_MEMBER)
        .bind(member.id)
        .bind(member.profile_user_id)
        .bind(member.name)
        .bind(member.is_minor as i64)
        .bind(member.email)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

const SQL_LIST_FOR_PROFILE: &str = r#"
SELECT
  id,
  profile_user_id,
  name,
  is_minor,
  email,
  invitation_sent_at,
  linked_user_id
FROM family_members
WHERE profile_user_id = ?1
ORDER BY name ASC
"#;

pub async fn list_for_profile(
    pool: &SqlitePool,
    profile_user_id: &str,
) -> sqlx::Result<Vec<FamilyMemberRow>> {
    sqlx::query_as::<_, FamilyMemberRow>(SQL_LIST_FOR_PROFILE)
        .bind(profile_user_id)
        .fetch_all(pool)
        .await
}

const SQL_LOAD_FAMILY_MEMBER: &str = r#"
SELECT
  id,
  profile_user_id,
  name,
  is_minor,
  email,
  invitation_sent_at,
  linked_user_id
FROM family_members
WHERE id = ?1
LIMIT 1
"#;

pub async fn load_family_member(
    pool: &SqlitePool,
    member_id: &str,
) -> sqlx::Result<Option<FamilyMemberRow>> {
    sqlx::query_as::<_, FamilyMemberRow>(SQL_LOAD_FAMILY_MEMBER)
        .bind(member_id)
        .fetch_optional(pool)
        .await
}

const SQL_MARK_INVITATION_SENT: &str = r#"
UPDATE family_members
SET invitation_sent_at = datetime('now')
WHERE id = ?1
  AND invitation_sent_at IS NULL
"#;

pub async fn mark_invitation_sent(pool: &SqlitePool, member_id: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_MARK_INVITATION_SENT)
        .bind(member_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

// Write-once link: re-linking to the same identity is a no-op success,
// linking to a different identity matches zero rows.
const SQL_LINK_USER: &str = r#"
UPDATE family_members
SET linked_user_id = ?2
WHERE id = ?1
  AND (linked_user_id IS NULL OR linked_user_id = ?2)
"#;

pub async fn link_user(pool: &SqlitePool, member_id: &str, user_id: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_LINK_USER)
        .bind(member_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
