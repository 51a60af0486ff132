#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FamilyMemberRow {
    pub id: String,
    pub profile_user_id: String,
    pub name: String,
    pub is_minor: i64,
    pub email: Option<String>,
    pub invitation_sent_at: Option<String>,
    pub linked_user_id: Option<String>,
}
