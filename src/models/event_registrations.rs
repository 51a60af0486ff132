#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRegistrationRow {
    pub profile_user_id: String,
    pub event_id: String,
    pub num_participants: i64,
    pub updated_at: Option<String>,
}
