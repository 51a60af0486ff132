#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnnouncementRow {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created_by: String,
    pub created_at: String,
}
