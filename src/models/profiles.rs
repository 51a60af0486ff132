#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub onboarding_completed: i64,
    pub arrival_date: Option<String>,
    pub departure_date: Option<String>,
    pub transport_mode: Option<String>,
    pub airport: Option<String>,
    pub residence: Option<String>,
    pub group_name: Option<String>,
    pub updated_at: Option<String>,
}
