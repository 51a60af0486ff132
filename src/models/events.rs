#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub scheduled_at: String,
    pub location: Option<String>,
    pub max_participants: Option<i64>,
}

/// Event plus the aggregates the list page and the capacity check share.
/// Never persisted; recomputed per query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventWithDetailsRow {
    pub event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub scheduled_at: String,
    pub location: Option<String>,
    pub max_participants: Option<i64>,
    pub participants_count: i64,
    pub my_participants: Option<i64>,
}
