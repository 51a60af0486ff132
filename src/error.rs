use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Event is full: {remaining} spot(s) left, {requested} requested")]
    CapacityExceeded { requested: i64, remaining: i64 },

    #[error("Invalid request: {0}")]
    InvalidArgument(String),

    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type PortalResult<T> = Result<T, PortalError>;
