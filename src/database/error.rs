use thiserror::Error;
use warp::http::StatusCode;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Insufficient stock for product {0}")]
    InsufficientStock(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing token, invalid token, wrong role and wrong owner all collapse into this.
    #[error("Not authorized")]
    Unauthorized,

    #[error("Order cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Server error")]
    Query(#[from] sqlx::Error),

    #[error("Server error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Server error")]
    Cache(#[from] redis::RedisError),

    #[error("Server error")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn invalid(info: impl Into<String>) -> Self {
        Self::InvalidRequest(info.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InsufficientStock(_)
            | ApiError::InvalidRequest(_)
            | ApiError::InvalidCredentials
            | ApiError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Query(_)
            | ApiError::Migration(_)
            | ApiError::Cache(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream failures are logged here so the client only ever sees a generic message.
    pub fn log(&self) {
        match self {
            ApiError::Query(e) => log::error!("Query failed: {e}"),
            ApiError::Migration(e) => log::error!("Migration failed: {e}"),
            ApiError::Cache(e) => log::error!("Cache failed: {:?} - {:?}", e.code(), e.detail()),
            ApiError::Internal(info) => log::error!("Internal error: {info}"),
            other => log::debug!("Request rejected: {other}"),
        }
    }
}

impl warp::reject::Reject for ApiError {}
