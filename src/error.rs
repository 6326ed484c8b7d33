//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Malformed input: wrong feature count, non-finite values, bad query bounds.
#[derive(Debug, Clone, Error)]
#[error("validation failed: {0}")]
pub struct ValidationError(pub String);

/// Scorer unavailable or it rejected the input.
#[derive(Debug, Clone, Error)]
#[error("classification failed: {0}")]
pub struct ClassificationError(pub String);

/// Backing store unreachable or the write failed. Nothing was stored.
#[derive(Debug, Clone, Error)]
#[error("persistence failed: {0}")]
pub struct PersistenceError(pub String);

/// Unrecognized window token.
#[derive(Debug, Clone, Error)]
#[error("invalid window '{0}', expected one of 1m, 5m, 1h, 24h")]
pub struct InvalidWindowError(pub String);

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        PersistenceError(err.to_string())
    }
}

/// Outcome of a failed ingestion. Exactly one stage failed; later stages never ran.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Scoring artifact could not be loaded at startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model not found at {0}")]
    NotFound(String),
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model: {0}")]
    Invalid(String),
}

/// Errors surfaced over HTTP.
#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    InvalidWindow(String),
    ClassificationError(String),
    DatabaseError(String),
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::InvalidWindow(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::ClassificationError(msg) => {
                tracing::warn!("Classification error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Classifier unavailable or rejected input")
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::ValidationError(err.0)
    }
}

impl From<InvalidWindowError> for AppError {
    fn from(err: InvalidWindowError) -> Self {
        AppError::InvalidWindow(err.to_string())
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        AppError::DatabaseError(err.0)
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(e) => e.into(),
            IngestError::Classification(e) => AppError::ClassificationError(e.0),
            IngestError::Persistence(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
