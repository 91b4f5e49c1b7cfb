//! Error types shared across the dashboard.
//!
//! Domain failures (`ValidationError`, `FetchError`) are caught at the
//! controller boundary. `AppError` maps them onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Rejected add-stock input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("symbol must not be blank")]
    BlankSymbol,

    #[error("company name must not be blank")]
    BlankName,

    #[error("{0} is already on the watchlist")]
    DuplicateSymbol(String),
}

/// Failure of a news source operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("news source '{source_name}' failed: {reason}")]
    Source { source_name: String, reason: String },

    #[error("news source unavailable")]
    Unavailable,
}

/// HTTP-facing error with status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Resource not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data (400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflicts with existing state (409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream news source failed (503).
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::DuplicateSymbol(_) => AppError::Conflict(e.to_string()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        AppError::Unavailable(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        let body = axum::Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
