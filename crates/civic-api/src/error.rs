//! Error types for the civic events HTTP API.
//!
//! [`ApiError`] unifies every failure a handler can report into a single
//! enum that converts into a JSON response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use civic_core::FilterError;
use civic_db::DbError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A query parameter or request body failed validation.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The `X-API-Key` header was missing or did not match.
    #[error("missing or invalid API key")]
    Unauthorized,

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The record collides with an existing one.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A database or cache operation failed.
    #[error("backend error: {0}")]
    Backend(#[source] DbError),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => Self::Conflict(msg),
            DbError::NotFound(msg) => Self::NotFound(msg),
            other => Self::Backend(other),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(msg) => serde_json::json!({
                "error": "Bad request",
                "message": msg,
            }),
            Self::Unauthorized => serde_json::json!({
                "error": "Unauthorized",
                "message": "A valid X-API-Key header is required",
            }),
            Self::NotFound(msg) => serde_json::json!({
                "error": "Not found",
                "message": msg,
            }),
            Self::Conflict(msg) => serde_json::json!({
                "error": "Conflict",
                "message": msg,
            }),
            Self::Backend(err) => {
                tracing::error!(error = %err, "Backend failure while handling request");
                serde_json::json!({ "error": "Internal server error" })
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
