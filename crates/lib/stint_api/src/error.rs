//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorResponse;
use stint_core::auth::AuthError;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, ApiError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Expired access token. Distinct from the generic unauthorized error
    /// so clients know to attempt a refresh instead of a full re-login.
    #[error("Session expired")]
    SessionExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m.as_str()),
            ApiError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            ApiError::SessionExpired => {
                (StatusCode::UNAUTHORIZED, "session_expired", "Session expired")
            }
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::BadRequest(m) => ApiError::BadRequest(m),
            AuthError::Unauthorized(m) => ApiError::Unauthorized(m),
            AuthError::PermissionDenied(m) => ApiError::Forbidden(m),
            AuthError::NotFound(m) => ApiError::NotFound(m),
            AuthError::Validation(m) => ApiError::Validation(m),
            AuthError::TokenExpired => ApiError::SessionExpired,
            AuthError::TokenInvalid => ApiError::Unauthorized("Invalid token".into()),
            AuthError::Db(e) => ApiError::Internal(e.to_string()),
            AuthError::Internal(m) => ApiError::Internal(m),
        }
    }
}
