//! Application error types.
//!
//! Every failure leaving the core is mapped here to an HTTP status plus a
//! stable, machine-readable reason code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
///
/// `Unauthorized` and `Conflict` carry an explicit reason code because their
/// callers need to distinguish outcomes (`refresh_required` vs
/// `refresh_invalid`, `user_exists`, ...); the other variants have one fixed
/// code each.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {1}")]
    Validation(&'static str, String),

    #[error("Unauthorized: {1}")]
    Unauthorized(&'static str, String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {1}")]
    Conflict(&'static str, String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Shorthand for the common validation case.
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation("validation_error", msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(code, m) => (StatusCode::BAD_REQUEST, *code, m.as_str()),
            AppError::Unauthorized(code, m) => (StatusCode::UNAUTHORIZED, *code, m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(code, m) => (StatusCode::CONFLICT, *code, m.as_str()),
            AppError::ServiceUnavailable(m) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", m.as_str())
            }
            AppError::Internal(_) => (
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

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<atrium_core::auth::AuthError> for AppError {
    fn from(e: atrium_core::auth::AuthError) -> Self {
        use atrium_core::auth::AuthError;
        match e {
            AuthError::CredentialError => {
                AppError::Unauthorized("invalid_credentials", "Invalid credentials".into())
            }
            AuthError::TokenError(msg) => AppError::Unauthorized("invalid_token", msg),
            AuthError::ValidationError(msg) => AppError::validation(msg),
            // The only duplicate identity in the domain is a registered
            // email, so the core's Conflict keeps the signup reason code.
            AuthError::Conflict(msg) => AppError::Conflict("user_exists", msg),
            AuthError::NotFound(msg) => AppError::NotFound(msg),
            AuthError::Forbidden(msg) => AppError::Forbidden(msg),
            AuthError::ExternalService(msg) => AppError::ServiceUnavailable(msg),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<atrium_core::apps::AppsError> for AppError {
    fn from(e: atrium_core::apps::AppsError) -> Self {
        use atrium_core::apps::AppsError;
        match e {
            AppsError::NotFound(msg) => AppError::NotFound(msg),
            AppsError::Validation(msg) => AppError::validation(msg),
            AppsError::DbError(e) => AppError::from(e),
        }
    }
}
