//! Authentication and authorization logic.
//!
//! Provides password hashing, access/refresh credential management, social
//! identity exchange, and the database queries behind them, shared across
//! `atrium_api` and the server binary.

pub mod jwt;
pub mod password;
pub mod queries;
pub mod refresh;
pub mod social;

use thiserror::Error;

/// Authentication errors.
///
/// Variants map 1:1 onto the stable reason codes surfaced at the API
/// boundary; authentication failures always fail closed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad credentials — wrong password, unusable account.
    #[error("Invalid credentials")]
    CredentialError,

    /// Access or refresh token rejected.
    #[error("Token error: {0}")]
    TokenError(String),

    /// Malformed, user-correctable input.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Duplicate identity (email already registered).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Entity absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Role or ownership mismatch.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Email dispatch or third-party assertion service unreachable.
    /// Transient, never an authentication success.
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
