//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes (which carry `#[serde(rename)]` for camelCase etc.).

use serde::{Deserialize, Serialize};

use crate::authz::Role;

/// Domain user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
}

/// User with password hash (for internal auth flows).
///
/// `password_hash` is `None` for social-only accounts: no password can ever
/// verify against them.
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: Option<String>,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — user ID (standard JWT `sub` claim).
    pub sub: String,
    /// User email.
    pub email: String,
    /// User role.
    pub role: Role,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}
