//! Access token generation and verification.
//!
//! Access tokens are stateless HS256 JWTs: verification needs only the
//! process-wide signing secret, no storage lookup. The secret is an explicit
//! parameter, injected from configuration — rotating it invalidates all
//! outstanding access tokens while refresh tokens keep working.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::info;

use super::AuthError;
use crate::authz::Role;
use crate::models::auth::TokenClaims;

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Why an access token failed verification.
///
/// The session verifier branches on this: only `Expired` may enter the
/// silent-renewal path; anything else is rejected outright.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed token")]
    Malformed,
}

/// Generate a signed JWT access token (HS256, 15 min expiry).
pub fn issue_access_token(
    user_id: &str,
    email: &str,
    role: Role,
    secret: &[u8],
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: (now + Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
}

/// Verify a JWT access token, returning the claims on success.
///
/// Pure function, no I/O. Expiry is strict: no leeway past the embedded
/// `exp` timestamp.
pub fn verify_access_token(token: &str, secret: &[u8]) -> Result<TokenClaims, TokenError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;
    match decode::<TokenClaims>(token, &key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => Err(match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }),
    }
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    // Generate and persist
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("atrium")
        .join("jwt-secret")
}
