//! Auth-related database queries: users, the refresh-token store, and the
//! email-verification / password-reset token columns.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use crate::authz::Role;
use crate::models::auth::{User, UserWithPassword};
use crate::uuid::uuidv7;

fn map_user(
    id: String,
    username: String,
    email: String,
    role: String,
    verified: bool,
) -> Result<User, AuthError> {
    Ok(User {
        id,
        username,
        email,
        // Unrecognized role text is a data-integrity error, rejected here
        // at the boundary rather than at each use site.
        role: Role::from_str(&role)?,
        verified,
    })
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Fetch a user by email, including the password hash for login flows.
pub async fn find_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserWithPassword>, AuthError> {
    let row = sqlx::query_as::<_, (String, String, String, String, bool, Option<String>)>(
        "SELECT id::text, username, email, role, verified, password_hash \
         FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    row.map(|(id, username, email, role, verified, password_hash)| {
        Ok(UserWithPassword {
            user: map_user(id, username, email, role, verified)?,
            password_hash,
        })
    })
    .transpose()
}

/// Fetch a user by ID.
pub async fn find_user_by_id(pool: &PgPool, user_id: &str) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, (String, String, String, String, bool)>(
        "SELECT id::text, username, email, role, verified FROM users WHERE id = $1::uuid",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    row.map(|(id, username, email, role, verified)| map_user(id, username, email, role, verified))
        .transpose()
}

/// Create a new user, returning the full record.
///
/// `password_hash` is `None` for social-only accounts; `verification_token`
/// is `None` when identity was already attested by a third party.
///
/// A duplicate email surfaces as `Conflict`, not a raw database error: the
/// unique constraint is what closes the race between two concurrent signups
/// for the same address.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: Option<&str>,
    verified: bool,
    verification_token: Option<&str>,
) -> Result<User, AuthError> {
    let row = sqlx::query_as::<_, (String, String, String, String, bool)>(
        "INSERT INTO users (username, email, password_hash, verified, verification_token) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id::text, username, email, role, verified",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(verified)
    .bind(verification_token)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AuthError::Conflict("User already exists".into())
        }
        other => AuthError::DbError(other),
    })?;
    map_user(row.0, row.1, row.2, row.3, row.4)
}

/// Check whether an email is already registered.
pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, AuthError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// List all users (admin surface).
pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, AuthError> {
    let rows = sqlx::query_as::<_, (String, String, String, String, bool)>(
        "SELECT id::text, username, email, role, verified FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|(id, username, email, role, verified)| {
            map_user(id, username, email, role, verified)
        })
        .collect()
}

/// Update a user's role, returning the updated record if the user exists.
pub async fn update_user_role(
    pool: &PgPool,
    user_id: &str,
    role: Role,
) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, (String, String, String, String, bool)>(
        "UPDATE users SET role = $2 WHERE id = $1::uuid \
         RETURNING id::text, username, email, role, verified",
    )
    .bind(user_id)
    .bind(role.as_str())
    .fetch_optional(pool)
    .await?;
    row.map(|(id, username, email, role, verified)| map_user(id, username, email, role, verified))
        .transpose()
}

/// Delete a user. Owned apps, keys, and refresh tokens cascade.
pub async fn delete_user(pool: &PgPool, user_id: &str) -> Result<bool, AuthError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1::uuid")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Email verification & password reset tokens
// ---------------------------------------------------------------------------

/// Mark the user holding this verification token as verified, clearing the
/// token. Returns the user ID, or `None` if the token matches nobody.
pub async fn consume_verification_token(
    pool: &PgPool,
    token: &str,
) -> Result<Option<String>, AuthError> {
    let row = sqlx::query_scalar::<_, String>(
        "UPDATE users SET verified = TRUE, verification_token = NULL \
         WHERE verification_token = $1 \
         RETURNING id::text",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Attach a time-boxed password-reset token to a user.
pub async fn set_password_reset_token(
    pool: &PgPool,
    user_id: &str,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), AuthError> {
    sqlx::query(
        "UPDATE users SET password_reset_token = $2, password_reset_expires = $3 \
         WHERE id = $1::uuid",
    )
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Set a new password hash for the user holding a live reset token, clearing
/// the token in the same statement so it can never be used twice.
///
/// Returns the user ID, or `None` when the token is unknown or expired.
pub async fn consume_password_reset_token(
    pool: &PgPool,
    token: &str,
    new_password_hash: &str,
) -> Result<Option<String>, AuthError> {
    let row = sqlx::query_scalar::<_, String>(
        "UPDATE users SET password_hash = $2, \
                          password_reset_token = NULL, \
                          password_reset_expires = NULL \
         WHERE password_reset_token = $1 \
           AND password_reset_expires > now() \
         RETURNING id::text",
    )
    .bind(token)
    .bind(new_password_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ---------------------------------------------------------------------------
// Refresh token store
// ---------------------------------------------------------------------------

/// Store a refresh token hash.
pub async fn store_refresh_token(
    pool: &PgPool,
    token_hash: &str,
    user_id: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), AuthError> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, token_hash, user_id, expires_at) \
         VALUES ($1, $2, $3::uuid, $4)",
    )
    .bind(uuidv7())
    .bind(token_hash)
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Find a valid, non-revoked, non-expired refresh token. Returns the owning
/// user ID. Expired-but-unswept rows are inert: the `expires_at > now()`
/// predicate is the lazy expiry check.
pub async fn find_valid_refresh_token(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<String>, AuthError> {
    let row = sqlx::query_scalar::<_, String>(
        "SELECT user_id::text \
         FROM refresh_tokens \
         WHERE token_hash = $1 \
           AND revoked_at IS NULL \
           AND expires_at > now()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Atomically claim a refresh token for rotation: revoke it and return the
/// owning user ID, but only if it is still live. Of two concurrent renewals
/// presenting the same token, exactly one gets a row back.
pub async fn claim_refresh_token(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<String>, AuthError> {
    let row = sqlx::query_scalar::<_, String>(
        "UPDATE refresh_tokens SET revoked_at = now() \
         WHERE token_hash = $1 \
           AND revoked_at IS NULL \
           AND expires_at > now() \
         RETURNING user_id::text",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Revoke a refresh token by hash. Idempotent: revoking an unknown or
/// already-revoked token is not an error.
pub async fn revoke_refresh_token_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<(), AuthError> {
    sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() \
         WHERE token_hash = $1 AND revoked_at IS NULL",
    )
    .bind(token_hash)
    .execute(pool)
    .await?;
    Ok(())
}

/// Revoke all refresh tokens for a user (logout-all, password reset, role
/// change).
pub async fn revoke_all_refresh_tokens(pool: &PgPool, user_id: &str) -> Result<(), AuthError> {
    sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() \
         WHERE user_id = $1::uuid AND revoked_at IS NULL",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}
