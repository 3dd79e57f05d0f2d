//! API key management.
//!
//! Opaque secrets bound to an app, stored SHA-256-hashed. The plaintext is
//! returned exactly once at creation; afterwards a key can only be verified
//! or revoked. Revocation is monotonic: `revoked` goes false -> true and
//! never back.

use sqlx::PgPool;

use super::{AppsError, queries};
use crate::auth::refresh::{generate_opaque_token, hash_opaque_token};
use crate::models::apps::ApiKeyRecord;
use crate::uuid::uuidv7;

type KeyRow = (String, String, bool, chrono::DateTime<chrono::Utc>);

fn map_key((id, app_id, revoked, created_at): KeyRow) -> ApiKeyRecord {
    ApiKeyRecord {
        id,
        app_id,
        revoked,
        created_at,
    }
}

/// Create an API key for an app owned by `user_id`.
///
/// Returns the plaintext secret and the stored record. The secret cannot be
/// retrieved again later.
pub async fn create_api_key(
    pool: &PgPool,
    user_id: &str,
    app_id: &str,
) -> Result<(String, ApiKeyRecord), AppsError> {
    // Ownership resolved through the store, never from a client claim.
    queries::find_owned_app(pool, app_id, user_id)
        .await?
        .ok_or_else(|| AppsError::NotFound("App not found".into()))?;

    let plaintext = generate_opaque_token();
    let key_hash = hash_opaque_token(&plaintext);

    let row = sqlx::query_as::<_, KeyRow>(
        "INSERT INTO api_keys (id, app_id, key_hash) \
         VALUES ($1, $2::uuid, $3) \
         RETURNING id::text, app_id::text, revoked, created_at",
    )
    .bind(uuidv7())
    .bind(app_id)
    .bind(&key_hash)
    .fetch_one(pool)
    .await?;

    Ok((plaintext, map_key(row)))
}

/// List an owned app's API keys, revoked ones included (callers filter for
/// display).
pub async fn list_api_keys(
    pool: &PgPool,
    user_id: &str,
    app_id: &str,
) -> Result<Vec<ApiKeyRecord>, AppsError> {
    queries::find_owned_app(pool, app_id, user_id)
        .await?
        .ok_or_else(|| AppsError::NotFound("App not found".into()))?;

    let rows = sqlx::query_as::<_, KeyRow>(
        "SELECT id::text, app_id::text, revoked, created_at \
         FROM api_keys WHERE app_id = $1::uuid \
         ORDER BY created_at DESC",
    )
    .bind(app_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(map_key).collect())
}

/// Revoke an API key, walking key -> app -> owner for authorization.
///
/// Idempotent: revoking an already-revoked key succeeds and leaves it
/// revoked. A key the caller does not own reads as absent.
pub async fn revoke_api_key(
    pool: &PgPool,
    user_id: &str,
    api_key_id: &str,
) -> Result<ApiKeyRecord, AppsError> {
    let row = sqlx::query_as::<_, KeyRow>(
        "UPDATE api_keys k SET revoked = TRUE \
         FROM apps a \
         WHERE k.id = $1::uuid \
           AND a.id = k.app_id \
           AND a.owner_id = $2::uuid \
         RETURNING k.id::text, k.app_id::text, k.revoked, k.created_at",
    )
    .bind(api_key_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppsError::NotFound("API key not found".into()))?;
    Ok(map_key(row))
}

/// Resolve an active (non-revoked) API key secret to its record.
pub async fn verify_api_key(
    pool: &PgPool,
    secret: &str,
) -> Result<Option<ApiKeyRecord>, AppsError> {
    let key_hash = hash_opaque_token(secret);
    let row = sqlx::query_as::<_, KeyRow>(
        "SELECT id::text, app_id::text, revoked, created_at \
         FROM api_keys \
         WHERE key_hash = $1 AND revoked = FALSE",
    )
    .bind(&key_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(map_key))
}
