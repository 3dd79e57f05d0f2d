//! Append-only audit log.
//!
//! Writes are fire-and-forget: a failed audit insert is logged and never
//! blocks or fails the operation being audited. Nothing in this module
//! mutates or deletes existing entries.

use sqlx::PgPool;
use tracing::warn;

use crate::auth::AuthError;
use crate::models::apps::AuditEntry;
use crate::uuid::uuidv7;

/// Record an audit event. `user_id` is `None` for anonymous actions.
pub async fn log_event(
    pool: &PgPool,
    action: &str,
    user_id: Option<&str>,
    metadata: Option<&serde_json::Value>,
) {
    let result = sqlx::query(
        "INSERT INTO audit_log (id, action, user_id, metadata) \
         VALUES ($1, $2, $3::uuid, $4)",
    )
    .bind(uuidv7())
    .bind(action)
    .bind(user_id)
    .bind(metadata)
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!(action, "failed to record audit event: {e}");
    }
}

/// Read the audit log, newest first. Admin-gated at the API boundary.
pub async fn list_events(pool: &PgPool, limit: i64) -> Result<Vec<AuditEntry>, AuthError> {
    let rows = sqlx::query_as::<
        _,
        (
            String,
            String,
            Option<String>,
            Option<serde_json::Value>,
            chrono::DateTime<chrono::Utc>,
        ),
    >(
        "SELECT id::text, action, user_id::text, metadata, created_at \
         FROM audit_log ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, action, user_id, metadata, created_at)| AuditEntry {
            id,
            action,
            user_id,
            metadata,
            created_at,
        })
        .collect())
}
