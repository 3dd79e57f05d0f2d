//! App CRUD, always scoped to the acting owner.

use sqlx::PgPool;

use super::AppsError;
use crate::models::apps::App;

type AppRow = (
    String,
    String,
    String,
    Option<String>,
    chrono::DateTime<chrono::Utc>,
);

fn map_app((id, owner_id, name, description, created_at): AppRow) -> App {
    App {
        id,
        owner_id,
        name,
        description,
        created_at,
    }
}

/// Create an app owned by `owner_id`.
pub async fn create_app(
    pool: &PgPool,
    owner_id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<App, AppsError> {
    if name.trim().is_empty() {
        return Err(AppsError::Validation("App name must not be empty".into()));
    }
    let row = sqlx::query_as::<_, AppRow>(
        "INSERT INTO apps (owner_id, name, description) \
         VALUES ($1::uuid, $2, $3) \
         RETURNING id::text, owner_id::text, name, description, created_at",
    )
    .bind(owner_id)
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(map_app(row))
}

/// List apps owned by a user.
pub async fn list_apps_for_owner(pool: &PgPool, owner_id: &str) -> Result<Vec<App>, AppsError> {
    let rows = sqlx::query_as::<_, AppRow>(
        "SELECT id::text, owner_id::text, name, description, created_at \
         FROM apps WHERE owner_id = $1::uuid ORDER BY created_at",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(map_app).collect())
}

/// Fetch an app only if `owner_id` owns it. The single ownership primitive:
/// a wrong owner and a missing app produce the same `None`.
pub async fn find_owned_app(
    pool: &PgPool,
    app_id: &str,
    owner_id: &str,
) -> Result<Option<App>, AppsError> {
    let row = sqlx::query_as::<_, AppRow>(
        "SELECT id::text, owner_id::text, name, description, created_at \
         FROM apps WHERE id = $1::uuid AND owner_id = $2::uuid",
    )
    .bind(app_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(map_app))
}

/// Update an owned app's name and/or description.
pub async fn update_app(
    pool: &PgPool,
    app_id: &str,
    owner_id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<App, AppsError> {
    let row = sqlx::query_as::<_, AppRow>(
        "UPDATE apps SET name = COALESCE($3, name), \
                         description = COALESCE($4, description) \
         WHERE id = $1::uuid AND owner_id = $2::uuid \
         RETURNING id::text, owner_id::text, name, description, created_at",
    )
    .bind(app_id)
    .bind(owner_id)
    .bind(name)
    .bind(description)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppsError::NotFound("App not found".into()))?;
    Ok(map_app(row))
}

/// Delete an owned app. Its API keys cascade.
pub async fn delete_app(pool: &PgPool, app_id: &str, owner_id: &str) -> Result<(), AppsError> {
    let result = sqlx::query("DELETE FROM apps WHERE id = $1::uuid AND owner_id = $2::uuid")
        .bind(app_id)
        .bind(owner_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppsError::NotFound("App not found".into()));
    }
    Ok(())
}
