//! Admin request handlers — role-gated user management and the audit log.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};

use atrium_core::audit;
use atrium_core::auth::queries;
use atrium_core::authz::Role;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedUser, require_admin};
use crate::models::{AuditLogResponse, AuthUser, UpdateRoleRequest, UserListResponse};

/// `GET /admin/users` — list all users.
pub async fn list_users_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<UserListResponse>> {
    require_admin(&user)?;
    let users = queries::list_users(&state.pool).await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
    }))
}

/// `PUT /admin/users/{id}/role` — change a user's role.
///
/// Unrecognized role names are rejected at the boundary. The target's
/// refresh tokens are revoked so old sessions cannot keep the old role
/// beyond the residual access-token lifetime.
pub async fn update_user_role_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
    Json(body): Json<UpdateRoleRequest>,
) -> AppResult<Json<AuthUser>> {
    require_admin(&user)?;

    let role = Role::from_str(&body.role)
        .map_err(|_| AppError::validation(format!("Unknown role '{}'", body.role)))?;

    let updated = queries::update_user_role(&state.pool, &user_id, role)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    queries::revoke_all_refresh_tokens(&state.pool, &user_id).await?;

    audit::log_event(
        &state.pool,
        "UPDATE_USER_ROLE",
        Some(&user.0.sub),
        Some(&serde_json::json!({ "targetUserId": user_id, "newRole": role.as_str() })),
    )
    .await;

    Ok(Json(updated.into()))
}

/// `DELETE /admin/users/{id}` — delete a user. Owned apps, keys, and
/// sessions cascade.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&user)?;

    if !queries::delete_user(&state.pool, &user_id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }

    audit::log_event(
        &state.pool,
        "DELETE_USER",
        Some(&user.0.sub),
        Some(&serde_json::json!({ "targetUserId": user_id })),
    )
    .await;

    Ok(Json(serde_json::json!({"success": true})))
}

/// `GET /admin/audit-log` — read the audit log, newest first.
pub async fn audit_log_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<AuditLogResponse>> {
    require_admin(&user)?;
    let events = audit::list_events(&state.pool, 500).await?;
    Ok(Json(AuditLogResponse {
        events: events.into_iter().map(Into::into).collect(),
    }))
}
