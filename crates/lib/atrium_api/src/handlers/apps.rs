//! App management request handlers. All operations are owner-scoped.

use axum::Json;
use axum::extract::{Path, State};

use atrium_core::apps::queries;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AppInfo, AppListResponse, CreateAppRequest, UpdateAppRequest};

/// `POST /apps` — register a new app owned by the authenticated user.
pub async fn create_app_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(body): Json<CreateAppRequest>,
) -> AppResult<Json<AppInfo>> {
    let app = queries::create_app(
        &state.pool,
        &user.0.sub,
        &body.name,
        body.description.as_deref(),
    )
    .await?;
    Ok(Json(app.into()))
}

/// `GET /apps` — list the authenticated user's apps.
pub async fn list_apps_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<AppListResponse>> {
    let apps = queries::list_apps_for_owner(&state.pool, &user.0.sub).await?;
    Ok(Json(AppListResponse {
        apps: apps.into_iter().map(Into::into).collect(),
    }))
}

/// `PATCH /apps/{id}` — update an owned app.
pub async fn update_app_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(app_id): Path<String>,
    Json(body): Json<UpdateAppRequest>,
) -> AppResult<Json<AppInfo>> {
    let app = queries::update_app(
        &state.pool,
        &app_id,
        &user.0.sub,
        body.name.as_deref(),
        body.description.as_deref(),
    )
    .await?;
    Ok(Json(app.into()))
}

/// `DELETE /apps/{id}` — delete an owned app and its keys.
pub async fn delete_app_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(app_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    queries::delete_app(&state.pool, &app_id, &user.0.sub).await?;
    Ok(Json(serde_json::json!({"success": true})))
}
