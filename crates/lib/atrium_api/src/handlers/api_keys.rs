//! API key request handlers.
//!
//! Authorization always walks the owner chain (key -> app -> user) inside
//! the core; a resource the caller does not own reads as not found.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;

use atrium_core::apps::api_keys;
use atrium_core::audit;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiKeyInfo, ApiKeyListResponse, CreateApiKeyResponse};

/// Header a sub-application uses to present its API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// `POST /apps/{id}/keys` — create an API key for an owned app.
///
/// The plaintext key appears only in this response.
pub async fn create_api_key_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(app_id): Path<String>,
) -> AppResult<Json<CreateApiKeyResponse>> {
    let (plaintext, record) = api_keys::create_api_key(&state.pool, &user.0.sub, &app_id).await?;
    audit::log_event(
        &state.pool,
        "CREATE_API_KEY",
        Some(&user.0.sub),
        Some(&serde_json::json!({ "appId": app_id, "keyId": record.id })),
    )
    .await;
    Ok(Json(CreateApiKeyResponse {
        id: record.id,
        key: plaintext,
        app_id: record.app_id,
        created_at: record.created_at.to_rfc3339(),
    }))
}

/// `GET /apps/{id}/keys` — list an owned app's keys, revoked ones included.
pub async fn list_api_keys_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(app_id): Path<String>,
) -> AppResult<Json<ApiKeyListResponse>> {
    let records = api_keys::list_api_keys(&state.pool, &user.0.sub, &app_id).await?;
    Ok(Json(ApiKeyListResponse {
        keys: records.into_iter().map(Into::into).collect(),
    }))
}

/// `POST /api-keys/verify` — resolve the secret in the `x-api-key` header
/// to its key record.
///
/// The secret itself is the credential, so no session is required; a
/// revoked or unknown key reads the same as no key at all.
pub async fn verify_api_key_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ApiKeyInfo>> {
    let secret = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("api_key_required", "API key required".into())
        })?;

    let record = api_keys::verify_api_key(&state.pool, secret)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid_api_key", "Invalid API key".into()))?;
    Ok(Json(record.into()))
}

/// `POST /api-keys/{id}/revoke` — revoke a key. Idempotent.
pub async fn revoke_api_key_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(api_key_id): Path<String>,
) -> AppResult<Json<ApiKeyInfo>> {
    let record = api_keys::revoke_api_key(&state.pool, &user.0.sub, &api_key_id).await?;
    audit::log_event(
        &state.pool,
        "REVOKE_API_KEY",
        Some(&user.0.sub),
        Some(&serde_json::json!({ "keyId": api_key_id })),
    )
    .await;
    Ok(Json(record.into()))
}
