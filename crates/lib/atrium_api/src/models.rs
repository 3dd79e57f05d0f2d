//! API request/response shapes.
//!
//! Wire models are camelCase; internal domain models live in
//! `atrium_core::models`.

use serde::{Deserialize, Serialize};

use atrium_core::authz::Role;
use atrium_core::models::apps::{ApiKeyRecord, App, AuditEntry};
use atrium_core::models::auth::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewRequest {
    /// Optional in the body: non-cookie clients put the refresh token here
    /// or in the `x-refresh-token` header.
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SocialLoginRequest {
    pub provider: String,
    pub assertion: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
}

impl From<User> for AuthUser {
    fn from(u: User) -> Self {
        AuthUser {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            verified: u.verified,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: AuthUser,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Apps & API keys
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<App> for AppInfo {
    fn from(a: App) -> Self {
        AppInfo {
            id: a.id,
            owner_id: a.owner_id,
            name: a.name,
            description: a.description,
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppListResponse {
    pub apps: Vec<AppInfo>,
}

/// Returned once, at creation time: the only moment the plaintext key exists.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyResponse {
    pub id: String,
    pub key: String,
    pub app_id: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyInfo {
    pub id: String,
    pub app_id: String,
    pub revoked: bool,
    pub created_at: String,
}

impl From<ApiKeyRecord> for ApiKeyInfo {
    fn from(k: ApiKeyRecord) -> Self {
        ApiKeyInfo {
            id: k.id,
            app_id: k.app_id,
            revoked: k.revoked,
            created_at: k.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiKeyListResponse {
    pub keys: Vec<ApiKeyInfo>,
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<AuthUser>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventInfo {
    pub id: String,
    pub action: String,
    pub user_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<AuditEntry> for AuditEventInfo {
    fn from(e: AuditEntry) -> Self {
        AuditEventInfo {
            id: e.id,
            action: e.action,
            user_id: e.user_id,
            metadata: e.metadata,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogResponse {
    pub events: Vec<AuditEventInfo>,
}
