//! Authentication service — signup/login/renewal flows delegating to
//! `atrium_core::auth`.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;

use atrium_core::audit;
use atrium_core::auth::jwt::{ACCESS_TOKEN_EXPIRY_SECS, issue_access_token};
use atrium_core::auth::refresh::{
    REFRESH_TOKEN_EXPIRY_DAYS, generate_opaque_token, hash_opaque_token,
};
use atrium_core::auth::social::{AssertionVerifier, Provider};
use atrium_core::auth::{queries, social};
use atrium_core::email::EmailDispatcher;
use atrium_core::models::auth::User;

use crate::error::{AppError, AppResult};
use crate::models::{LogoutResponse, MessageResponse, RenewResponse, TokenResponse};

/// Password-reset token lifetime: 15 minutes.
const RESET_TOKEN_EXPIRY_MINS: i64 = 15;

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

fn validate_email(email: &str) -> AppResult<()> {
    let well_formed = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(AppError::validation("Invalid email address"));
    }
    Ok(())
}

fn validate_signup(username: &str, email: &str, password: &str) -> AppResult<()> {
    if username.len() < 3 || username.len() > 30 {
        return Err(AppError::validation(
            "Username must be between 3 and 30 characters",
        ));
    }
    validate_email(email)?;
    if password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Token pair issuance — login, signup, and social login converge here
// ---------------------------------------------------------------------------

/// Mint an access token and persist a new refresh token for `user`.
async fn issue_token_pair(
    pool: &PgPool,
    user: &User,
    jwt_secret: &[u8],
) -> AppResult<(String, String)> {
    let access_token = issue_access_token(&user.id, &user.email, user.role, jwt_secret)?;
    let refresh_token = generate_opaque_token();
    let token_hash = hash_opaque_token(&refresh_token);
    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);
    queries::store_refresh_token(pool, &token_hash, &user.id, expires_at).await?;
    Ok((access_token, refresh_token))
}

fn build_token_response(user: User, access_token: String, refresh_token: String) -> TokenResponse {
    TokenResponse {
        access_token,
        refresh_token,
        expires_in: ACCESS_TOKEN_EXPIRY_SECS,
        token_type: "Bearer".to_string(),
        user: user.into(),
    }
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Register a new user account and issue a token pair.
pub async fn signup(
    pool: &PgPool,
    mailer: &dyn EmailDispatcher,
    username: &str,
    email: &str,
    password: &str,
    jwt_secret: &[u8],
    frontend_url: &str,
) -> AppResult<TokenResponse> {
    validate_signup(username, email, password)?;

    if queries::email_exists(pool, email).await? {
        return Err(AppError::Conflict(
            "user_exists",
            "User already exists".into(),
        ));
    }

    let password_hash = atrium_core::auth::password::hash_password(password)?;
    let verification_token = uuid::Uuid::new_v4().to_string();

    let user = queries::create_user(
        pool,
        username,
        email,
        Some(&password_hash),
        false,
        Some(&verification_token),
    )
    .await?;

    let link = format!("{frontend_url}/verify-email?token={verification_token}");
    mailer
        .send(
            email,
            "Verify Your Email",
            &format!("Click here to verify: {link}"),
        )
        .await?;

    let (access_token, refresh_token) = issue_token_pair(pool, &user, jwt_secret).await?;
    audit::log_event(
        pool,
        "SIGNUP",
        Some(&user.id),
        Some(&serde_json::json!({ "email": email })),
    )
    .await;

    Ok(build_token_response(user, access_token, refresh_token))
}

/// Authenticate with email + password.
///
/// No refresh record is written unless the password verifies.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    validate_email(email)?;

    let Some(record) = queries::find_user_by_email(pool, email).await? else {
        return Err(AppError::Unauthorized("user_not_found", "User not found".into()));
    };

    // Social-only accounts have no hash: password login can never succeed.
    let Some(password_hash) = record.password_hash.as_deref() else {
        return Err(AppError::Unauthorized("invalid_password", "Invalid password".into()));
    };

    if !atrium_core::auth::password::verify_password(password, password_hash)? {
        return Err(AppError::Unauthorized("invalid_password", "Invalid password".into()));
    }

    let user = record.user;
    let (access_token, refresh_token) = issue_token_pair(pool, &user, jwt_secret).await?;
    audit::log_event(
        pool,
        "LOGIN",
        Some(&user.id),
        Some(&serde_json::json!({ "email": email })),
    )
    .await;

    Ok(build_token_response(user, access_token, refresh_token))
}

/// Exchange a refresh token for a fresh access token, rotating the refresh
/// token (single use).
///
/// The claim is atomic: of two concurrent renewals presenting the same
/// token, one wins and the other fails closed. The user is re-resolved from
/// the store, never from stale access-token claims.
pub async fn renew(pool: &PgPool, refresh_token: &str, jwt_secret: &[u8]) -> AppResult<RenewResponse> {
    let token_hash = hash_opaque_token(refresh_token);

    let Some(user_id) = queries::claim_refresh_token(pool, &token_hash).await? else {
        return Err(AppError::Unauthorized(
            "refresh_invalid",
            "Refresh token invalid or expired".into(),
        ));
    };

    let Some(user) = queries::find_user_by_id(pool, &user_id).await? else {
        return Err(AppError::Unauthorized("user_not_found", "User not found".into()));
    };

    let (access_token, new_refresh) = issue_token_pair(pool, &user, jwt_secret).await?;

    Ok(RenewResponse {
        access_token,
        refresh_token: new_refresh,
        expires_in: ACCESS_TOKEN_EXPIRY_SECS,
        token_type: "Bearer".to_string(),
    })
}

/// Logout — revoke a specific refresh token. Idempotent.
pub async fn logout(pool: &PgPool, refresh_token: Option<&str>) -> AppResult<LogoutResponse> {
    if let Some(token) = refresh_token {
        let token_hash = hash_opaque_token(token);
        queries::revoke_refresh_token_by_hash(pool, &token_hash).await?;
    }
    Ok(LogoutResponse { success: true })
}

/// Logout all sessions — revoke all refresh tokens for a user.
pub async fn logout_all(pool: &PgPool, user_id: &str) -> AppResult<LogoutResponse> {
    queries::revoke_all_refresh_tokens(pool, user_id).await?;
    Ok(LogoutResponse { success: true })
}

// ---------------------------------------------------------------------------
// Email verification & password reset
// ---------------------------------------------------------------------------

/// Confirm an email-verification token. Single use.
pub async fn verify_email(pool: &PgPool, token: &str) -> AppResult<MessageResponse> {
    let Some(user_id) = queries::consume_verification_token(pool, token).await? else {
        return Err(AppError::validation("Invalid or expired verification token"));
    };
    audit::log_event(pool, "VERIFY_EMAIL", Some(&user_id), None).await;
    Ok(MessageResponse {
        message: "Email verified.".into(),
    })
}

/// Start a password reset: attach a 15-minute token and email it.
pub async fn request_password_reset(
    pool: &PgPool,
    mailer: &dyn EmailDispatcher,
    email: &str,
    frontend_url: &str,
) -> AppResult<MessageResponse> {
    let Some(record) = queries::find_user_by_email(pool, email).await? else {
        return Err(AppError::NotFound("User not found".into()));
    };
    let user = record.user;

    let reset_token = uuid::Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_EXPIRY_MINS);
    queries::set_password_reset_token(pool, &user.id, &reset_token, expires_at).await?;

    let link = format!("{frontend_url}/reset-password?token={reset_token}");
    mailer
        .send(email, "Reset Your Password", &format!("Click here: {link}"))
        .await?;

    audit::log_event(
        pool,
        "REQUEST_PASSWORD_RESET",
        Some(&user.id),
        Some(&serde_json::json!({ "email": email })),
    )
    .await;

    Ok(MessageResponse {
        message: "Password reset email sent.".into(),
    })
}

/// Complete a password reset with a live token.
///
/// The token is cleared in the same statement that sets the new hash, so a
/// second use fails. All existing refresh tokens are revoked: old sessions
/// stop renewing immediately.
pub async fn reset_password(
    pool: &PgPool,
    token: &str,
    new_password: &str,
) -> AppResult<MessageResponse> {
    if new_password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }

    let new_hash = atrium_core::auth::password::hash_password(new_password)?;
    let Some(user_id) = queries::consume_password_reset_token(pool, token, &new_hash).await? else {
        return Err(AppError::validation("Invalid or expired reset token"));
    };

    queries::revoke_all_refresh_tokens(pool, &user_id).await?;
    audit::log_event(pool, "RESET_PASSWORD", Some(&user_id), None).await;

    Ok(MessageResponse {
        message: "Password reset successful. You can now log in.".into(),
    })
}

// ---------------------------------------------------------------------------
// Social login
// ---------------------------------------------------------------------------

/// Exchange a third-party identity assertion for a local session.
///
/// Converges on the same issuance path as password login.
pub async fn social_login(
    pool: &PgPool,
    verifier: &dyn AssertionVerifier,
    provider: &str,
    assertion: &str,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    let provider = Provider::parse(provider)?;
    let user = social::exchange(pool, verifier, provider, assertion).await?;

    let (access_token, refresh_token) = issue_token_pair(pool, &user, jwt_secret).await?;
    info!(user_id = %user.id, "social login");
    audit::log_event(
        pool,
        "SOCIAL_LOGIN",
        Some(&user.id),
        Some(&serde_json::json!({ "email": user.email })),
    )
    .await;

    Ok(build_token_response(user, access_token, refresh_token))
}
