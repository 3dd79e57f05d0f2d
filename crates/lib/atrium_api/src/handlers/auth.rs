//! Authentication request handlers.
//!
//! Token pairs are returned in the body for non-cookie clients and set as
//! httpOnly cookies per the configured transport policy.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedUser, REFRESH_TOKEN_HEADER};
use crate::models::{
    AuthUser, LoginRequest, LogoutRequest, LogoutResponse, MessageResponse, PasswordResetRequest,
    RenewRequest, RenewResponse, ResetPasswordRequest, SignupRequest, SocialLoginRequest,
    TokenResponse, VerifyEmailRequest,
};
use crate::services::auth;
use crate::services::cookies::REFRESH_COOKIE;

fn with_session_cookies(state: &AppState, resp: &TokenResponse) -> CookieJar {
    CookieJar::new()
        .add(state.config.cookie_policy.access_cookie(&resp.access_token))
        .add(state.config.cookie_policy.refresh_cookie(&resp.refresh_token))
}

/// `POST /auth/signup` — create a new user account.
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let resp = auth::signup(
        &state.pool,
        state.mailer.as_ref(),
        &body.username,
        &body.email,
        &body.password,
        state.config.jwt_secret.as_bytes(),
        &state.config.frontend_url,
    )
    .await?;
    let jar = with_session_cookies(&state, &resp);
    Ok((jar, Json(resp)))
}

/// `POST /auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let resp = auth::login(
        &state.pool,
        &body.email,
        &body.password,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    let jar = with_session_cookies(&state, &resp);
    Ok((jar, Json(resp)))
}

/// `POST /auth/renew` — exchange a refresh token for a fresh token pair.
///
/// The refresh token comes from the body, the `x-refresh-token` header, or
/// the refresh cookie, in that order.
pub async fn renew_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Option<Json<RenewRequest>>,
) -> AppResult<(CookieJar, Json<RenewResponse>)> {
    let refresh_token = body
        .and_then(|Json(b)| b.refresh_token)
        .or_else(|| {
            headers
                .get(REFRESH_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        })
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| {
            AppError::Unauthorized("refresh_required", "No refresh token provided".into())
        })?;

    let resp = auth::renew(
        &state.pool,
        &refresh_token,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;

    let jar = CookieJar::new()
        .add(state.config.cookie_policy.access_cookie(&resp.access_token))
        .add(state.config.cookie_policy.refresh_cookie(&resp.refresh_token));
    Ok((jar, Json(resp)))
}

/// `POST /auth/logout` — revoke a refresh token and clear session cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<LogoutRequest>>,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    let refresh_token = body
        .and_then(|Json(b)| b.refresh_token)
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()));

    let resp = auth::logout(&state.pool, refresh_token.as_deref()).await?;

    let jar = CookieJar::new()
        .add(state.config.cookie_policy.clear_access_cookie())
        .add(state.config.cookie_policy.clear_refresh_cookie());
    Ok((jar, Json(resp)))
}

/// `POST /auth/logout-all` — revoke every session of the authenticated user.
pub async fn logout_all_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    let resp = auth::logout_all(&state.pool, &user.0.sub).await?;
    let jar = CookieJar::new()
        .add(state.config.cookie_policy.clear_access_cookie())
        .add(state.config.cookie_policy.clear_refresh_cookie());
    Ok((jar, Json(resp)))
}

/// `POST /auth/social` — exchange a third-party identity assertion.
pub async fn social_login_handler(
    State(state): State<AppState>,
    Json(body): Json<SocialLoginRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let resp = auth::social_login(
        &state.pool,
        state.verifier.as_ref(),
        &body.provider,
        &body.assertion,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    let jar = with_session_cookies(&state, &resp);
    Ok((jar, Json(resp)))
}

/// `POST /auth/verify-email` — confirm an email-verification token.
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    let resp = auth::verify_email(&state.pool, &body.token).await?;
    Ok(Json(resp))
}

/// `POST /auth/password-reset/request` — start a password reset.
pub async fn request_password_reset_handler(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequest>,
) -> AppResult<Json<MessageResponse>> {
    let resp = auth::request_password_reset(
        &state.pool,
        state.mailer.as_ref(),
        &body.email,
        &state.config.frontend_url,
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /auth/password-reset/confirm` — complete a password reset.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let resp = auth::reset_password(&state.pool, &body.token, &body.new_password).await?;
    Ok(Json(resp))
}

/// `GET /auth/me` — the authenticated user's own record.
pub async fn me_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<AuthUser>> {
    let user = atrium_core::auth::queries::find_user_by_id(&state.pool, &user.0.sub)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(user.into()))
}
