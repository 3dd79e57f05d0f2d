//! Session verifier middleware.
//!
//! Runs on every request. Resolves identity from the presented access
//! credential (Bearer header or cookie), transparently renewing an expired
//! one from a valid refresh credential, and fails closed on anything
//! ambiguous. Anonymous requests pass through; downstream guards reject
//! them where identity is required.

use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::{HeaderName, HeaderValue};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use tracing::debug;

use atrium_core::auth::jwt::{
    ACCESS_TOKEN_EXPIRY_SECS, TokenError, issue_access_token, verify_access_token,
};
use atrium_core::auth::queries;
use atrium_core::auth::refresh::hash_opaque_token;
use atrium_core::authz::Role;
use atrium_core::models::auth::TokenClaims;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::{ACCESS_COOKIE, REFRESH_COOKIE};

/// Header a non-cookie client uses to present its refresh token.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";
/// Header carrying a silently renewed access token back to the client.
pub const NEW_ACCESS_TOKEN_HEADER: &str = "x-new-access-token";

/// Identity resolved for this request, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

fn access_token_from(request: &Request, jar: &CookieJar) -> Option<String> {
    // Bearer header wins over the cookie.
    if let Some(token) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }
    jar.get(ACCESS_COOKIE).map(|c| c.value().to_string())
}

fn refresh_token_from(request: &Request, jar: &CookieJar) -> Option<String> {
    if let Some(token) = request
        .headers()
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(token.to_string());
    }
    jar.get(REFRESH_COOKIE).map(|c| c.value().to_string())
}

/// Axum middleware implementing the session state machine:
/// anonymous passthrough, direct verification, or silent renewal on expiry.
pub async fn verify_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(request.headers());

    let Some(access_token) = access_token_from(&request, &jar) else {
        // No credential: the request proceeds anonymous.
        return Ok(next.run(request).await);
    };

    let secret = state.config.jwt_secret.as_bytes();
    match verify_access_token(&access_token, secret) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthenticatedUser(claims));
            Ok(next.run(request).await)
        }
        Err(TokenError::Expired) => {
            let Some(refresh_token) = refresh_token_from(&request, &jar) else {
                return Err(AppError::Unauthorized(
                    "refresh_required",
                    "Refresh token required".into(),
                ));
            };
            renew_and_continue(state, request, next, &refresh_token).await
        }
        Err(TokenError::InvalidSignature) | Err(TokenError::Malformed) => Err(
            AppError::Unauthorized("invalid_token", "Invalid token".into()),
        ),
    }
}

/// The silent-renewal path. Re-resolves the user from the refresh store —
/// the expired token's claims are never trusted — and delivers the fresh
/// access token on the response so no extra round trip is needed.
///
/// The refresh record itself is not rotated here: parallel in-flight
/// requests may each mint an access token from the same still-valid refresh
/// credential, and its own expiry is never extended.
async fn renew_and_continue(
    state: AppState,
    mut request: Request,
    next: Next,
    refresh_token: &str,
) -> Result<Response, AppError> {
    let token_hash = hash_opaque_token(refresh_token);

    let Some(user_id) = queries::find_valid_refresh_token(&state.pool, &token_hash).await? else {
        return Err(AppError::Unauthorized(
            "refresh_invalid",
            "Refresh token invalid or expired".into(),
        ));
    };

    let Some(user) = queries::find_user_by_id(&state.pool, &user_id).await? else {
        return Err(AppError::Unauthorized(
            "user_not_found",
            "User not found".into(),
        ));
    };

    let secret = state.config.jwt_secret.as_bytes();
    let new_access = issue_access_token(&user.id, &user.email, user.role, secret)?;
    debug!(user_id = %user.id, "silently renewed access token");

    let now = Utc::now().timestamp();
    request.extensions_mut().insert(AuthenticatedUser(TokenClaims {
        sub: user.id,
        email: user.email,
        role: user.role,
        exp: now + ACCESS_TOKEN_EXPIRY_SECS,
        iat: now,
    }));

    let mut response = next.run(request).await;

    // Hand the fresh token back as both header and cookie.
    let header_value = HeaderValue::from_str(&new_access)
        .map_err(|e| AppError::Internal(format!("token header: {e}")))?;
    response
        .headers_mut()
        .insert(HeaderName::from_static(NEW_ACCESS_TOKEN_HEADER), header_value);

    let cookie = state.config.cookie_policy.access_cookie(&new_access);
    let cookie_value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AppError::Internal(format!("cookie header: {e}")))?;
    response.headers_mut().append(SET_COOKIE, cookie_value);

    Ok(response)
}

/// Guard layer for protected routes: rejects requests `verify_session`
/// left anonymous.
pub async fn require_auth(request: Request, next: Next) -> Result<Response, AppError> {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        return Err(AppError::Unauthorized(
            "unauthorized",
            "Authentication required".into(),
        ));
    }
    Ok(next.run(request).await)
}

/// Require the admin role on an already-authenticated request.
pub fn require_admin(user: &AuthenticatedUser) -> Result<(), AppError> {
    atrium_core::authz::require_role(user.0.role, &[Role::Admin])?;
    Ok(())
}
