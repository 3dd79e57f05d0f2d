//! # atrium_api
//!
//! HTTP API library for Atrium. The router wires the session verifier over
//! every route; protected routes add an identity guard on top.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use atrium_core::auth::social::AssertionVerifier;
use atrium_core::email::EmailDispatcher;

use crate::config::ApiConfig;
use crate::handlers::{admin, api_keys, apps, auth};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Third-party assertion verifier for social login.
    pub verifier: Arc<dyn AssertionVerifier>,
    /// Transactional email dispatcher.
    pub mailer: Arc<dyn EmailDispatcher>,
}

/// Run embedded database migrations.
///
/// Delegates to `atrium_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    atrium_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no resolved identity required)
    let public = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/renew", post(auth::renew_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/social", post(auth::social_login_handler))
        .route("/auth/verify-email", post(auth::verify_email_handler))
        .route(
            "/auth/password-reset/request",
            post(auth::request_password_reset_handler),
        )
        .route(
            "/auth/password-reset/confirm",
            post(auth::reset_password_handler),
        )
        .route("/api-keys/verify", post(api_keys::verify_api_key_handler));

    // Protected routes (require a resolved identity)
    let protected = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/logout-all", post(auth::logout_all_handler))
        .route("/apps", post(apps::create_app_handler))
        .route("/apps", get(apps::list_apps_handler))
        .route("/apps/{id}", patch(apps::update_app_handler))
        .route("/apps/{id}", delete(apps::delete_app_handler))
        .route("/apps/{id}/keys", post(api_keys::create_api_key_handler))
        .route("/apps/{id}/keys", get(api_keys::list_api_keys_handler))
        .route(
            "/api-keys/{id}/revoke",
            post(api_keys::revoke_api_key_handler),
        )
        .route("/admin/users", get(admin::list_users_handler))
        .route(
            "/admin/users/{id}/role",
            put(admin::update_user_role_handler),
        )
        .route("/admin/users/{id}", delete(admin::delete_user_handler))
        .route("/admin/audit-log", get(admin::audit_log_handler))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth));

    // The session verifier wraps everything: it resolves identity (renewing
    // silently when needed) or leaves the request anonymous.
    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::verify_session,
        ))
        .layer(cors)
        .with_state(state)
}
