//! API server configuration.

use axum_extra::extract::cookie::SameSite;
use time::Duration;

use atrium_core::auth::jwt::resolve_jwt_secret;

use crate::services::cookies::CookiePolicy;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3400").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT signing secret. Rotating it invalidates all outstanding access
    /// tokens; refresh tokens keep working and re-issue fresh ones.
    pub jwt_secret: String,
    /// Expected audience for Google identity assertions.
    pub google_client_id: String,
    /// Base URL used in verification / reset links.
    pub frontend_url: String,
    /// Cookie transport policy.
    pub cookie_policy: CookiePolicy,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                                  |
    /// |------------------------------|------------------------------------------|
    /// | `BIND_ADDR`                  | `127.0.0.1:3400`                         |
    /// | `DATABASE_URL`               | `postgres://localhost:5432/atrium`       |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file            |
    /// | `GOOGLE_CLIENT_ID`           | empty (social login disabled)            |
    /// | `FRONTEND_URL`               | `http://localhost:3000`                  |
    /// | `COOKIE_DOMAIN`              | unset (serving host)                     |
    /// | `COOKIE_SECURE`              | `false`                                  |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3400".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/atrium".into()),
            jwt_secret: resolve_jwt_secret(),
            google_client_id: std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cookie_policy: CookiePolicy {
                domain: std::env::var("COOKIE_DOMAIN").ok(),
                secure: std::env::var("COOKIE_SECURE").is_ok_and(|v| v == "true"),
                same_site: SameSite::Lax,
                max_age: Duration::days(30),
            },
        }
    }
}
