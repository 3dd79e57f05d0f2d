//! Cookie transport policy — set/clear httpOnly auth cookies.
//!
//! Flags and scope come from configuration instead of being baked into call
//! sites, keeping the core transport-agnostic. Cookie names: `atrium_access`,
//! `atrium_refresh`.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "atrium_access";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "atrium_refresh";

/// Credential transport policy supplied by the serving edge.
///
/// Both cookies get the same 30-day client-side max-age; the access token's
/// real lifetime is the shorter expiry embedded in the signed token itself.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    /// Cookie domain; `None` defaults to the serving host.
    pub domain: Option<String>,
    /// `Secure` flag — on in production, off for plain-HTTP dev.
    pub secure: bool,
    /// SameSite policy.
    pub same_site: SameSite,
    /// Client-side lifetime of both cookies.
    pub max_age: Duration,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            domain: None,
            secure: false,
            same_site: SameSite::Lax,
            max_age: Duration::days(30),
        }
    }
}

impl CookiePolicy {
    fn build(&self, name: &str, value: String, max_age: Duration) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value))
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .path("/".to_string())
            .max_age(max_age);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    /// Build a httpOnly cookie for the access token.
    pub fn access_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(ACCESS_COOKIE, token.to_string(), self.max_age)
    }

    /// Build a httpOnly cookie for the refresh token.
    pub fn refresh_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(REFRESH_COOKIE, token.to_string(), self.max_age)
    }

    /// Build an expired cookie to clear the access token.
    pub fn clear_access_cookie(&self) -> Cookie<'static> {
        self.build(ACCESS_COOKIE, String::new(), Duration::ZERO)
    }

    /// Build an expired cookie to clear the refresh token.
    pub fn clear_refresh_cookie(&self) -> Cookie<'static> {
        self.build(REFRESH_COOKIE, String::new(), Duration::ZERO)
    }
}
