//! Social identity bridge.
//!
//! Verifies a third-party identity assertion and maps it to a local user,
//! creating one on first login. Verification goes through the
//! [`AssertionVerifier`] trait so the HTTP round trip can be faked in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use super::{AuthError, queries};
use crate::models::auth::User;

/// Timeout for assertion verification round trips. Exceeding it is a
/// transient external failure, never an authentication success.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Identity providers this deployment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
}

impl Provider {
    /// Parse a provider name; anything not explicitly enabled is rejected.
    pub fn parse(s: &str) -> Result<Self, AuthError> {
        match s {
            "google" => Ok(Provider::Google),
            other => Err(AuthError::ValidationError(format!(
                "Unsupported provider '{other}'"
            ))),
        }
    }
}

/// Claims extracted from a verified third-party assertion.
#[derive(Debug, Clone)]
pub struct AssertionClaims {
    pub email: String,
    pub name: Option<String>,
}

/// Verifies third-party identity assertions.
#[async_trait]
pub trait AssertionVerifier: Send + Sync {
    /// Verify `assertion` for `provider`, returning the attested claims.
    ///
    /// Fails with `TokenError` on signature/audience/expiry mismatch and
    /// `ExternalService` when the verification service is unreachable.
    async fn verify(
        &self,
        provider: Provider,
        assertion: &str,
    ) -> Result<AssertionClaims, AuthError>;
}

#[derive(Deserialize)]
struct GoogleTokenInfo {
    aud: String,
    email: String,
    email_verified: Option<String>,
    name: Option<String>,
}

/// Verifies Google ID tokens against the tokeninfo endpoint.
///
/// The endpoint only answers for tokens whose signature Google itself
/// validates, so a 2xx response plus an audience match is a verified
/// assertion.
pub struct GoogleVerifier {
    client: reqwest::Client,
    audience: String,
}

impl GoogleVerifier {
    pub fn new(audience: String) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Internal(format!("http client: {e}")))?;
        Ok(Self { client, audience })
    }
}

#[async_trait]
impl AssertionVerifier for GoogleVerifier {
    async fn verify(
        &self,
        provider: Provider,
        assertion: &str,
    ) -> Result<AssertionClaims, AuthError> {
        debug_assert_eq!(provider, Provider::Google);

        let resp = self
            .client
            .get(GOOGLE_TOKENINFO_URL)
            .query(&[("id_token", assertion)])
            .send()
            .await
            .map_err(|e| AuthError::ExternalService(format!("tokeninfo request: {e}")))?;

        // Google answers 4xx for invalid/expired tokens.
        if resp.status().is_client_error() {
            return Err(AuthError::TokenError("Invalid assertion".into()));
        }
        if !resp.status().is_success() {
            return Err(AuthError::ExternalService(format!(
                "tokeninfo returned {}",
                resp.status()
            )));
        }

        let info: GoogleTokenInfo = resp
            .json()
            .await
            .map_err(|e| AuthError::ExternalService(format!("tokeninfo parse: {e}")))?;

        if info.aud != self.audience {
            return Err(AuthError::TokenError("Invalid assertion".into()));
        }
        if info.email_verified.as_deref() != Some("true") {
            return Err(AuthError::TokenError("Invalid assertion".into()));
        }

        Ok(AssertionClaims {
            email: info.email,
            name: info.name,
        })
    }
}

/// Exchange a verified third-party assertion for a local user, creating one
/// on first login.
///
/// New accounts get a NULL password hash (password login can never succeed
/// for them) and are pre-verified, since identity was already attested by
/// the provider. Callers proceed to the normal credential-issuance path.
pub async fn exchange(
    pool: &PgPool,
    verifier: &dyn AssertionVerifier,
    provider: Provider,
    assertion: &str,
) -> Result<User, AuthError> {
    let claims = verifier.verify(provider, assertion).await?;

    if let Some(existing) = queries::find_user_by_email(pool, &claims.email).await? {
        return Ok(existing.user);
    }

    let username = claims
        .name
        .unwrap_or_else(|| claims.email.split('@').next().unwrap_or("user").to_string());
    let user = queries::create_user(pool, &username, &claims.email, None, true, None).await?;
    info!(email = %claims.email, "created user from social login");
    Ok(user)
}
