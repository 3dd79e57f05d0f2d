//! Email dispatch.
//!
//! The core only composes message content and tokens; delivery goes through
//! the [`EmailDispatcher`] trait. `HttpMailer` posts to an HTTP mail API,
//! `LogMailer` just logs (dev and tests).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::auth::AuthError;

/// Timeout for mail API round trips.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers transactional email.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    /// Send one message. Failure is surfaced as `ExternalService`, never
    /// swallowed.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AuthError>;
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Sends mail via an HTTP mail API (JSON POST with a bearer key).
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: String, from: String) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl EmailDispatcher for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AuthError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&MailRequest {
                from: &self.from,
                to,
                subject,
                text: body,
            })
            .send()
            .await
            .map_err(|e| AuthError::ExternalService(format!("mail send: {e}")))?;

        if !resp.status().is_success() {
            return Err(AuthError::ExternalService(format!(
                "mail API returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Logs messages instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl EmailDispatcher for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), AuthError> {
        info!(to, subject, "email dispatch (log only)");
        Ok(())
    }
}
