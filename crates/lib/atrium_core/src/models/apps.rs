//! App and API-key domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sub-application registered by a user. Owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// API key record as stored (hash only, never the plaintext secret).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: String,
    pub app_id: String,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// One entry of the append-only audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub action: String,
    pub user_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
