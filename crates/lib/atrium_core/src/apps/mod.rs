//! Apps and their API keys.
//!
//! Every operation here is owner-scoped: queries filter on the owner chain
//! (`api_keys -> apps -> users`) in SQL, and a miss — whether the resource
//! does not exist or belongs to someone else — reports the same `NotFound`.

pub mod api_keys;
pub mod queries;

use thiserror::Error;

/// App and API-key errors.
#[derive(Debug, Error)]
pub enum AppsError {
    /// Absent, or owned by someone else — deliberately indistinguishable.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}
