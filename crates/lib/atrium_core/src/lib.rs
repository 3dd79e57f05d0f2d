//! # atrium_core
//!
//! Credential core domain logic for Atrium: password hashing, access/refresh
//! credential issuance, role and ownership authorization, app-scoped API
//! keys, social identity exchange, and the audit log.

pub mod apps;
pub mod audit;
pub mod auth;
pub mod authz;
pub mod db;
pub mod email;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
