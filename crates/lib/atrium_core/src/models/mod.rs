//! Domain models shared across the credential core.

pub mod apps;
pub mod auth;
