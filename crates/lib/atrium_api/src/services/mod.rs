//! Service layer — orchestration between handlers and `atrium_core`.

pub mod auth;
pub mod cookies;
