//! Request handlers, grouped by route family.

pub mod admin;
pub mod api_keys;
pub mod apps;
pub mod auth;
