//! Opaque token generation and at-rest hashing.
//!
//! Refresh tokens and API-key secrets are high-entropy random strings with
//! no relationship to user data. Only their SHA-256 hash ever touches the
//! database; the plaintext exists in the response that delivers it and
//! nowhere else.

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};

/// Refresh token lifetime: 30 days.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

/// Generate a cryptographically random opaque token (64 alphanumeric chars).
pub fn generate_opaque_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// SHA-256 hash an opaque token for storage.
pub fn hash_opaque_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
