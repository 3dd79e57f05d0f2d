//! Role-based authorization guard.
//!
//! Roles are a closed enum, parsed (and rejected) at the data boundary
//! rather than compared as loose strings at each call site.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

/// Closed set of user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(AuthError::Internal(format!("unrecognized role '{other}'"))),
        }
    }
}

/// Require that `role` is one of `allowed`, failing with `Forbidden`
/// otherwise. Applied before every privileged operation.
pub fn require_role(role: Role, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden("Insufficient role".into()))
    }
}
