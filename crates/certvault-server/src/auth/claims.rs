//! JWT claims structure for admin sessions.

use serde::{Deserialize, Serialize};

use crate::storage::ROLE_ADMIN;

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (admin user ID).
    pub sub: String,
    pub username: String,
    /// `admin` or `staff`.
    pub role: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}
