//! Authentication for the `CertVault` admin API.
//!
//! Provides JWT access tokens, argon2 password hashing and API keys.

pub mod api_key;
pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::Claims;
pub use jwt::JwtManager;
