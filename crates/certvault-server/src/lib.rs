//! `CertVault` Server Library
//!
//! Core functionality for the `CertVault` server:
//! - `SQLite` storage for certificates, templates, verification events,
//!   admin users and API keys
//! - Public certificate verification with an append-only audit log
//! - Single and bulk certificate issuance
//! - JWT/API-key authentication and password hashing
//! - JSON HTTP API

pub mod admin;
pub mod auth;
pub mod http;
pub mod issuance;
pub mod storage;
pub mod verification;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod test_helpers;
