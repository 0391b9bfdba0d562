//! `SQLite` storage for the `CertVault` server.
//!
//! Provides persistence for certificates, templates, verification events,
//! admin users and API keys, plus the gateway traits the verification and
//! issuance services are written against.

mod db;
mod gateway;
mod models;
mod queries_analytics;
mod queries_certificates;
mod queries_events;
mod queries_keys;
mod queries_templates;
mod queries_users;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests;

pub use certvault_core::db::DatabaseError;
pub use db::ServerDatabase;
pub use gateway::{CertificateGateway, IssuanceTransaction, SqliteIssuanceTransaction};
pub use models::*;
