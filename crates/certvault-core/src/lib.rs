//! `CertVault` Core Library
//!
//! Shared functionality for `CertVault` components:
//! - Certificate record and the validity rules applied at verification time
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers and the shared database error
//! - Common error types

pub mod certificate;
pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use certificate::{Certificate, Validity, compute_validity};
pub use config::Config;
pub use error::{Error, Result};
