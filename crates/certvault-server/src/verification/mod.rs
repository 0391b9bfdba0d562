//! Public certificate verification.
//!
//! - [`VerificationEngine`] computes current validity and appends one audit
//!   event per attempt
//! - [`device`] derives device metadata from the User-Agent
//! - [`geo`] provides best-effort IP geolocation

pub mod device;
mod engine;
pub mod geo;


pub use engine::{RequestContext, VerificationEngine, VerificationResult, VerifyError};
