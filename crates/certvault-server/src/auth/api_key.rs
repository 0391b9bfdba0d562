//! API key generation and hashing.
//!
//! Raw keys are shown to the creator once; only the SHA-256 hash and a short
//! display prefix are stored.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Prefix identifying `CertVault` keys in logs and config files.
pub const KEY_PREFIX: &str = "cvk_";

/// Length of the stored display prefix: `cvk_` plus 8 hex characters.
pub const DISPLAY_PREFIX_LEN: usize = KEY_PREFIX.len() + 8;

/// A freshly generated key.
pub struct GeneratedKey {
    /// Full key, returned to the caller exactly once.
    pub raw: String,
    pub display_prefix: String,
    pub hash: String,
}

/// Generate a new random API key (256 bits of entropy).
pub fn generate() -> GeneratedKey {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let raw = format!("{KEY_PREFIX}{}", to_hex(&bytes));
    let display_prefix = raw.chars().take(DISPLAY_PREFIX_LEN).collect();
    let hash = hash_key(&raw);
    GeneratedKey {
        raw,
        display_prefix,
        hash,
    }
}

/// Hash a key for storage and lookup.
pub fn hash_key(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
