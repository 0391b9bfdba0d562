//! Configuration resolution for `CertVault`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/certvault/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (applied by the binary, highest priority)
//!
//! The resolved `Config` is built once at startup and never mutated after.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Placeholder JWT secret; the server warns loudly when it is still in use.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Complete `CertVault` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub issuance: IssuanceConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Base URL used to build public verification links (and QR payloads).
    pub public_base_url: String,
    pub database_path: Option<PathBuf>,
    /// Peers whose `X-Forwarded-For`/`X-Real-IP` headers are believed.
    /// Requests from any other peer are recorded with the socket address.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            database_path: None,
            trusted_proxies: Vec::new(),
        }
    }
}

/// Admin authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_ttl_secs: 8 * 60 * 60, // one working day
        }
    }
}

/// Certificate issuance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuanceConfig {
    pub certificate_number_prefix: String,
    pub max_batch_rows: usize,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            certificate_number_prefix: "CERT".to_string(),
            max_batch_rows: 10_000,
        }
    }
}

/// Dashboard/analytics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Certificates expiring within this many days count as "expiring soon".
    pub expiring_soon_days: i64,
    /// Default number of days in the verification trend series.
    pub trend_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            expiring_soon_days: 30,
            trend_days: 30,
        }
    }
}

impl Config {
    /// Public verification link for a certificate.
    pub fn verification_url(&self, certificate_id: &str) -> String {
        format!(
            "{}/verify/{certificate_id}",
            self.server.public_base_url.trim_end_matches('/')
        )
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        let explicit = load_config_file(path)?;
        merge_config(&mut config, explicit);
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("certvault").join("settings.json"))
}

/// Default location of the `SQLite` database.
pub fn default_database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("certvault").join("certvault.db"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    if overlay.server.database_path.is_some() {
        base.server.database_path = overlay.server.database_path;
    }
    base.server.listen_addr = overlay.server.listen_addr;
    base.server.public_base_url = overlay.server.public_base_url;
    base.server.trusted_proxies = overlay.server.trusted_proxies;

    base.auth = overlay.auth;
    base.issuance = overlay.issuance;
    base.analytics = overlay.analytics;
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("CERTVAULT_LISTEN_ADDR") {
        config.server.listen_addr = val;
    }
    if let Some(val) = var("CERTVAULT_PUBLIC_URL") {
        config.server.public_base_url = val;
    }
    if let Some(val) = var("CERTVAULT_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = var("CERTVAULT_TRUSTED_PROXIES") {
        config.server.trusted_proxies = val
            .split(',')
            .filter_map(|ip| ip.trim().parse().ok())
            .collect();
    }
    if let Some(val) = var("CERTVAULT_JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Some(n) = var("CERTVAULT_ACCESS_TTL").and_then(|v| v.parse().ok()) {
        config.auth.access_token_ttl_secs = n;
    }
    if let Some(n) = var("CERTVAULT_MAX_BATCH_ROWS").and_then(|v| v.parse().ok()) {
        config.issuance.max_batch_rows = n;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.issuance.certificate_number_prefix, "CERT");
        assert_eq!(config.analytics.expiring_soon_days, 30);
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn verification_url_strips_trailing_slash() {
        let mut config = Config::default();
        config.server.public_base_url = "https://certs.example.org/".to_string();
        assert_eq!(
            config.verification_url("abc"),
            "https://certs.example.org/verify/abc"
        );
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"issuance": {"certificate_number_prefix": "ACME"}}"#).unwrap();

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded.issuance.certificate_number_prefix, "ACME");
        assert_eq!(loaded.issuance.max_batch_rows, 10_000);
        assert_eq!(loaded.server.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_config_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = load_config(Some(&dir.path().join("absent.json")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| match key {
            "CERTVAULT_JWT_SECRET" => Some("s3cret".to_string()),
            "CERTVAULT_MAX_BATCH_ROWS" => Some("250".to_string()),
            "CERTVAULT_ACCESS_TTL" => Some("not-a-number".to_string()),
            "CERTVAULT_TRUSTED_PROXIES" => Some("10.0.0.1, bogus,::1".to_string()),
            _ => None,
        });

        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.issuance.max_batch_rows, 250);
        assert_eq!(config.auth.access_token_ttl_secs, 8 * 60 * 60);
        assert_eq!(
            config.server.trusted_proxies,
            vec![
                "10.0.0.1".parse::<IpAddr>().unwrap(),
                "::1".parse::<IpAddr>().unwrap()
            ]
        );
    }

    #[test]
    fn no_proxy_is_trusted_by_default() {
        assert!(Config::default().server.trusted_proxies.is_empty());
    }
}
