//! Best-effort geolocation of verification requests.
//!
//! Geo data is auxiliary metadata on a verification event. A lookup failure
//! never prevents the event from being recorded.

use std::future::Future;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl GeoInfo {
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Geo lookup request failed: {0}")]
    Request(String),

    #[error("Geo lookup returned an unusable response: {0}")]
    Response(String),
}

/// Resolves an IP address to a coarse location.
pub trait GeoLocator: Send + Sync {
    /// `Ok(None)` when the address cannot be located (private ranges,
    /// lookups disabled).
    fn locate(&self, ip: &str) -> impl Future<Output = Result<Option<GeoInfo>, GeoError>> + Send;
}

/// Geolocation switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoLocator;

impl GeoLocator for NoGeoLocator {
    async fn locate(&self, _ip: &str) -> Result<Option<GeoInfo>, GeoError> {
        Ok(None)
    }
}

/// Whether `ip` is a routable public address worth looking up.
pub fn is_public_ip(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation())
        }
        Ok(IpAddr::V6(v6)) => {
            let unique_local = (v6.segments()[0] & 0xfe00) == 0xfc00;
            let link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
        Err(_) => false,
    }
}

/// Geo lookups against an ip-api.com compatible JSON endpoint.
#[cfg(feature = "geoip")]
#[derive(Debug, Clone)]
pub struct HttpGeoLocator {
    http: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "geoip")]
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    country: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    city: Option<String>,
}

#[cfg(feature = "geoip")]
impl HttpGeoLocator {
    /// `endpoint` is the base URL; the IP is appended as a path segment.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, GeoError> {
        // reqwest is built with rustls-no-provider; Err means already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .map_err(|e| GeoError::Request(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[cfg(feature = "geoip")]
impl GeoLocator for HttpGeoLocator {
    async fn locate(&self, ip: &str) -> Result<Option<GeoInfo>, GeoError> {
        if !is_public_ip(ip) {
            return Ok(None);
        }
        let url = format!(
            "{}/{ip}?fields=status,country,regionName,city",
            self.endpoint.trim_end_matches('/')
        );
        let response: IpApiResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GeoError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| GeoError::Response(e.to_string()))?;

        if response.status != "success" {
            return Ok(None);
        }
        Ok(Some(GeoInfo {
            country: response.country,
            region: response.region_name,
            city: response.city,
        }))
    }
}

/// The locator selected at startup.
#[derive(Debug, Clone, Default)]
pub enum ConfiguredGeoLocator {
    #[default]
    Disabled,
    #[cfg(feature = "geoip")]
    Http(HttpGeoLocator),
}

impl GeoLocator for ConfiguredGeoLocator {
    async fn locate(&self, ip: &str) -> Result<Option<GeoInfo>, GeoError> {
        match self {
            Self::Disabled => NoGeoLocator.locate(ip).await,
            #[cfg(feature = "geoip")]
            Self::Http(locator) => locator.locate(ip).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn private_and_loopback_addresses_are_not_public() {
        assert!(!is_public_ip("127.0.0.1"));
        assert!(!is_public_ip("10.1.2.3"));
        assert!(!is_public_ip("192.168.0.10"));
        assert!(!is_public_ip("::1"));
        assert!(!is_public_ip("fd12:3456::1"));
        assert!(!is_public_ip("fe80::1"));
        assert!(!is_public_ip("not an ip"));
    }

    #[test]
    fn public_addresses_are_public() {
        assert!(is_public_ip("8.8.8.8"));
        assert!(is_public_ip("2606:4700:4700::1111"));
    }

    #[tokio::test]
    async fn disabled_locator_returns_nothing() {
        let geo = ConfiguredGeoLocator::default();
        assert!(geo.locate("8.8.8.8").await.unwrap().is_none());
    }
}
