//! Request extractors: caller identity and client metadata.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use tracing::debug;

use super::AppState;
use super::error::ApiError;
use crate::auth::Claims;
use crate::storage::ApiKey;
use crate::verification::RequestContext;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Who is making an authenticated request.
#[derive(Debug, Clone)]
pub enum Principal {
    User(Claims),
    ApiKey(ApiKey),
}

/// Any authenticated caller: a logged-in user or an API key.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl Authenticated {
    /// Recorded as `created_by` on issued certificates.
    pub fn actor(&self) -> String {
        match &self.0 {
            Principal::User(claims) => claims.sub.clone(),
            Principal::ApiKey(key) => format!("api-key:{}", key.id),
        }
    }
}

/// A logged-in user with the admin role. API keys never qualify.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub Claims);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        if let Some(token) = bearer_token(&parts.headers) {
            let claims = state
                .jwt
                .validate(token)
                .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;
            return Ok(Self(Principal::User(claims)));
        }

        if let Some(raw_key) = parts.headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
            let key = state
                .admin
                .authenticate_api_key(raw_key)
                .await?
                .ok_or_else(|| ApiError::Unauthorized("Invalid API key".to_string()))?;
            debug!(key_id = %key.id, "Authenticated with API key");
            return Ok(Self(Principal::ApiKey(key)));
        }

        Err(ApiError::Unauthorized(
            "Missing authorization header".to_string(),
        ))
    }
}

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        match Authenticated::from_request_parts(parts, state).await?.0 {
            Principal::User(claims) if claims.is_admin() => Ok(Self(claims)),
            _ => Err(ApiError::Forbidden("Admin role required".to_string())),
        }
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn peer_ip(parts: &Parts) -> Option<IpAddr> {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Client IP. Forwarding headers (first `X-Forwarded-For` hop, then
/// `X-Real-IP`) only count when the peer is a trusted proxy; otherwise the
/// peer address is recorded.
fn client_ip(parts: &Parts, trusted_proxies: &[IpAddr]) -> Option<String> {
    let peer = peer_ip(parts);
    let forwarded = peer
        .filter(|ip| trusted_proxies.contains(ip))
        .and_then(|_| {
            header_value(parts, "x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .or_else(|| header_value(parts, "x-real-ip"))
        });
    forwarded
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
}

/// Verification request metadata.
pub struct ClientContext(pub RequestContext);

impl FromRequestParts<AppState> for ClientContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_agent = header_value(parts, "user-agent").map(str::to_string);
        Ok(Self(RequestContext {
            ip_address: client_ip(parts, &state.config.server.trusted_proxies),
            user_agent,
        }))
    }
}
