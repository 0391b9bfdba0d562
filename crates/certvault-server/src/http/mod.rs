//! JSON HTTP API.
//!
//! Public routes: `/health` and `/api/verify/{id}`. Everything under
//! `/api` besides login requires a JWT bearer token or an `X-Api-Key`.

mod error;
mod extract;
mod routes_admin;
mod routes_certificates;
mod routes_public;
mod routes_templates;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use certvault_core::Config;

use crate::admin::AdminService;
use crate::auth::JwtManager;
use crate::issuance::CertificateIssuer;
use crate::storage::ServerDatabase;
use crate::verification::VerificationEngine;
use crate::verification::geo::ConfiguredGeoLocator;

pub use error::ApiError;
pub use extract::{AdminOnly, Authenticated, Principal};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: ServerDatabase,
    pub jwt: Arc<JwtManager>,
    pub admin: AdminService,
    pub engine: Arc<VerificationEngine<ServerDatabase, ConfiguredGeoLocator>>,
    pub issuer: Arc<CertificateIssuer<ServerDatabase>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, db: ServerDatabase, geo: ConfiguredGeoLocator) -> Self {
        let jwt = Arc::new(JwtManager::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.access_token_ttl_secs,
        ));
        Self {
            admin: AdminService::new(db.clone(), Arc::clone(&jwt)),
            engine: Arc::new(VerificationEngine::with_geo_locator(db.clone(), geo)),
            issuer: Arc::new(CertificateIssuer::new(db.clone(), Arc::clone(&config))),
            config,
            db,
            jwt,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/verify/{certificate_id}", get(routes_public::verify))
        .route("/auth/login", post(routes_public::login))
        .route(
            "/certificates",
            get(routes_certificates::list).post(routes_certificates::create),
        )
        .route("/certificates/bulk", post(routes_certificates::bulk))
        .route(
            "/certificates/{certificate_id}",
            get(routes_certificates::get_one)
                .put(routes_certificates::update)
                .delete(routes_certificates::delete),
        )
        .route(
            "/certificates/{certificate_id}/revoke",
            post(routes_certificates::revoke),
        )
        .route(
            "/certificates/{certificate_id}/reinstate",
            post(routes_certificates::reinstate),
        )
        .route(
            "/certificates/{certificate_id}/validation",
            put(routes_certificates::set_validation),
        )
        .route(
            "/certificates/{certificate_id}/verifications",
            get(routes_certificates::verifications),
        )
        .route(
            "/templates",
            get(routes_templates::list).post(routes_templates::create),
        )
        .route(
            "/templates/{template_id}",
            get(routes_templates::get_one)
                .put(routes_templates::update)
                .delete(routes_templates::delete),
        )
        .route(
            "/keys",
            get(routes_admin::list_keys).post(routes_admin::create_key),
        )
        .route("/keys/{key_id}", axum::routing::delete(routes_admin::revoke_key))
        .route("/analytics/summary", get(routes_admin::summary))
        .route("/analytics/verifications", get(routes_admin::verification_trend));

    Router::new()
        .route("/health", get(routes_public::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
