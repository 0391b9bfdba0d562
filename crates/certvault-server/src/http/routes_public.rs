use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use certvault_core::Validity;

use super::AppState;
use super::error::ApiError;
use super::extract::ClientContext;
use crate::admin::LoginResponse;
use crate::storage::{Certificate, Template};
use crate::verification::VerificationResult;

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Holder details safe to show to an anonymous verifier.
#[derive(Debug, Serialize)]
pub struct PublicCertificate {
    pub certificate_id: String,
    pub certificate_number: Option<String>,
    pub full_name: String,
    pub course_name: String,
    pub branch_name: Option<String>,
    pub grade: Option<String>,
    pub issue_date: NaiveDate,
    pub pass_date: Option<NaiveDate>,
    pub expires_at: Option<DateTime<Utc>>,
    pub photo_path: Option<String>,
}

impl From<Certificate> for PublicCertificate {
    fn from(c: Certificate) -> Self {
        Self {
            certificate_id: c.certificate_id,
            certificate_number: c.certificate_number,
            full_name: c.full_name,
            course_name: c.course_name,
            branch_name: c.branch_name,
            grade: c.grade,
            issue_date: c.issue_date,
            pass_date: c.pass_date,
            expires_at: c.expires_at,
            photo_path: c.photo_path,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicTemplate {
    pub id: i64,
    pub name: String,
    pub layout: String,
}

impl From<Template> for PublicTemplate {
    fn from(t: Template) -> Self {
        Self {
            id: t.id,
            name: t.name,
            layout: t.layout,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicVerification {
    pub certificate_id: String,
    pub found: bool,
    pub validity: Option<Validity>,
    pub successful: bool,
    pub verified_at: DateTime<Utc>,
    pub certificate: Option<PublicCertificate>,
    pub template: Option<PublicTemplate>,
}

impl From<VerificationResult> for PublicVerification {
    fn from(r: VerificationResult) -> Self {
        Self {
            certificate_id: r.certificate_id,
            found: r.found,
            validity: r.validity,
            successful: r.successful,
            verified_at: r.verified_at,
            certificate: r.certificate.map(Into::into),
            template: r.template.map(Into::into),
        }
    }
}

/// `GET /api/verify/{certificate_id}`
///
/// Unknown IDs answer 404 with the same body shape, `found: false`.
pub async fn verify(
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
    ClientContext(ctx): ClientContext,
) -> Result<Response, ApiError> {
    let result = state.engine.verify(&certificate_id, &ctx).await?;
    let status = if result.found {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(PublicVerification::from(result))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = state.admin.login(&req.username, &req.password).await?;
    Ok(Json(response))
}
