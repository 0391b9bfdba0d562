use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use certvault_core::{Validity, compute_validity};

use super::AppState;
use super::error::ApiError;
use super::extract::Authenticated;
use crate::issuance::{BatchResult, BatchRow, NewCertificateRequest, SharedFields};
use crate::storage::{
    Certificate, CertificateFilter, CertificateUpdate, StatusFilter, VerificationEvent,
};

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 200;

/// `page` is 1-based.
#[derive(Debug, Default, Deserialize)]
pub struct Paging {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl Paging {
    pub fn limit_offset(&self) -> (u32, u32) {
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let page = self.page.unwrap_or(1).max(1);
        (per_page, (page - 1).saturating_mul(per_page))
    }
}

#[derive(Debug, Serialize)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PageOf<T> {
    fn new(items: Vec<T>, total: i64, paging: &Paging) -> Self {
        let (per_page, _) = paging.limit_offset();
        Self {
            items,
            total,
            page: paging.page.unwrap_or(1).max(1),
            per_page,
        }
    }
}

/// A stored certificate with its validity as of the response.
#[derive(Debug, Serialize)]
pub struct CertificateView {
    #[serde(flatten)]
    pub certificate: Certificate,
    pub validity: Validity,
}

impl From<Certificate> for CertificateView {
    fn from(certificate: Certificate) -> Self {
        let validity = compute_validity(&certificate, Utc::now());
        Self {
            certificate,
            validity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
    pub template_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// `GET /api/certificates`
pub async fn list(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageOf<CertificateView>>, ApiError> {
    let paging = Paging {
        page: query.page,
        per_page: query.per_page,
    };
    let (limit, offset) = paging.limit_offset();
    let filter = CertificateFilter {
        search: query.search.as_deref(),
        status: query.status,
        template_id: query.template_id,
        limit,
        offset,
    };
    let certificates = state.db.list_certificates(&filter).await?;
    let total = state.db.count_certificates(&filter).await?;
    let items = certificates.into_iter().map(CertificateView::from).collect();
    Ok(Json(PageOf::new(items, total, &paging)))
}

/// `POST /api/certificates`
pub async fn create(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(req): Json<NewCertificateRequest>,
) -> Result<(StatusCode, Json<CertificateView>), ApiError> {
    let certificate = state.issuer.issue_one(&req, Some(&auth.actor())).await?;
    Ok((StatusCode::CREATED, Json(certificate.into())))
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub rows: Vec<BatchRow>,
    #[serde(default)]
    pub shared: SharedFields,
}

/// `POST /api/certificates/bulk`
pub async fn bulk(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(req): Json<BulkRequest>,
) -> Result<Json<BatchResult>, ApiError> {
    let result = state
        .issuer
        .issue_batch(&req.rows, &req.shared, Some(&auth.actor()))
        .await?;
    Ok(Json(result))
}

/// `GET /api/certificates/{certificate_id}`
pub async fn get_one(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateView>, ApiError> {
    let certificate = state.db.get_certificate(&certificate_id).await?;
    Ok(Json(certificate.into()))
}

/// `PUT /api/certificates/{certificate_id}`
pub async fn update(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(certificate_id): Path<String>,
    Json(update): Json<CertificateUpdate>,
) -> Result<Json<CertificateView>, ApiError> {
    if update.full_name.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(ApiError::BadRequest("Full name is required".to_string()));
    }
    if update.course_name.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(ApiError::BadRequest("Course name is required".to_string()));
    }
    if let Some(Some(template_id)) = update.template_id {
        state.issuer.ensure_template(template_id).await?;
    }

    let certificate = state.db.update_certificate(&certificate_id, &update).await?;
    info!(certificate_id = %certificate_id, actor = %auth.actor(), "Certificate updated");
    Ok(Json(certificate.into()))
}

/// `DELETE /api/certificates/{certificate_id}`
pub async fn delete(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(certificate_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_certificate(&certificate_id).await? {
        return Err(ApiError::NotFound(format!(
            "Certificate {certificate_id} not found"
        )));
    }
    info!(certificate_id = %certificate_id, actor = %auth.actor(), "Certificate deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_active(
    state: &AppState,
    auth: &Authenticated,
    certificate_id: &str,
    is_active: bool,
) -> Result<Json<CertificateView>, ApiError> {
    if !state.db.set_certificate_active(certificate_id, is_active).await? {
        return Err(ApiError::NotFound(format!(
            "Certificate {certificate_id} not found"
        )));
    }
    info!(certificate_id, is_active, actor = %auth.actor(), "Certificate status changed");
    Ok(Json(state.db.get_certificate(certificate_id).await?.into()))
}

/// `POST /api/certificates/{certificate_id}/revoke`
pub async fn revoke(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateView>, ApiError> {
    set_active(&state, &auth, &certificate_id, false).await
}

/// `POST /api/certificates/{certificate_id}/reinstate`
pub async fn reinstate(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateView>, ApiError> {
    set_active(&state, &auth, &certificate_id, true).await
}

#[derive(Debug, Deserialize)]
pub struct ValidationRequest {
    pub validation_status: bool,
}

/// `PUT /api/certificates/{certificate_id}/validation`
pub async fn set_validation(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(certificate_id): Path<String>,
    Json(req): Json<ValidationRequest>,
) -> Result<Json<CertificateView>, ApiError> {
    if !state
        .db
        .set_validation_status(&certificate_id, req.validation_status)
        .await?
    {
        return Err(ApiError::NotFound(format!(
            "Certificate {certificate_id} not found"
        )));
    }
    info!(
        certificate_id = %certificate_id,
        validation_status = req.validation_status,
        actor = %auth.actor(),
        "Certificate validation status changed"
    );
    Ok(Json(state.db.get_certificate(&certificate_id).await?.into()))
}

/// `GET /api/certificates/{certificate_id}/verifications`
///
/// History survives deletion of the certificate itself.
pub async fn verifications(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(certificate_id): Path<String>,
    Query(paging): Query<Paging>,
) -> Result<Json<PageOf<VerificationEvent>>, ApiError> {
    let (limit, offset) = paging.limit_offset();
    let events = state
        .db
        .list_verification_events(&certificate_id, limit, offset)
        .await?;
    let total = state.db.count_verification_events(&certificate_id).await?;
    Ok(Json(PageOf::new(events, total, &paging)))
}
