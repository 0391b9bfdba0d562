use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use super::extract::{AdminOnly, Authenticated};
use crate::admin::CreatedApiKey;
use crate::storage::{ApiKey, DailyVerifications, DashboardSummary, VerificationEvent};

const TOP_COURSES: u32 = 10;
const RECENT_EVENTS: u32 = 20;
const MAX_TREND_DAYS: u32 = 365;

// =========================================================================
// API keys (admin role only)
// =========================================================================

/// `GET /api/keys`
pub async fn list_keys(
    State(state): State<AppState>,
    _admin: AdminOnly,
) -> Result<Json<Vec<ApiKey>>, ApiError> {
    Ok(Json(state.db.list_api_keys().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
}

/// `POST /api/keys`
pub async fn create_key(
    State(state): State<AppState>,
    AdminOnly(claims): AdminOnly,
    Json(req): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<CreatedApiKey>), ApiError> {
    let created = state.admin.create_api_key(&req.name, Some(&claims.sub)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `DELETE /api/keys/{key_id}`
pub async fn revoke_key(
    State(state): State<AppState>,
    _admin: AdminOnly,
    Path(key_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.admin.revoke_api_key(&key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Analytics
// =========================================================================

#[derive(Debug, Serialize)]
pub struct CourseCount {
    pub course_name: String,
    pub issued: i64,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: DashboardSummary,
    pub expiring_soon_days: i64,
    pub top_courses: Vec<CourseCount>,
}

/// `GET /api/analytics/summary`
pub async fn summary(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<SummaryResponse>, ApiError> {
    let days = state.config.analytics.expiring_soon_days;
    let summary = state
        .db
        .dashboard_summary(Utc::now(), Duration::days(days))
        .await?;
    let top_courses = state
        .db
        .certificates_per_course(TOP_COURSES)
        .await?
        .into_iter()
        .map(|(course_name, issued)| CourseCount {
            course_name,
            issued,
        })
        .collect();

    Ok(Json(SummaryResponse {
        summary,
        expiring_soon_days: days,
        top_courses,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub days: Option<u32>,
    /// Restrict the recent-events list to successful or failed attempts.
    pub successful: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub since: DateTime<Utc>,
    pub days: Vec<DailyVerifications>,
    pub recent: Vec<VerificationEvent>,
}

/// `GET /api/analytics/verifications`
pub async fn verification_trend(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, ApiError> {
    let days = query
        .days
        .unwrap_or(state.config.analytics.trend_days)
        .clamp(1, MAX_TREND_DAYS);
    let since = Utc::now() - Duration::days(i64::from(days));

    let trend = state.db.daily_verifications(since).await?;
    let recent = state
        .db
        .list_recent_verification_events(query.successful, RECENT_EVENTS, 0)
        .await?;

    Ok(Json(TrendResponse {
        since,
        days: trend,
        recent,
    }))
}
