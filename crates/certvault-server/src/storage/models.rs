//! Data models for `CertVault` storage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use certvault_core::Certificate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminUser {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AdminUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Layout definition, opaque JSON text.
    pub layout: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationEvent {
    pub id: i64,
    pub certificate_id: String,
    pub verified_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_info: Option<String>,
    pub geo_info: Option<String>,
    pub successful: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    pub key_prefix: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub created_by: Option<String>,
    pub created_at: i64,
    pub last_used_at: Option<i64>,
    pub revoked: bool,
}

/// A fully validated certificate ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    pub certificate_id: String,
    pub certificate_number: Option<String>,
    pub full_name: String,
    pub course_name: String,
    pub branch_name: Option<String>,
    pub grade: Option<String>,
    pub recipient_email: Option<String>,
    pub additional_info: Option<String>,
    pub issue_date: NaiveDate,
    pub pass_date: Option<NaiveDate>,
    pub expires_at: Option<DateTime<Utc>>,
    pub photo_path: Option<String>,
    pub qr_code_ref: Option<String>,
    pub template_id: Option<i64>,
    pub created_by: Option<String>,
}

/// A verification attempt to append to the log.
#[derive(Debug, Clone)]
pub struct NewVerificationEvent<'a> {
    pub certificate_id: &'a str,
    pub verified_at: DateTime<Utc>,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub device_info: Option<&'a str>,
    pub geo_info: Option<&'a str>,
    pub successful: bool,
}

/// Editable holder/temporal fields of a certificate. `None` leaves a field
/// unchanged; `Some(None)` on a nullable field clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateUpdate {
    pub full_name: Option<String>,
    pub course_name: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub branch_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub grade: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub recipient_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub additional_info: Option<Option<String>>,
    pub issue_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub pass_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub photo_path: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub template_id: Option<Option<i64>>,
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Status filter for certificate listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Revoked,
    Invalid,
}

/// Certificate listing query.
#[derive(Debug, Clone, Default)]
pub struct CertificateFilter<'a> {
    /// Matched against full name, course name, certificate ID and number.
    pub search: Option<&'a str>,
    pub status: StatusFilter,
    pub template_id: Option<i64>,
    pub limit: u32,
    pub offset: u32,
}

/// Fields for creating or replacing a template.
#[derive(Debug, Clone)]
pub struct TemplateParams<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub layout: &'a str,
    pub is_active: bool,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_certificates: i64,
    pub active_certificates: i64,
    pub revoked_certificates: i64,
    pub invalid_certificates: i64,
    pub expired_certificates: i64,
    pub expiring_soon: i64,
    pub total_templates: i64,
    pub total_verifications: i64,
    pub successful_verifications: i64,
    pub failed_verifications: i64,
}

/// Verification counts for one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyVerifications {
    /// `YYYY-MM-DD`
    pub day: String,
    pub total: i64,
    pub successful: i64,
}
