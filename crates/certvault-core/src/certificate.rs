//! Certificate record and validity rules.
//!
//! Validity is a pure function of the stored record and the current time so
//! that any past verification can be recomputed from a snapshot alone.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// An issued certificate as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certificate {
    /// Opaque external identifier, assigned once at issuance.
    pub certificate_id: String,
    /// Human-facing secondary identifier.
    pub certificate_number: Option<String>,
    pub full_name: String,
    pub course_name: String,
    pub branch_name: Option<String>,
    pub grade: Option<String>,
    pub recipient_email: Option<String>,
    pub additional_info: Option<String>,
    pub issue_date: NaiveDate,
    pub pass_date: Option<NaiveDate>,
    /// `None` means the certificate never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// `false` once an administrator revokes the certificate.
    pub is_active: bool,
    /// Independent of `is_active`; `false` marks the certificate as invalid
    /// (e.g. flagged as fraudulent).
    pub validation_status: bool,
    pub photo_path: Option<String>,
    pub qr_code_ref: Option<String>,
    pub template_id: Option<i64>,
    pub created_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Outcome of evaluating a certificate at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    Valid,
    Revoked,
    Expired,
    Invalid,
}

impl Validity {
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for Validity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluate `certificate` at `now`.
///
/// Precedence, first match wins: revoked, invalid, expired, valid. Expiry is
/// strict: a certificate whose `expires_at` equals `now` is still valid.
/// `issue_date` plays no part.
pub fn compute_validity(certificate: &Certificate, now: DateTime<Utc>) -> Validity {
    if !certificate.is_active {
        return Validity::Revoked;
    }
    if !certificate.validation_status {
        return Validity::Invalid;
    }
    match certificate.expires_at {
        Some(expires_at) if expires_at < now => Validity::Expired,
        _ => Validity::Valid,
    }
}

/// Convert a date-only expiry into a timestamp: valid through the last
/// microsecond of that day, UTC.
pub fn expiry_from_date(date: NaiveDate) -> DateTime<Utc> {
    let end_of_day = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or_default();
    date.and_time(end_of_day).and_utc()
}
