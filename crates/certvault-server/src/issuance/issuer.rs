//! The certificate issuer shared by the single and bulk paths.

use std::sync::Arc;

use chrono::NaiveDate;

use certvault_core::Config;

use super::id::{IdGenerator, UuidGenerator, certificate_number};
use crate::storage::{CertificateGateway, DatabaseError, NewCertificate};

#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// Input rejected before anything was written. The message is safe to
    /// show to the user.
    #[error("{0}")]
    Validation(String),

    /// The gateway failed; nothing from this call was persisted.
    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

/// Holder details shared by both issuance paths once input is validated.
pub(super) struct Holder<'a> {
    pub full_name: &'a str,
    pub course_name: &'a str,
    pub issue_date: NaiveDate,
}

/// Issues certificates through a gateway.
pub struct CertificateIssuer<G, I = UuidGenerator> {
    pub(super) gateway: G,
    pub(super) ids: I,
    pub(super) config: Arc<Config>,
}

impl<G: CertificateGateway> CertificateIssuer<G, UuidGenerator> {
    pub const fn new(gateway: G, config: Arc<Config>) -> Self {
        Self {
            gateway,
            ids: UuidGenerator,
            config,
        }
    }
}

impl<G: CertificateGateway, I: IdGenerator> CertificateIssuer<G, I> {
    pub const fn with_id_generator(gateway: G, ids: I, config: Arc<Config>) -> Self {
        Self {
            gateway,
            ids,
            config,
        }
    }

    /// A referenced template must exist and be active.
    pub async fn ensure_template(&self, template_id: i64) -> Result<(), IssuanceError> {
        match self.gateway.find_template(template_id).await? {
            Some(template) if template.is_active => Ok(()),
            Some(_) => Err(IssuanceError::Validation(format!(
                "Template {template_id} is not active"
            ))),
            None => Err(IssuanceError::Validation(format!(
                "Template {template_id} does not exist"
            ))),
        }
    }

    /// Mint a fresh ID and fill the derived fields.
    pub(super) fn new_record(
        &self,
        holder: &Holder<'_>,
        certificate_number_override: Option<&str>,
        created_by: Option<&str>,
    ) -> NewCertificate {
        let certificate_id = self.ids.next_id();
        let number = certificate_number_override.map_or_else(
            || {
                certificate_number(
                    &self.config.issuance.certificate_number_prefix,
                    holder.issue_date,
                    &certificate_id,
                )
            },
            str::to_string,
        );
        NewCertificate {
            qr_code_ref: Some(self.config.verification_url(&certificate_id)),
            certificate_number: Some(number),
            full_name: holder.full_name.to_string(),
            course_name: holder.course_name.to_string(),
            branch_name: None,
            grade: None,
            recipient_email: None,
            additional_info: None,
            issue_date: holder.issue_date,
            pass_date: None,
            expires_at: None,
            photo_path: None,
            template_id: None,
            created_by: created_by.map(str::to_string),
            certificate_id,
        }
    }
}

/// Parse a date cell. Accepts `YYYY-MM-DD` and `YYYY/MM/DD`.
pub(super) fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .ok()
}

/// Trimmed, with empty strings folded to `None`.
pub(super) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
