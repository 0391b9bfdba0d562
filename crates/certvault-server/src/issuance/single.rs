use serde::Deserialize;
use tracing::{info, instrument, warn};

use certvault_core::certificate::expiry_from_date;

use super::id::IdGenerator;
use super::issuer::{CertificateIssuer, Holder, IssuanceError, non_empty, parse_date};
use crate::storage::{Certificate, CertificateGateway, DatabaseError, IssuanceTransaction};

/// A single certificate as submitted by an administrator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewCertificateRequest {
    pub full_name: String,
    pub course_name: String,
    pub issue_date: String,
    /// Generated from the issue date and ID when absent.
    pub certificate_number: Option<String>,
    pub branch_name: Option<String>,
    pub grade: Option<String>,
    pub recipient_email: Option<String>,
    pub additional_info: Option<String>,
    pub pass_date: Option<String>,
    pub expiry_date: Option<String>,
    pub photo_path: Option<String>,
    pub template_id: Option<i64>,
}

fn invalid(message: &str) -> IssuanceError {
    IssuanceError::Validation(message.to_string())
}

fn optional_date(
    value: Option<&str>,
    message: &str,
) -> Result<Option<chrono::NaiveDate>, IssuanceError> {
    non_empty(value)
        .map(|v| parse_date(v).ok_or_else(|| invalid(message)))
        .transpose()
}

impl<G: CertificateGateway, I: IdGenerator> CertificateIssuer<G, I> {
    /// Validate and persist one certificate in its own transaction.
    #[instrument(skip_all, fields(created_by = created_by.unwrap_or("-")))]
    pub async fn issue_one(
        &self,
        request: &NewCertificateRequest,
        created_by: Option<&str>,
    ) -> Result<Certificate, IssuanceError> {
        let full_name = non_empty(Some(request.full_name.as_str()))
            .ok_or_else(|| invalid("Full name is required"))?;
        let course_name = non_empty(Some(request.course_name.as_str()))
            .ok_or_else(|| invalid("Course name is required"))?;
        let issue_date = non_empty(Some(request.issue_date.as_str()))
            .ok_or_else(|| invalid("Issue date is required"))?;
        let issue_date = parse_date(issue_date)
            .ok_or_else(|| invalid("Issue date must be a valid date (YYYY-MM-DD)"))?;
        let pass_date = optional_date(
            request.pass_date.as_deref(),
            "Pass date must be a valid date (YYYY-MM-DD)",
        )?;
        let expiry_date = optional_date(
            request.expiry_date.as_deref(),
            "Expiry date must be a valid date (YYYY-MM-DD)",
        )?;

        if let Some(template_id) = request.template_id {
            self.ensure_template(template_id).await?;
        }

        let holder = Holder {
            full_name,
            course_name,
            issue_date,
        };
        let number = non_empty(request.certificate_number.as_deref());
        let mut record = self.new_record(&holder, number, created_by);
        record.branch_name = non_empty(request.branch_name.as_deref()).map(str::to_string);
        record.grade = non_empty(request.grade.as_deref()).map(str::to_string);
        record.recipient_email = non_empty(request.recipient_email.as_deref()).map(str::to_string);
        record.additional_info = non_empty(request.additional_info.as_deref()).map(str::to_string);
        record.photo_path = non_empty(request.photo_path.as_deref()).map(str::to_string);
        record.pass_date = pass_date;
        record.expires_at = expiry_date.map(expiry_from_date);
        record.template_id = request.template_id;

        let mut tx = self.gateway.begin_transaction().await?;
        if let Err(e) = tx.insert_certificate(&record).await {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback after failed insert failed");
            }
            return Err(match e {
                // The template was deleted after it was checked.
                DatabaseError::Constraint(msg) if msg.contains("FOREIGN KEY") => {
                    IssuanceError::Validation(format!(
                        "Template {} does not exist",
                        request.template_id.unwrap_or_default()
                    ))
                }
                DatabaseError::Constraint(_) if number.is_some() => {
                    invalid("A certificate with this number already exists")
                }
                DatabaseError::Constraint(_) => {
                    invalid("Certificate conflicts with an existing certificate, try again")
                }
                other => IssuanceError::Persistence(other),
            });
        }
        tx.commit().await?;

        let certificate = self
            .gateway
            .find_certificate(&record.certificate_id)
            .await?
            .ok_or_else(|| {
                DatabaseError::NotFound(format!("Certificate {}", record.certificate_id))
            })?;

        info!(
            certificate_id = %certificate.certificate_id,
            certificate_number = certificate.certificate_number.as_deref().unwrap_or("-"),
            "Certificate issued"
        );
        Ok(certificate)
    }
}
