//! Batch issuance under a single transaction.
//!
//! Rows that fail validation or hit a constraint violation are reported and
//! skipped. Any other insert failure rolls the whole batch back.

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use certvault_core::certificate::expiry_from_date;

use super::id::IdGenerator;
use super::issuer::{CertificateIssuer, Holder, IssuanceError, non_empty, parse_date};
use crate::storage::{CertificateGateway, IssuanceTransaction, NewCertificate};

/// One input row, as raw cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct BatchRow(pub Vec<String>);

impl BatchRow {
    pub fn new<S: Into<String>>(cells: impl IntoIterator<Item = S>) -> Self {
        Self(cells.into_iter().map(Into::into).collect())
    }

    fn cell(&self, index: usize) -> Option<&str> {
        non_empty(self.0.get(index).map(String::as_str))
    }
}

/// How the cells of a row map onto certificate fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLayout {
    /// `full_name, course_name, issue_date, [expiry_date], [additional_info]`
    #[default]
    Full,
    /// `full_name, [email]`; course and issue date come from the shared fields.
    NameOnly,
}

impl RowLayout {
    const fn min_cells(self) -> usize {
        match self {
            Self::Full => 3,
            Self::NameOnly => 1,
        }
    }
}

/// Batch-wide defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SharedFields {
    #[serde(default)]
    pub layout: RowLayout,
    pub course_name: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub template_id: Option<i64>,
    pub branch_name: Option<String>,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based, counting the header row.
    pub row_number: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
    pub certificate_ids: Vec<String>,
}

impl BatchResult {
    fn reject(&mut self, row_number: usize, message: &str) {
        self.error_count += 1;
        self.errors.push(RowError {
            row_number,
            message: message.to_string(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowRejection {
    InsufficientData,
    MissingRequiredFields,
    InvalidDateFormat,
}

impl RowRejection {
    const fn message(self) -> &'static str {
        match self {
            Self::InsufficientData => "Insufficient data",
            Self::MissingRequiredFields => "Missing required fields",
            Self::InvalidDateFormat => "Invalid date format",
        }
    }
}

const CONSTRAINT_VIOLATION: &str = "Database constraint violation";

/// The data row after the header is row 2.
const fn row_number(index: usize) -> usize {
    index + 2
}

impl<G: CertificateGateway, I: IdGenerator> CertificateIssuer<G, I> {
    /// Issue one certificate per row, in order, inside one transaction.
    #[instrument(skip_all, fields(rows = rows.len(), layout = ?shared.layout))]
    pub async fn issue_batch(
        &self,
        rows: &[BatchRow],
        shared: &SharedFields,
        created_by: Option<&str>,
    ) -> Result<BatchResult, IssuanceError> {
        let max_rows = self.config.issuance.max_batch_rows;
        if rows.len() > max_rows {
            return Err(IssuanceError::Validation(format!(
                "Batch has {} rows; the limit is {max_rows}",
                rows.len()
            )));
        }

        if let Some(template_id) = shared.template_id {
            self.ensure_template(template_id).await?;
        }

        let mut result = BatchResult::default();
        let mut tx = self.gateway.begin_transaction().await?;

        for (index, row) in rows.iter().enumerate() {
            let row_number = row_number(index);
            let record = match self.prepare_row(row, shared, created_by) {
                Ok(record) => record,
                Err(rejection) => {
                    result.reject(row_number, rejection.message());
                    continue;
                }
            };

            match tx.insert_certificate(&record).await {
                Ok(()) => {
                    result.success_count += 1;
                    result.certificate_ids.push(record.certificate_id);
                }
                Err(e) if e.is_constraint() => {
                    warn!(row_number, error = %e, "Row rejected by database constraint");
                    result.reject(row_number, CONSTRAINT_VIOLATION);
                }
                Err(e) => {
                    error!(row_number, error = %e, "Batch insert failed; rolling back");
                    if let Err(rollback_err) = tx.rollback().await {
                        error!(error = %rollback_err, "Batch rollback failed");
                    }
                    return Err(IssuanceError::Persistence(e));
                }
            }
        }

        tx.commit().await?;

        info!(
            success_count = result.success_count,
            error_count = result.error_count,
            "Batch issued"
        );
        Ok(result)
    }

    fn prepare_row(
        &self,
        row: &BatchRow,
        shared: &SharedFields,
        created_by: Option<&str>,
    ) -> Result<NewCertificate, RowRejection> {
        if row.0.len() < shared.layout.min_cells() {
            return Err(RowRejection::InsufficientData);
        }

        let shared_course = non_empty(shared.course_name.as_deref());
        let shared_issue = non_empty(shared.issue_date.as_deref());
        let shared_expiry = non_empty(shared.expiry_date.as_deref());

        let (full_name, course_name, issue_date, expiry, additional_info, email) =
            match shared.layout {
                RowLayout::Full => (
                    row.cell(0),
                    row.cell(1).or(shared_course),
                    row.cell(2).or(shared_issue),
                    row.cell(3).or(shared_expiry),
                    row.cell(4),
                    None,
                ),
                RowLayout::NameOnly => (
                    row.cell(0),
                    shared_course,
                    shared_issue,
                    shared_expiry,
                    None,
                    row.cell(1),
                ),
            };

        let (Some(full_name), Some(course_name), Some(issue_date)) =
            (full_name, course_name, issue_date)
        else {
            return Err(RowRejection::MissingRequiredFields);
        };

        let issue_date = parse_date(issue_date).ok_or(RowRejection::InvalidDateFormat)?;
        let expires_at = expiry
            .map(|value| parse_date(value).ok_or(RowRejection::InvalidDateFormat))
            .transpose()?
            .map(expiry_from_date);

        let holder = Holder {
            full_name,
            course_name,
            issue_date,
        };
        let mut record = self.new_record(&holder, None, created_by);
        record.expires_at = expires_at;
        record.additional_info = additional_info.map(str::to_string);
        record.recipient_email = email.map(str::to_string);
        record.template_id = shared.template_id;
        record.branch_name = non_empty(shared.branch_name.as_deref()).map(str::to_string);
        record.grade = non_empty(shared.grade.as_deref()).map(str::to_string);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_data_row_is_row_two() {
        assert_eq!(row_number(0), 2);
        assert_eq!(row_number(9), 11);
    }

    #[test]
    fn cells_are_trimmed_and_blank_is_missing() {
        let row = BatchRow::new(["  Jane Doe ", "   ", "2024-01-01"]);
        assert_eq!(row.cell(0), Some("Jane Doe"));
        assert_eq!(row.cell(1), None);
        assert_eq!(row.cell(7), None);
    }

    #[test]
    fn rows_deserialize_from_plain_arrays() {
        let rows: Vec<BatchRow> =
            serde_json::from_str(r#"[["Jane Doe","Rust","2024-01-02"],["Sam"]]"#).unwrap_or_default();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], BatchRow::new(["Sam"]));
    }

    #[test]
    fn layout_deserializes_snake_case() {
        let shared: SharedFields =
            serde_json::from_str(r#"{"layout":"name_only","course_name":"Rust"}"#)
                .unwrap_or_default();
        assert_eq!(shared.layout, RowLayout::NameOnly);
        assert_eq!(shared.course_name.as_deref(), Some("Rust"));
    }
}
