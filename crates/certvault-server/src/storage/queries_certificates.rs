//! Certificate queries for the `CertVault` server.

use certvault_core::db::unix_timestamp;
use sqlx::{QueryBuilder, Sqlite};

use super::db::ServerDatabase;
use super::models::{Certificate, CertificateFilter, CertificateUpdate, NewCertificate, StatusFilter};
use certvault_core::db::DatabaseError;

const INSERT_CERTIFICATE_SQL: &str = "INSERT INTO certificates (certificate_id, certificate_number, \
     full_name, course_name, branch_name, grade, recipient_email, additional_info, issue_date, \
     pass_date, expires_at, is_active, validation_status, photo_path, qr_code_ref, template_id, \
     created_by, created_at, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, 1, ?, ?, ?, ?, ?, ?)";

const UPDATE_CERTIFICATE_SQL: &str = "UPDATE certificates SET full_name = ?, course_name = ?, \
     branch_name = ?, grade = ?, recipient_email = ?, additional_info = ?, issue_date = ?, \
     pass_date = ?, expires_at = ?, photo_path = ?, template_id = ?, updated_at = ? \
     WHERE certificate_id = ?";

impl NewCertificate {
    /// Bind every inserted column, in `INSERT_CERTIFICATE_SQL` order.
    fn bind_to<'q>(
        &'q self,
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        now: i64,
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        query
            .bind(self.certificate_id.as_str())
            .bind(self.certificate_number.as_deref())
            .bind(self.full_name.as_str())
            .bind(self.course_name.as_str())
            .bind(self.branch_name.as_deref())
            .bind(self.grade.as_deref())
            .bind(self.recipient_email.as_deref())
            .bind(self.additional_info.as_deref())
            .bind(self.issue_date)
            .bind(self.pass_date)
            .bind(self.expires_at)
            .bind(self.photo_path.as_deref())
            .bind(self.qr_code_ref.as_deref())
            .bind(self.template_id)
            .bind(self.created_by.as_deref())
            .bind(now)
            .bind(now)
    }
}

/// Insert a certificate on any executor: the pool, or a connection inside an
/// open transaction.
pub(super) async fn insert_certificate<'e, E>(
    executor: E,
    certificate: &NewCertificate,
) -> Result<(), DatabaseError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    certificate
        .bind_to(sqlx::query(INSERT_CERTIFICATE_SQL), unix_timestamp())
        .execute(executor)
        .await?;
    Ok(())
}

impl ServerDatabase {
    // =========================================================================
    // Certificate queries
    // =========================================================================

    /// Insert a single certificate outside any batch.
    pub async fn create_certificate(
        &self,
        certificate: &NewCertificate,
    ) -> Result<Certificate, DatabaseError> {
        insert_certificate(self.pool(), certificate).await?;
        self.get_certificate(&certificate.certificate_id).await
    }

    /// Look up a certificate; `None` when it does not exist.
    pub async fn find_certificate(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Certificate>, DatabaseError> {
        let cert =
            sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE certificate_id = ?")
                .bind(certificate_id)
                .fetch_optional(self.pool())
                .await?;

        Ok(cert)
    }

    /// Get a certificate by ID.
    pub async fn get_certificate(&self, certificate_id: &str) -> Result<Certificate, DatabaseError> {
        self.find_certificate(certificate_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Certificate {certificate_id}")))
    }

    /// List certificates, newest first.
    pub async fn list_certificates(
        &self,
        filter: &CertificateFilter<'_>,
    ) -> Result<Vec<Certificate>, DatabaseError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM certificates WHERE 1 = 1");
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, certificate_id ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let certificates = query
            .build_query_as::<Certificate>()
            .fetch_all(self.pool())
            .await?;

        Ok(certificates)
    }

    /// Count certificates matching a listing filter (ignores paging).
    pub async fn count_certificates(
        &self,
        filter: &CertificateFilter<'_>,
    ) -> Result<i64, DatabaseError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM certificates WHERE 1 = 1");
        push_filter(&mut query, filter);

        let row: (i64,) = query.build_query_as().fetch_one(self.pool()).await?;
        Ok(row.0)
    }

    /// Apply a partial update. Lifecycle flags are not touched here.
    pub async fn update_certificate(
        &self,
        certificate_id: &str,
        update: &CertificateUpdate,
    ) -> Result<Certificate, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let existing =
            sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE certificate_id = ?")
                .bind(certificate_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DatabaseError::NotFound(format!("Certificate {certificate_id}")))?;

        let full_name = update.full_name.as_deref().unwrap_or(&existing.full_name);
        let course_name = update.course_name.as_deref().unwrap_or(&existing.course_name);
        let branch_name = pick(&update.branch_name, &existing.branch_name);
        let grade = pick(&update.grade, &existing.grade);
        let recipient_email = pick(&update.recipient_email, &existing.recipient_email);
        let additional_info = pick(&update.additional_info, &existing.additional_info);
        let issue_date = update.issue_date.unwrap_or(existing.issue_date);
        let pass_date = update.pass_date.unwrap_or(existing.pass_date);
        let expires_at = update.expires_at.unwrap_or(existing.expires_at);
        let photo_path = pick(&update.photo_path, &existing.photo_path);
        let template_id = update.template_id.unwrap_or(existing.template_id);

        sqlx::query(UPDATE_CERTIFICATE_SQL)
            .bind(full_name)
            .bind(course_name)
            .bind(branch_name)
            .bind(grade)
            .bind(recipient_email)
            .bind(additional_info)
            .bind(issue_date)
            .bind(pass_date)
            .bind(expires_at)
            .bind(photo_path)
            .bind(template_id)
            .bind(unix_timestamp())
            .bind(certificate_id)
            .execute(&mut *tx)
            .await?;

        let updated =
            sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE certificate_id = ?")
                .bind(certificate_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Revoke (`false`) or reinstate (`true`) a certificate.
    pub async fn set_certificate_active(
        &self,
        certificate_id: &str,
        is_active: bool,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE certificates SET is_active = ?, updated_at = ? WHERE certificate_id = ?",
        )
        .bind(is_active)
        .bind(unix_timestamp())
        .bind(certificate_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the independent valid/invalid judgment.
    pub async fn set_validation_status(
        &self,
        certificate_id: &str,
        validation_status: bool,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE certificates SET validation_status = ?, updated_at = ? WHERE certificate_id = ?",
        )
        .bind(validation_status)
        .bind(unix_timestamp())
        .bind(certificate_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a certificate. Its verification history and template stay.
    pub async fn delete_certificate(&self, certificate_id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM certificates WHERE certificate_id = ?")
            .bind(certificate_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count certificates referencing a template.
    pub async fn count_certificates_for_template(
        &self,
        template_id: i64,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM certificates WHERE template_id = ?")
                .bind(template_id)
                .fetch_one(self.pool())
                .await?;

        Ok(row.0)
    }
}

fn pick<'a, T>(update: &'a Option<Option<T>>, existing: &'a Option<T>) -> Option<&'a T> {
    match update {
        Some(value) => value.as_ref(),
        None => existing.as_ref(),
    }
}

fn push_filter<'a>(query: &mut QueryBuilder<'a, Sqlite>, filter: &CertificateFilter<'a>) {
    if let Some(search) = filter.search.map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        query
            .push(" AND (full_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR course_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR certificate_number LIKE ")
            .push_bind(pattern)
            .push(" OR certificate_id = ")
            .push_bind(search)
            .push(")");
    }
    match filter.status {
        StatusFilter::All => {}
        StatusFilter::Active => {
            query.push(" AND is_active = 1 AND validation_status = 1");
        }
        StatusFilter::Revoked => {
            query.push(" AND is_active = 0");
        }
        StatusFilter::Invalid => {
            query.push(" AND is_active = 1 AND validation_status = 0");
        }
    }
    if let Some(template_id) = filter.template_id {
        query.push(" AND template_id = ").push_bind(template_id);
    }
}
