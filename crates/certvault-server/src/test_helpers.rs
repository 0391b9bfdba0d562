//! Shared test helpers: fixtures and a gateway that fails on demand.

use chrono::NaiveDate;

use crate::storage::{
    Certificate, CertificateGateway, DatabaseError, IssuanceTransaction, NewCertificate,
    NewVerificationEvent, ServerDatabase, SqliteIssuanceTransaction, Template,
};
use crate::verification::geo::{GeoError, GeoInfo, GeoLocator};

pub async fn test_db() -> ServerDatabase {
    ServerDatabase::open_in_memory().await.unwrap()
}

/// A valid, never-expiring certificate record.
pub fn sample_certificate(certificate_id: &str, full_name: &str) -> NewCertificate {
    NewCertificate {
        certificate_id: certificate_id.to_string(),
        certificate_number: None,
        full_name: full_name.to_string(),
        course_name: "Rust Fundamentals".to_string(),
        branch_name: None,
        grade: None,
        recipient_email: None,
        additional_info: None,
        issue_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        pass_date: None,
        expires_at: None,
        photo_path: None,
        qr_code_ref: None,
        template_id: None,
        created_by: None,
    }
}

/// Wraps a real database and injects failures.
#[derive(Clone)]
pub struct FaultyGateway {
    pub db: ServerDatabase,
    pub fail_lookup: bool,
    pub fail_append: bool,
    /// 1-based insert number that fails with a non-constraint error.
    pub fail_insert_at: Option<usize>,
    /// Report every missing template as an active one, as if it were
    /// deleted between the check and the insert.
    pub stale_templates: bool,
}

impl FaultyGateway {
    pub const fn new(db: ServerDatabase) -> Self {
        Self {
            db,
            fail_lookup: false,
            fail_append: false,
            fail_insert_at: None,
            stale_templates: false,
        }
    }
}

pub struct FaultyTransaction {
    inner: SqliteIssuanceTransaction,
    inserts: usize,
    fail_insert_at: Option<usize>,
}

impl IssuanceTransaction for FaultyTransaction {
    async fn insert_certificate(&mut self, certificate: &NewCertificate) -> Result<(), DatabaseError> {
        self.inserts += 1;
        if self.fail_insert_at == Some(self.inserts) {
            return Err(DatabaseError::Query("disk I/O error".to_string()));
        }
        self.inner.insert_certificate(certificate).await
    }

    async fn commit(self) -> Result<(), DatabaseError> {
        self.inner.commit().await
    }

    async fn rollback(self) -> Result<(), DatabaseError> {
        self.inner.rollback().await
    }
}

impl CertificateGateway for FaultyGateway {
    type Transaction = FaultyTransaction;

    async fn find_certificate(&self, certificate_id: &str) -> Result<Option<Certificate>, DatabaseError> {
        if self.fail_lookup {
            return Err(DatabaseError::Connection("database is unreachable".to_string()));
        }
        self.db.find_certificate(certificate_id).await
    }

    async fn find_template(&self, template_id: i64) -> Result<Option<Template>, DatabaseError> {
        let found = self.db.find_template(template_id).await?;
        if found.is_none() && self.stale_templates {
            return Ok(Some(Template {
                id: template_id,
                name: "Deleted".to_string(),
                description: None,
                layout: "{}".to_string(),
                is_active: true,
                created_at: 0,
                updated_at: 0,
            }));
        }
        Ok(found)
    }

    async fn append_verification_event(
        &self,
        event: &NewVerificationEvent<'_>,
    ) -> Result<i64, DatabaseError> {
        if self.fail_append {
            return Err(DatabaseError::Query("database is locked".to_string()));
        }
        self.db.append_verification_event(event).await
    }

    async fn begin_transaction(&self) -> Result<FaultyTransaction, DatabaseError> {
        Ok(FaultyTransaction {
            inner: CertificateGateway::begin_transaction(&self.db).await?,
            inserts: 0,
            fail_insert_at: self.fail_insert_at,
        })
    }
}

/// A geo locator whose backend is always down.
pub struct FailingGeoLocator;

impl GeoLocator for FailingGeoLocator {
    async fn locate(&self, _ip: &str) -> Result<Option<GeoInfo>, GeoError> {
        Err(GeoError::Request("connection refused".to_string()))
    }
}

/// A geo locator that places everyone in the same city.
pub struct FixedGeoLocator;

impl GeoLocator for FixedGeoLocator {
    async fn locate(&self, _ip: &str) -> Result<Option<GeoInfo>, GeoError> {
        Ok(Some(GeoInfo {
            country: Some("Kenya".to_string()),
            region: Some("Nairobi".to_string()),
            city: Some("Nairobi".to_string()),
        }))
    }
}
