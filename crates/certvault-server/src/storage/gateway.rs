//! Persistence gateway consumed by the verification and issuance services.
//!
//! The services are generic over these traits so tests can substitute a
//! gateway that fails on demand; production uses [`ServerDatabase`].

use std::future::Future;

use sqlx::Sqlite;

use super::db::ServerDatabase;
use super::models::{Certificate, NewCertificate, NewVerificationEvent, Template};
use super::queries_certificates::insert_certificate;
use certvault_core::db::DatabaseError;

/// Read and append operations on certificate state.
pub trait CertificateGateway: Send + Sync {
    type Transaction: IssuanceTransaction;

    /// `Ok(None)` when the certificate does not exist.
    fn find_certificate(
        &self,
        certificate_id: &str,
    ) -> impl Future<Output = Result<Option<Certificate>, DatabaseError>> + Send;

    /// `Ok(None)` when the template does not exist.
    fn find_template(
        &self,
        template_id: i64,
    ) -> impl Future<Output = Result<Option<Template>, DatabaseError>> + Send;

    fn append_verification_event(
        &self,
        event: &NewVerificationEvent<'_>,
    ) -> impl Future<Output = Result<i64, DatabaseError>> + Send;

    fn begin_transaction(
        &self,
    ) -> impl Future<Output = Result<Self::Transaction, DatabaseError>> + Send;
}

/// An open write transaction. Dropping it without `commit` rolls back.
pub trait IssuanceTransaction: Send {
    /// A `DatabaseError::Constraint` leaves the transaction usable; any other
    /// error means it must be rolled back.
    fn insert_certificate(
        &mut self,
        certificate: &NewCertificate,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), DatabaseError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), DatabaseError>> + Send;
}

/// `SQLite` transaction backing a batch insert.
pub struct SqliteIssuanceTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl IssuanceTransaction for SqliteIssuanceTransaction {
    async fn insert_certificate(&mut self, certificate: &NewCertificate) -> Result<(), DatabaseError> {
        insert_certificate(&mut *self.tx, certificate).await
    }

    async fn commit(self) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

impl CertificateGateway for ServerDatabase {
    type Transaction = SqliteIssuanceTransaction;

    async fn find_certificate(&self, certificate_id: &str) -> Result<Option<Certificate>, DatabaseError> {
        Self::find_certificate(self, certificate_id).await
    }

    async fn find_template(&self, template_id: i64) -> Result<Option<Template>, DatabaseError> {
        Self::find_template(self, template_id).await
    }

    async fn append_verification_event(
        &self,
        event: &NewVerificationEvent<'_>,
    ) -> Result<i64, DatabaseError> {
        Self::append_verification_event(self, event).await
    }

    async fn begin_transaction(&self) -> Result<SqliteIssuanceTransaction, DatabaseError> {
        let tx = self.pool().begin().await?;
        Ok(SqliteIssuanceTransaction { tx })
    }
}
