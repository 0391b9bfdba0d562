//! Verification event queries.
//!
//! The log is append-only: this module offers inserts and reads, nothing
//! else, and the schema refuses UPDATE/DELETE with triggers.

use super::db::ServerDatabase;
use super::models::{NewVerificationEvent, VerificationEvent};
use certvault_core::db::DatabaseError;

impl ServerDatabase {
    /// Append a verification event and return its row ID.
    pub async fn append_verification_event(
        &self,
        event: &NewVerificationEvent<'_>,
    ) -> Result<i64, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO verification_events (certificate_id, verified_at, ip_address, user_agent, device_info, geo_info, successful) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.certificate_id)
        .bind(event.verified_at)
        .bind(event.ip_address)
        .bind(event.user_agent)
        .bind(event.device_info)
        .bind(event.geo_info)
        .bind(event.successful)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Verification history for one certificate, newest first.
    pub async fn list_verification_events(
        &self,
        certificate_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<VerificationEvent>, DatabaseError> {
        let events = sqlx::query_as::<_, VerificationEvent>(
            "SELECT * FROM verification_events WHERE certificate_id = ? ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(certificate_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(events)
    }

    /// Most recent verification events across all certificates.
    pub async fn list_recent_verification_events(
        &self,
        successful: Option<bool>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<VerificationEvent>, DatabaseError> {
        let events = if let Some(successful) = successful {
            sqlx::query_as::<_, VerificationEvent>(
                "SELECT * FROM verification_events WHERE successful = ? ORDER BY id DESC LIMIT ? OFFSET ?",
            )
            .bind(successful)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, VerificationEvent>(
                "SELECT * FROM verification_events ORDER BY id DESC LIMIT ? OFFSET ?",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?
        };

        Ok(events)
    }

    /// Count verification events for a certificate.
    pub async fn count_verification_events(&self, certificate_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM verification_events WHERE certificate_id = ?")
                .bind(certificate_id)
                .fetch_one(self.pool())
                .await?;

        Ok(row.0)
    }
}
