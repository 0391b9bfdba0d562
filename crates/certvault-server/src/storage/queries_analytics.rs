//! Aggregate queries backing the admin dashboard.
//!
//! Timestamps are stored as RFC 3339 text in a single format, so range
//! comparisons on `expires_at`/`verified_at` are plain string comparisons.

use chrono::{DateTime, Duration, Utc};

use super::db::ServerDatabase;
use super::models::{DailyVerifications, DashboardSummary};
use certvault_core::db::DatabaseError;

impl ServerDatabase {
    /// Certificate and verification totals as of `now`.
    pub async fn dashboard_summary(
        &self,
        now: DateTime<Utc>,
        expiring_window: Duration,
    ) -> Result<DashboardSummary, DatabaseError> {
        let (total, active, revoked, invalid): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COALESCE(SUM(CASE WHEN is_active = 1 AND validation_status = 1 THEN 1 ELSE 0 END), 0), \
                    COALESCE(SUM(CASE WHEN is_active = 0 THEN 1 ELSE 0 END), 0), \
                    COALESCE(SUM(CASE WHEN is_active = 1 AND validation_status = 0 THEN 1 ELSE 0 END), 0) \
             FROM certificates",
        )
        .fetch_one(self.pool())
        .await?;

        let (expired,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM certificates \
             WHERE is_active = 1 AND validation_status = 1 AND expires_at IS NOT NULL AND expires_at < ?",
        )
        .bind(now)
        .fetch_one(self.pool())
        .await?;

        let (expiring_soon,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM certificates \
             WHERE is_active = 1 AND validation_status = 1 AND expires_at IS NOT NULL \
             AND expires_at >= ? AND expires_at <= ?",
        )
        .bind(now)
        .bind(now + expiring_window)
        .fetch_one(self.pool())
        .await?;

        let (total_verifications, successful_verifications): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(successful), 0) FROM verification_events",
        )
        .fetch_one(self.pool())
        .await?;

        let total_templates = self.count_templates().await?;

        Ok(DashboardSummary {
            total_certificates: total,
            active_certificates: active,
            revoked_certificates: revoked,
            invalid_certificates: invalid,
            expired_certificates: expired,
            expiring_soon,
            total_templates,
            total_verifications,
            successful_verifications,
            failed_verifications: total_verifications - successful_verifications,
        })
    }

    /// Per-day verification counts for events at or after `since`, oldest
    /// day first. Days without events are omitted.
    pub async fn daily_verifications(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyVerifications>, DatabaseError> {
        let rows = sqlx::query_as::<_, DailyVerifications>(
            "SELECT substr(verified_at, 1, 10) AS day, COUNT(*) AS total, \
                    COALESCE(SUM(successful), 0) AS successful \
             FROM verification_events WHERE verified_at >= ? \
             GROUP BY day ORDER BY day",
        )
        .bind(since)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Certificates issued per course, most issued first.
    pub async fn certificates_per_course(
        &self,
        limit: u32,
    ) -> Result<Vec<(String, i64)>, DatabaseError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT course_name, COUNT(*) AS issued FROM certificates \
             GROUP BY course_name ORDER BY issued DESC, course_name LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
