//! API key queries.

use certvault_core::db::unix_timestamp;

use super::db::ServerDatabase;
use super::models::ApiKey;
use certvault_core::db::DatabaseError;

impl ServerDatabase {
    /// Store a new API key (hash only; the raw key is never persisted).
    pub async fn create_api_key(
        &self,
        id: &str,
        name: &str,
        key_prefix: &str,
        key_hash: &str,
        created_by: Option<&str>,
    ) -> Result<ApiKey, DatabaseError> {
        sqlx::query(
            "INSERT INTO api_keys (id, name, key_prefix, key_hash, created_by, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(key_prefix)
        .bind(key_hash)
        .bind(created_by)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.get_api_key(id).await
    }

    /// Get an API key by ID.
    pub async fn get_api_key(&self, id: &str) -> Result<ApiKey, DatabaseError> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("API key {id}")))
    }

    /// Find a non-revoked key by hash.
    pub async fn get_active_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKey>, DatabaseError> {
        let key = sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE key_hash = ? AND revoked = 0",
        )
        .bind(key_hash)
        .fetch_optional(self.pool())
        .await?;

        Ok(key)
    }

    /// List all API keys, newest first.
    pub async fn list_api_keys(&self) -> Result<Vec<ApiKey>, DatabaseError> {
        let keys = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys ORDER BY created_at DESC, id")
            .fetch_all(self.pool())
            .await?;

        Ok(keys)
    }

    /// Revoke an API key by ID.
    pub async fn revoke_api_key(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE api_keys SET revoked = 1 WHERE id = ? AND revoked = 0")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record that a key was just used.
    pub async fn touch_api_key(&self, id: &str) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(())
    }
}
