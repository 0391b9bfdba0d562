//! Admin user queries.

use certvault_core::db::unix_timestamp;

use super::db::ServerDatabase;
use super::models::AdminUser;
use certvault_core::db::DatabaseError;

impl ServerDatabase {
    /// Create a new admin user.
    pub async fn create_admin_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<AdminUser, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO admin_users (id, username, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_admin_user(id).await
    }

    /// Get an admin user by ID.
    pub async fn get_admin_user(&self, id: &str) -> Result<AdminUser, DatabaseError> {
        sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get an admin user by username.
    pub async fn get_admin_user_by_username(&self, username: &str) -> Result<AdminUser, DatabaseError> {
        sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with username {username}")))
    }

    /// Replace a user's password hash.
    pub async fn update_admin_password(&self, id: &str, password_hash: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE admin_users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
