//! Template queries.

use certvault_core::db::unix_timestamp;

use super::db::ServerDatabase;
use super::models::{Template, TemplateParams};
use certvault_core::db::DatabaseError;

impl ServerDatabase {
    /// Create a template and return it.
    pub async fn create_template(&self, params: &TemplateParams<'_>) -> Result<Template, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO templates (name, description, layout, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(params.name)
        .bind(params.description)
        .bind(params.layout)
        .bind(params.is_active)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_template(result.last_insert_rowid()).await
    }

    /// Look up a template; `None` when it does not exist.
    pub async fn find_template(&self, id: i64) -> Result<Option<Template>, DatabaseError> {
        let template = sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(template)
    }

    /// Get a template by ID.
    pub async fn get_template(&self, id: i64) -> Result<Template, DatabaseError> {
        self.find_template(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Template {id}")))
    }

    /// List templates by name.
    pub async fn list_templates(&self, active_only: bool) -> Result<Vec<Template>, DatabaseError> {
        let templates = if active_only {
            sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE is_active = 1 ORDER BY name")
                .fetch_all(self.pool())
                .await?
        } else {
            sqlx::query_as::<_, Template>("SELECT * FROM templates ORDER BY name")
                .fetch_all(self.pool())
                .await?
        };

        Ok(templates)
    }

    /// Replace a template's editable fields.
    pub async fn update_template(
        &self,
        id: i64,
        params: &TemplateParams<'_>,
    ) -> Result<Template, DatabaseError> {
        let result = sqlx::query(
            "UPDATE templates SET name = ?, description = ?, layout = ?, is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(params.name)
        .bind(params.description)
        .bind(params.layout)
        .bind(params.is_active)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Template {id}")));
        }
        self.get_template(id).await
    }

    /// Delete a template. The `ON DELETE RESTRICT` foreign key rejects the
    /// delete with a constraint error while certificates still reference it.
    pub async fn delete_template(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM templates WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all templates.
    pub async fn count_templates(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM templates")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}
