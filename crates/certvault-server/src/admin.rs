//! Administrative operations: accounts, login, API keys and templates.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::auth::{JwtManager, api_key, password};
use crate::storage::{
    AdminUser, ApiKey, DatabaseError, ROLE_ADMIN, ROLE_STAFF, ServerDatabase, Template,
};

const MIN_USERNAME_LEN: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in_secs: i64,
    pub user: AdminUser,
}

/// A freshly created key. `raw_key` is shown once and never stored.
#[derive(Debug, Serialize)]
pub struct CreatedApiKey {
    #[serde(flatten)]
    pub key: ApiKey,
    pub raw_key: String,
}

#[derive(Clone)]
pub struct AdminService {
    db: ServerDatabase,
    jwt: Arc<JwtManager>,
}

impl AdminService {
    pub const fn new(db: ServerDatabase, jwt: Arc<JwtManager>) -> Self {
        Self { db, jwt }
    }

    #[instrument(skip(self, password))]
    pub async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<AdminUser, AdminError> {
        let username = username.trim();
        if username.len() < MIN_USERNAME_LEN {
            return Err(AdminError::Validation(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if password.len() < password::MIN_PASSWORD_LEN {
            return Err(AdminError::Validation(format!(
                "Password must be at least {} characters",
                password::MIN_PASSWORD_LEN
            )));
        }
        if role != ROLE_ADMIN && role != ROLE_STAFF {
            return Err(AdminError::Validation(format!(
                "Role must be '{ROLE_ADMIN}' or '{ROLE_STAFF}'"
            )));
        }

        let hash = password::hash_password(password)
            .map_err(|e| AdminError::Internal(format!("Password hashing failed: {e}")))?;
        let id = uuid::Uuid::new_v4().to_string();

        let user = match self
            .db
            .create_admin_user(&id, username, email.trim(), &hash, role)
            .await
        {
            Ok(user) => user,
            Err(e) if e.is_constraint() => {
                return Err(AdminError::Conflict("Username already taken".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, username = %user.username, "Admin user created");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AdminError> {
        let user = match self.db.get_admin_user_by_username(username.trim()).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound(_)) => {
                warn!("Login attempt for unknown user");
                return Err(AdminError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let valid = password::verify_password(password, &user.password_hash)
            .map_err(|e| AdminError::Internal(format!("Password verification failed: {e}")))?;
        if !valid {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(AdminError::InvalidCredentials);
        }

        let (access_token, expires_in_secs) = self
            .jwt
            .issue_access_token(&user)
            .map_err(|e| AdminError::Internal(format!("Token creation failed: {e}")))?;

        info!(user_id = %user.id, "Admin logged in");
        Ok(LoginResponse {
            access_token,
            token_type: "Bearer",
            expires_in_secs,
            user,
        })
    }

    #[instrument(skip(self))]
    pub async fn create_api_key(
        &self,
        name: &str,
        created_by: Option<&str>,
    ) -> Result<CreatedApiKey, AdminError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AdminError::Validation("API key name is required".to_string()));
        }

        let generated = api_key::generate();
        let id = uuid::Uuid::new_v4().to_string();
        let key = self
            .db
            .create_api_key(&id, name, &generated.display_prefix, &generated.hash, created_by)
            .await?;

        info!(key_id = %key.id, prefix = %key.key_prefix, "API key created");
        Ok(CreatedApiKey {
            key,
            raw_key: generated.raw,
        })
    }

    /// Resolve a raw key to its record; `None` for unknown or revoked keys.
    pub async fn authenticate_api_key(&self, raw_key: &str) -> Result<Option<ApiKey>, AdminError> {
        let Some(key) = self
            .db
            .get_active_api_key_by_hash(&api_key::hash_key(raw_key))
            .await?
        else {
            return Ok(None);
        };
        if let Err(e) = self.db.touch_api_key(&key.id).await {
            warn!(key_id = %key.id, error = %e, "Failed to record API key use");
        }
        Ok(Some(key))
    }

    #[instrument(skip(self))]
    pub async fn revoke_api_key(&self, id: &str) -> Result<(), AdminError> {
        if !self.db.revoke_api_key(id).await? {
            return Err(AdminError::NotFound(format!("API key {id}")));
        }
        info!(key_id = %id, "API key revoked");
        Ok(())
    }

    /// Delete a template nothing references.
    #[instrument(skip(self))]
    pub async fn delete_template(&self, id: i64) -> Result<(), AdminError> {
        let template: Template = self
            .db
            .find_template(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("Template {id}")))?;

        let in_use = self.db.count_certificates_for_template(id).await?;
        if in_use > 0 {
            return Err(AdminError::Conflict(format!(
                "Template '{}' is used by {in_use} certificate(s) and cannot be deleted",
                template.name
            )));
        }

        match self.db.delete_template(id).await {
            Ok(_) => {
                info!(template_id = id, "Template deleted");
                Ok(())
            }
            // A certificate was issued against it since the count.
            Err(e) if e.is_constraint() => Err(AdminError::Conflict(format!(
                "Template '{}' is in use and cannot be deleted",
                template.name
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
