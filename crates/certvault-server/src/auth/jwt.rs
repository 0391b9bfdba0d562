//! JWT access token issuance and validation.

use certvault_core::db::unix_timestamp;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use super::claims::Claims;
use crate::storage::AdminUser;

/// Issues and validates admin access tokens.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
}

impl JwtManager {
    /// Create a new `JwtManager` with the given secret.
    pub fn new(secret: &[u8], access_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
        }
    }

    /// Issue an access token for `user`. Returns the token and its TTL.
    pub fn issue_access_token(
        &self,
        user: &AdminUser,
    ) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let now = unix_timestamp();

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok((token, self.access_ttl_secs))
    }

    /// Validate a token and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::ROLE_STAFF;

    fn test_jwt() -> JwtManager {
        JwtManager::new(b"test-secret-key-for-testing", 3600)
    }

    fn staff_user() -> AdminUser {
        AdminUser {
            id: "user-1".to_string(),
            username: "registrar".to_string(),
            email: "registrar@example.org".to_string(),
            password_hash: String::new(),
            role: ROLE_STAFF.to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn issue_and_validate_access_token() {
        let jwt = test_jwt();
        let (token, ttl) = jwt.issue_access_token(&staff_user()).unwrap();
        assert_eq!(ttl, 3600);

        let claims = jwt.validate(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "registrar");
        assert!(!claims.is_admin());
    }

    #[test]
    fn invalid_token_fails_validation() {
        assert!(test_jwt().validate("not-a-valid-token").is_err());
    }

    #[test]
    fn wrong_secret_fails_validation() {
        let other = JwtManager::new(b"different-secret", 3600);
        let (token, _) = test_jwt().issue_access_token(&staff_user()).unwrap();
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn expired_token_fails_validation() {
        let jwt = JwtManager::new(b"test-secret-key-for-testing", -3600);
        let (token, _) = jwt.issue_access_token(&staff_user()).unwrap();
        assert!(jwt.validate(&token).is_err());
    }
}
