/// JWT Claims structure
///
/// Payload of an access token: the owning user, a unique token id (`jti`)
/// that binds the token to its refresh record, and the RFC 7519 time claims.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User ID as UUID string
    #[serde(rename = "Id")]
    pub id: String,
    /// Subject (the user's email)
    pub sub: String,
    /// User email
    pub email: String,
    /// Unique token id, fresh per issuance
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Claims {
    /// Create claims for a user, valid for the configured access token lifetime
    pub fn new(user_id: Uuid, email: &str, config: &JwtSettings) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: user_id.to_string(),
            sub: email.to_string(),
            email: email.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + config.access_token_expiry,
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns error if user ID is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.id).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-that-is-at-least-forty-characters".to_string(),
            access_token_expiry: 3600,
            issuer: None,
            audience: None,
        }
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "test@example.com", &config());

        assert_eq!(claims.id, user_id.to_string());
        assert_eq!(claims.sub, "test@example.com");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_every_claims_set_has_a_fresh_jti() {
        let user_id = Uuid::new_v4();
        let first = Claims::new(user_id, "test@example.com", &config());
        let second = Claims::new(user_id, "test@example.com", &config());

        assert_ne!(first.jti, second.jti);
        assert!(Uuid::parse_str(&first.jti).is_ok());
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "test@example.com", &config());

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = Claims::new(Uuid::new_v4(), "test@example.com", &config());
        claims.id = "invalid-uuid".to_string();

        assert!(claims.user_id().is_err());
    }

    #[test]
    fn test_user_id_serializes_as_capitalized_id() {
        let claims = Claims::new(Uuid::new_v4(), "test@example.com", &config());
        let json = serde_json::to_value(&claims).unwrap();

        assert!(json.get("Id").is_some());
        assert!(json.get("iss").is_none());
    }

    proptest! {
        #[test]
        fn prop_lifetime_matches_configuration(expiry in 1i64..=31_536_000, bytes in any::<[u8; 16]>()) {
            let mut settings = config();
            settings.access_token_expiry = expiry;
            let user_id = Uuid::from_bytes(bytes);

            let claims = Claims::new(user_id, "test@example.com", &settings);

            prop_assert_eq!(claims.exp - claims.iat, expiry);
            prop_assert_eq!(claims.user_id().unwrap(), user_id);
        }
    }
}
