/// Refresh Token Secrets and Records
///
/// Refresh tokens are:
/// - 64 alphanumeric characters drawn from the OS CSPRNG on every call
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Bound to the `jti` of the access token issued alongside them
/// - Single-use: redeemed exactly once, then kept for replay detection

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::configuration::REFRESH_TOKEN_LIFETIME;
use crate::error::AppError;

const REFRESH_TOKEN_LENGTH: usize = 64;

/// Generate a new refresh secret
///
/// The secret is returned in plaintext (this is what the client stores).
/// The ledger stores only the SHA-256 hash.
pub fn generate_refresh_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash a refresh secret using SHA-256
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A persisted refresh token record
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: Uuid,
    /// SHA-256 hex digest of the bearer secret
    pub token: String,
    /// `jti` of the access token issued with this record
    pub jwt_id: String,
    pub is_used: bool,
    pub is_revoked: bool,
    pub added_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date <= now
    }
}

/// A record not yet written to the ledger
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    /// SHA-256 hex digest of the bearer secret
    pub token: String,
    pub jwt_id: String,
    pub added_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

impl NewRefreshToken {
    /// Build a record for `secret`, expiring [`REFRESH_TOKEN_LIFETIME`] after `added_date`.
    pub fn new(
        user_id: Uuid,
        secret: &str,
        jwt_id: &str,
        added_date: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        let expiry_date = added_date
            .checked_add_months(REFRESH_TOKEN_LIFETIME)
            .ok_or_else(|| AppError::Internal("Refresh token expiry out of range".to_string()))?;

        Ok(Self {
            user_id,
            token: hash_token(secret),
            jwt_id: jwt_id.to_string(),
            added_date,
            expiry_date,
        })
    }

    /// The record as the ledger will hold it once assigned `id`
    pub fn into_record(self, id: i64) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id,
            user_id: self.user_id,
            token: self.token,
            jwt_id: self.jwt_id,
            is_used: false,
            is_revoked: false,
            added_date: self.added_date,
            expiry_date: self.expiry_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token();

        assert_eq!(token.len(), REFRESH_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_concurrently_generated_tokens_are_distinct() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..250).map(|_| generate_refresh_token()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for token in handle.join().unwrap() {
                assert!(seen.insert(token), "duplicate refresh token generated");
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    #[test]
    fn test_token_hashing() {
        let token = generate_refresh_token();
        let hash1 = hash_token(&token);
        let hash2 = hash_token(&token);

        assert_eq!(hash1, hash2);
        assert_ne!(token, hash1);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_new_record_expires_six_months_later() {
        let added = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let record = NewRefreshToken::new(Uuid::new_v4(), "secret", "jti", added).unwrap();

        assert_eq!(
            record.expiry_date,
            Utc.with_ymd_and_hms(2024, 7, 31, 12, 0, 0).unwrap()
        );
        assert_eq!(record.token, hash_token("secret"));
    }

    #[test]
    fn test_into_record_starts_unused_and_unrevoked() {
        let record = NewRefreshToken::new(Uuid::new_v4(), "secret", "jti", Utc::now())
            .unwrap()
            .into_record(7);

        assert_eq!(record.id, 7);
        assert!(!record.is_used);
        assert!(!record.is_revoked);
        assert!(!record.is_expired_at(Utc::now()));
        assert!(record.is_expired_at(record.expiry_date));
        assert!(record.is_expired_at(record.expiry_date + Duration::seconds(1)));
    }

    proptest! {
        #[test]
        fn prop_distinct_secrets_have_distinct_hashes(a in "[A-Za-z0-9]{64}", b in "[A-Za-z0-9]{64}") {
            prop_assume!(a != b);
            prop_assert_ne!(hash_token(&a), hash_token(&b));
        }
    }
}
