/// Storage seams
///
/// The token engine talks to users and refresh token records only through
/// these traits. Postgres backs them in production, the in-memory versions
/// back local runs and tests.

mod memory;
mod postgres;

pub use memory::{InMemoryCredentialStore, InMemoryRefreshTokenLedger};
pub use postgres::{PgCredentialStore, PgRefreshTokenLedger};

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::{NewRefreshToken, RefreshTokenRecord};
use crate::error::AppError;

/// A user as seen by the token engine
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Registration input, already validated for shape
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Identity provider: owns users and their password hashes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a user.
    ///
    /// # Errors
    /// `AuthError::EmailAlreadyExists` when the email is taken, a
    /// `ValidationError` when the password policy rejects the password.
    async fn register(&self, user: NewUser) -> Result<UserRecord, AppError>;

    /// `Some(user)` if the email exists and the password matches.
    async fn authenticate(&self, email: &str, password: &str)
        -> Result<Option<UserRecord>, AppError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, AppError>;
}

/// Result of a compare-and-set redemption
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    /// The old record is now used and the replacement is stored
    Redeemed(RefreshTokenRecord),
    /// Another request redeemed (or revoked) the record first; nothing was written
    Conflict,
}

/// Refresh token ledger: the source of truth for one-time use.
///
/// Secrets passed in are plaintext; implementations look records up by
/// [`crate::auth::hash_token`].
#[async_trait]
pub trait RefreshTokenLedger: Send + Sync {
    async fn insert(&self, record: NewRefreshToken) -> Result<RefreshTokenRecord, AppError>;

    async fn find_by_token(&self, secret: &str) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Atomically mark the record for `secret` used (only if it is still
    /// unused and unrevoked) and store `replacement`.
    async fn redeem(
        &self,
        secret: &str,
        replacement: NewRefreshToken,
    ) -> Result<Redemption, AppError>;

    /// Mark the record for `secret` revoked. Returns false if no record matched.
    async fn revoke(&self, secret: &str) -> Result<bool, AppError>;

    /// Revoke every unrevoked record of `user_id`. Returns the number changed.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;
}
