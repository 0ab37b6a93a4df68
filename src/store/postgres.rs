use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, NewUser, Redemption, RefreshTokenLedger, UserRecord};
use crate::auth::{hash_password, hash_token, verify_password, DummyHash};
use crate::auth::{NewRefreshToken, RefreshTokenRecord};
use crate::error::{AppError, AuthError, DatabaseError};

/// Users table backed by Postgres; passwords hashed with bcrypt
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
    dummy_hash: DummyHash,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            dummy_hash: DummyHash::with_cost(bcrypt::DEFAULT_COST),
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn register(&self, user: NewUser) -> Result<UserRecord, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await?;
        if exists {
            return Err(AuthError::EmailAlreadyExists.into());
        }

        let password_hash = hash_password(&user.password)?;

        let inserted = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        // Lost a race with a concurrent registration of the same email
        match inserted.map_err(AppError::from) {
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_))) => {
                Err(AuthError::EmailAlreadyExists.into())
            }
            other => other,
        }
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String)>(
            "SELECT id, name, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((id, name, email, hash)) if verify_password(password, &hash)? => {
                Ok(Some(UserRecord { id, name, email }))
            }
            Some(_) => Ok(None),
            None => {
                self.dummy_hash.verify(password);
                Ok(None)
            }
        }
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, AppError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

/// `refresh_tokens` table backed by Postgres
#[derive(Clone)]
pub struct PgRefreshTokenLedger {
    pool: PgPool,
}

impl PgRefreshTokenLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_REFRESH_TOKEN: &str = r#"
    INSERT INTO refresh_tokens (user_id, token, jwt_id, is_used, is_revoked, added_date, expiry_date)
    VALUES ($1, $2, $3, false, false, $4, $5)
    RETURNING id, user_id, token, jwt_id, is_used, is_revoked, added_date, expiry_date
"#;

#[async_trait]
impl RefreshTokenLedger for PgRefreshTokenLedger {
    async fn insert(&self, record: NewRefreshToken) -> Result<RefreshTokenRecord, AppError> {
        let stored = sqlx::query_as::<_, RefreshTokenRecord>(INSERT_REFRESH_TOKEN)
            .bind(record.user_id)
            .bind(&record.token)
            .bind(&record.jwt_id)
            .bind(record.added_date)
            .bind(record.expiry_date)
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn find_by_token(&self, secret: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token, jwt_id, is_used, is_revoked, added_date, expiry_date
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(hash_token(secret))
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn redeem(
        &self,
        secret: &str,
        replacement: NewRefreshToken,
    ) -> Result<Redemption, AppError> {
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_used = true
            WHERE token = $1 AND is_used = false AND is_revoked = false
            "#,
        )
        .bind(hash_token(secret))
        .execute(&mut tx)
        .await?;

        if marked.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(Redemption::Conflict);
        }

        let stored = sqlx::query_as::<_, RefreshTokenRecord>(INSERT_REFRESH_TOKEN)
            .bind(replacement.user_id)
            .bind(&replacement.token)
            .bind(&replacement.jwt_id)
            .bind(replacement.added_date)
            .bind(replacement.expiry_date)
            .fetch_one(&mut tx)
            .await?;

        tx.commit().await?;
        Ok(Redemption::Redeemed(stored))
    }

    async fn revoke(&self, secret: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE refresh_tokens SET is_revoked = true WHERE token = $1")
            .bind(hash_token(secret))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = true WHERE user_id = $1 AND is_revoked = false",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user_id, revoked = result.rows_affected(), "Refresh tokens revoked for user");
        Ok(result.rows_affected())
    }
}
