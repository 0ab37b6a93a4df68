use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{CredentialStore, NewUser, Redemption, RefreshTokenLedger, UserRecord};
use crate::auth::{hash_password_with_cost, hash_token, verify_password, DummyHash};
use crate::auth::{NewRefreshToken, RefreshTokenRecord};
use crate::error::{AppError, AuthError, DatabaseError};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::Database(DatabaseError::Poisoned(what.to_string())))
}

struct StoredUser {
    record: UserRecord,
    password_hash: String,
}

/// Users kept in process memory, keyed by email
pub struct InMemoryCredentialStore {
    users: Mutex<HashMap<String, StoredUser>>,
    hash_cost: u32,
    dummy_hash: DummyHash,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::with_hash_cost(bcrypt::DEFAULT_COST)
    }

    /// Lower bcrypt costs keep test suites fast
    pub fn with_hash_cost(hash_cost: u32) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            hash_cost,
            dummy_hash: DummyHash::with_cost(hash_cost),
        }
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn register(&self, user: NewUser) -> Result<UserRecord, AppError> {
        if lock(&self.users, "users")?.contains_key(&user.email) {
            return Err(AuthError::EmailAlreadyExists.into());
        }

        let password_hash = hash_password_with_cost(&user.password, self.hash_cost)?;
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
        };

        let mut users = lock(&self.users, "users")?;
        if users.contains_key(&record.email) {
            return Err(AuthError::EmailAlreadyExists.into());
        }
        users.insert(
            record.email.clone(),
            StoredUser {
                record: record.clone(),
                password_hash,
            },
        );
        Ok(record)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AppError> {
        let stored = lock(&self.users, "users")?
            .get(email)
            .map(|u| (u.record.clone(), u.password_hash.clone()));

        match stored {
            Some((record, hash)) if verify_password(password, &hash)? => Ok(Some(record)),
            Some(_) => Ok(None),
            None => {
                self.dummy_hash.verify(password);
                Ok(None)
            }
        }
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, AppError> {
        Ok(lock(&self.users, "users")?
            .values()
            .find(|u| u.record.id == user_id)
            .map(|u| u.record.clone()))
    }
}

#[derive(Default)]
struct LedgerTable {
    next_id: i64,
    records: HashMap<String, RefreshTokenRecord>,
}

impl LedgerTable {
    fn insert(&mut self, record: NewRefreshToken) -> Result<RefreshTokenRecord, AppError> {
        if self.records.contains_key(&record.token) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "refresh_tokens.token".to_string(),
            )));
        }
        self.next_id += 1;
        let record = record.into_record(self.next_id);
        self.records.insert(record.token.clone(), record.clone());
        Ok(record)
    }
}

/// Refresh token records kept in process memory.
///
/// Every operation runs under one mutex, which makes redemption a
/// compare-and-set.
#[derive(Default)]
pub struct InMemoryRefreshTokenLedger {
    table: Mutex<LedgerTable>,
}

impl InMemoryRefreshTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of a user, oldest first
    pub fn records_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, AppError> {
        let mut records: Vec<_> = lock(&self.table, "refresh_tokens")?
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

#[async_trait]
impl RefreshTokenLedger for InMemoryRefreshTokenLedger {
    async fn insert(&self, record: NewRefreshToken) -> Result<RefreshTokenRecord, AppError> {
        lock(&self.table, "refresh_tokens")?.insert(record)
    }

    async fn find_by_token(&self, secret: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(lock(&self.table, "refresh_tokens")?
            .records
            .get(&hash_token(secret))
            .cloned())
    }

    async fn redeem(
        &self,
        secret: &str,
        replacement: NewRefreshToken,
    ) -> Result<Redemption, AppError> {
        let mut table = lock(&self.table, "refresh_tokens")?;
        let key = hash_token(secret);

        match table.records.get(&key) {
            Some(current) if !current.is_used && !current.is_revoked => {}
            _ => return Ok(Redemption::Conflict),
        }
        if table.records.contains_key(&replacement.token) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "refresh_tokens.token".to_string(),
            )));
        }

        if let Some(current) = table.records.get_mut(&key) {
            current.is_used = true;
        }
        let inserted = table.insert(replacement)?;
        Ok(Redemption::Redeemed(inserted))
    }

    async fn revoke(&self, secret: &str) -> Result<bool, AppError> {
        let mut table = lock(&self.table, "refresh_tokens")?;
        match table.records.get_mut(&hash_token(secret)) {
            Some(record) => {
                record.is_revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut table = lock(&self.table, "refresh_tokens")?;
        let mut revoked = 0;
        for record in table
            .records
            .values_mut()
            .filter(|r| r.user_id == user_id && !r.is_revoked)
        {
            record.is_revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }
}
