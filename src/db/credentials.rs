//! # Credential Storage
//!
//! Two interchangeable backends behind [`CredentialStore`]:
//! - [`SqliteCredentialStore`]: survives restarts (selected by `DATABASE_URL`)
//! - [`MemoryCredentialStore`]: process lifetime only (development, tests)
//!
//! ## Security Note
//! Only public keys are stored - private keys never leave the user's device.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::SqlitePool;

use super::models::{CounterUpdate, Credential, CredentialRow};
use super::CredentialStore;
use crate::error::AppResult;

/// Insert or replace the credential bound to `username`
///
/// Re-registration replaces the previous credential; there is at most one
/// row per principal.
pub async fn save_credential(
    pool: &SqlitePool,
    username: &str,
    credential: &Credential,
) -> AppResult<()> {
    let transports_json = serde_json::to_string(&credential.transports)?;

    sqlx::query(
        "INSERT INTO credentials
         (username, credential_id, public_key, sign_count, transports, created_at, last_used_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(username) DO UPDATE SET
             credential_id = excluded.credential_id,
             public_key = excluded.public_key,
             sign_count = excluded.sign_count,
             transports = excluded.transports,
             created_at = excluded.created_at,
             last_used_at = excluded.last_used_at",
    )
    .bind(username)
    .bind(&credential.credential_id)
    .bind(&credential.public_key)
    .bind(i64::from(credential.sign_count))
    .bind(transports_json)
    .bind(credential.created_at.to_rfc3339())
    .bind(credential.last_used_at.map(|ts| ts.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a verified login (counter, refreshed passkey, last use)
///
/// Matches on both username and credential id, so a row replaced by a
/// re-registration in the meantime is not touched. Returns whether a row
/// was updated.
pub async fn update_counter(
    pool: &SqlitePool,
    username: &str,
    update: &CounterUpdate,
) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE credentials
         SET public_key = ?, sign_count = ?, last_used_at = ?
         WHERE username = ? AND credential_id = ?",
    )
    .bind(&update.public_key)
    .bind(i64::from(update.sign_count))
    .bind(update.used_at.to_rfc3339())
    .bind(username)
    .bind(&update.credential_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Look up the credential registered for `username`
///
/// Returns `None` if the user never completed a registration.
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> AppResult<Option<Credential>> {
    let row = sqlx::query_as::<_, CredentialRow>("SELECT * FROM credentials WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    row.map(Credential::try_from).transpose()
}

pub async fn count(pool: &SqlitePool) -> AppResult<usize> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM credentials")
        .fetch_one(pool)
        .await?;

    Ok(usize::try_from(total).unwrap_or(0))
}

/// SQLite-backed credential store
#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    /// Connect and run the embedded migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get_credential(&self, principal: &str) -> AppResult<Option<Credential>> {
        find_by_username(&self.pool, principal).await
    }

    async fn put_credential(&self, principal: &str, credential: Credential) -> AppResult<()> {
        save_credential(&self.pool, principal, &credential).await
    }

    async fn update_sign_count(&self, principal: &str, update: CounterUpdate) -> AppResult<bool> {
        update_counter(&self.pool, principal, &update).await
    }

    async fn credential_count(&self) -> AppResult<usize> {
        count(&self.pool).await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// In-memory credential store (lost on restart)
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: DashMap<String, Credential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_credential(&self, principal: &str) -> AppResult<Option<Credential>> {
        Ok(self
            .credentials
            .get(principal)
            .map(|entry| entry.value().clone()))
    }

    async fn put_credential(&self, principal: &str, credential: Credential) -> AppResult<()> {
        self.credentials.insert(principal.to_string(), credential);
        Ok(())
    }

    async fn update_sign_count(&self, principal: &str, update: CounterUpdate) -> AppResult<bool> {
        // The shard stays write-locked between the id check and the write.
        match self.credentials.get_mut(principal) {
            Some(mut stored) if stored.credential_id == update.credential_id => {
                stored.public_key = update.public_key;
                stored.sign_count = update.sign_count;
                stored.last_used_at = Some(update.used_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn credential_count(&self) -> AppResult<usize> {
        Ok(self.credentials.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("credentials", &self.credentials.len())
            .finish()
    }
}

/// Credential as it exists right after registration.
#[cfg(test)]
pub(crate) fn sample_credential(id: u8) -> Credential {
    Credential {
        credential_id: vec![id; 16],
        public_key: vec![0xa5, 0x01, 0x02],
        sign_count: 0,
        transports: vec!["internal".to_string()],
        created_at: chrono::Utc::now(),
        last_used_at: None,
    }
}
