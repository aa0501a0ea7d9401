//! # Ceremony Store
//!
//! Per-principal state behind two capability traits, injected into
//! [`AppState`](crate::state::AppState) so backends can be swapped:
//! - `models`: pending challenges and credentials
//! - `challenges`: in-memory pending-challenge store
//! - `credentials`: SQLite and in-memory credential stores
//!
//! Operations on one principal are serialized by the backend; operations
//! on different principals are independent.

pub mod challenges;
pub mod credentials;
pub mod models;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use models::{CeremonyKind, CounterUpdate, Credential, PendingChallenge};

pub use challenges::MemoryChallengeStore;
pub use credentials::{MemoryCredentialStore, SqliteCredentialStore};

/// Pending challenges, at most one per principal.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Store `pending` for `principal`, silently replacing whatever was there.
    async fn put_pending(&self, principal: &str, pending: PendingChallenge) -> AppResult<()>;

    /// Remove and return the pending challenge if it belongs to `kind`.
    ///
    /// Atomic: of any number of concurrent callers, at most one gets `Some`.
    /// A challenge of the other kind is left in place.
    async fn take_pending(
        &self,
        principal: &str,
        kind: CeremonyKind,
    ) -> AppResult<Option<PendingChallenge>>;

    /// Drop challenges issued before `cutoff`, returning how many went.
    async fn purge_issued_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize>;

    async fn pending_count(&self) -> AppResult<usize>;
}

/// Registered credentials, one per principal.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential(&self, principal: &str) -> AppResult<Option<Credential>>;

    /// Insert or replace the credential for `principal`.
    async fn put_credential(&self, principal: &str, credential: Credential) -> AppResult<()>;

    /// Record a verified login on the credential `update` names.
    ///
    /// Writes only if `principal` still holds that credential id and
    /// returns whether it did. A concurrent re-registration therefore wins
    /// over a login that verified against the credential it replaced.
    async fn update_sign_count(&self, principal: &str, update: CounterUpdate) -> AppResult<bool>;

    async fn credential_count(&self) -> AppResult<usize>;

    /// Short backend name for health reporting.
    fn backend(&self) -> &'static str;
}
