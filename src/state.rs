//! # Application State
//!
//! Shared state handed to every request handler. Axum clones it per
//! request, which only bumps reference counts.
//!
//! The stores and the verification engine are trait objects, so the
//! binary can pick a backend at startup and tests can inject their own.

use std::sync::Arc;

use crate::config::Config;
use crate::db::{
    ChallengeStore, CredentialStore, MemoryChallengeStore, MemoryCredentialStore,
    SqliteCredentialStore,
};
use crate::webauthn::engine::{VerificationEngine, WebAuthnEngine};
use crate::webauthn::relying_party::RelyingParty;

#[derive(Clone)]
pub struct AppState {
    /// RP identity, accepted origins, and challenge validity window
    pub rp: Arc<RelyingParty>,

    /// Pending challenges, one per principal
    pub challenges: Arc<dyn ChallengeStore>,

    /// Registered credentials, one per principal
    pub credentials: Arc<dyn CredentialStore>,

    pub engine: Arc<dyn VerificationEngine>,
}

impl AppState {
    /// Build state from configuration
    ///
    /// Credentials go to SQLite when `DATABASE_URL` is set (migrations run
    /// on connect), otherwise to memory. Pending challenges are always held
    /// in memory: they are short-lived and a restart invalidating them is
    /// harmless.
    ///
    /// # Errors
    /// Returns an error if an origin is malformed, no web origin is
    /// configured, or the database cannot be opened or migrated.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let rp = RelyingParty::from_config(config)?;

        let credentials: Arc<dyn CredentialStore> = match &config.database_url {
            Some(url) => Arc::new(SqliteCredentialStore::connect(url).await?),
            None => {
                tracing::warn!(
                    "DATABASE_URL not set; registered credentials are kept in memory only"
                );
                Arc::new(MemoryCredentialStore::new())
            }
        };

        Ok(Self {
            challenges: Arc::new(MemoryChallengeStore::new()),
            credentials,
            engine: Arc::new(WebAuthnEngine::new(&rp)?),
            rp: Arc::new(rp),
        })
    }

    /// Fully in-memory state with the bundled engine.
    pub fn in_memory(rp: RelyingParty) -> anyhow::Result<Self> {
        Ok(Self {
            engine: Arc::new(WebAuthnEngine::new(&rp)?),
            rp: Arc::new(rp),
            challenges: Arc::new(MemoryChallengeStore::new()),
            credentials: Arc::new(MemoryCredentialStore::new()),
        })
    }

    /// Replace the verification engine.
    pub fn with_engine(mut self, engine: Arc<dyn VerificationEngine>) -> Self {
        self.engine = engine;
        self
    }
}
