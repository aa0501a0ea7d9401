//! # Pending Challenge Storage
//!
//! Challenges are short-lived and never persisted: they live in a
//! [`DashMap`] keyed by principal. DashMap locks per shard, so two requests
//! for the same principal are serialized while different principals
//! proceed in parallel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::models::{CeremonyKind, PendingChallenge};
use super::ChallengeStore;
use crate::error::AppResult;

#[derive(Default)]
pub struct MemoryChallengeStore {
    pending: DashMap<String, PendingChallenge>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn put_pending(&self, principal: &str, pending: PendingChallenge) -> AppResult<()> {
        if let Some(previous) = self.pending.insert(principal.to_string(), pending) {
            tracing::debug!(
                username = %principal,
                kind = %previous.kind(),
                "Replaced pending challenge"
            );
        }
        Ok(())
    }

    async fn take_pending(
        &self,
        principal: &str,
        kind: CeremonyKind,
    ) -> AppResult<Option<PendingChallenge>> {
        // Compare-and-remove under the shard lock: at most one caller wins.
        Ok(self
            .pending
            .remove_if(principal, |_, pending| pending.kind() == kind)
            .map(|(_, pending)| pending))
    }

    async fn purge_issued_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let mut purged = 0;
        self.pending.retain(|_, pending| {
            let keep = pending.issued_at >= cutoff;
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }

    async fn pending_count(&self) -> AppResult<usize> {
        Ok(self.pending.len())
    }
}

impl std::fmt::Debug for MemoryChallengeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChallengeStore")
            .field("pending", &self.pending.len())
            .finish()
    }
}
