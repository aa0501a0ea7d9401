//! # WebAuthn Module
//!
//! The relying-party side of passkey registration and authentication.
//!
//! ## Submodules
//! - `challenge`: transport form of the single-use challenges
//! - `relying_party`: RP identity and allowed origins
//! - `types`: request bodies and client responses
//! - `registration`: creating a credential for a principal
//! - `authentication`: proving possession of a registered credential
//! - `engine`: cryptographic verification of authenticator responses
//!
//! ## Ceremony Flow
//!
//! Both ceremonies share one shape:
//! 1. Start: have the engine draw a challenge, store it with the ceremony
//!    state under the principal, return options
//! 2. The client runs `navigator.credentials.create()` / `.get()`
//! 3. Finish: take the challenge out of the store (it is spent either way),
//!    hand the response to the engine, and mutate the credential store only
//!    on a verified verdict

pub mod authentication;
pub mod challenge;
pub mod encoding;
pub mod engine;
pub mod registration;
pub mod relying_party;
pub mod types;

use chrono::Utc;
use uuid::Uuid;

use crate::db::models::{CeremonyKind, PendingChallenge};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Consume the principal's pending challenge for `kind`.
///
/// The challenge is removed before the validity window is checked, so an
/// expired challenge cannot be retried either.
pub(crate) async fn take_challenge(
    state: &AppState,
    principal: &str,
    kind: CeremonyKind,
) -> AppResult<PendingChallenge> {
    let pending = state
        .challenges
        .take_pending(principal, kind)
        .await?
        .ok_or(AppError::ChallengeMissing)?;

    if pending.is_expired(state.rp.challenge_ttl, Utc::now()) {
        tracing::warn!(username = %principal, ceremony = %kind, "Challenge expired");
        return Err(AppError::ChallengeExpired);
    }

    Ok(pending)
}

/// User handle sent at registration, stable per username.
pub fn user_handle(principal: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, principal.as_bytes())
}
