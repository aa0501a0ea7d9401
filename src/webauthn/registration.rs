//! # Passkey Registration Logic
//!
//! Server side of creating a passkey credential. Registration is a
//! two-step process: start and finish.
//!
//! ## Registration Flow
//! 1. **Start**: the engine draws a challenge; bind it (with its ceremony
//!    state) to the username, send options
//! 2. **Finish**: consume the challenge, verify the attestation, store the
//!    public key
//!
//! ## Security Concepts
//! - **Challenge**: random value the authenticator signs over, proving the
//!   response was produced for this ceremony
//! - **Public Key Cryptography**: we only ever store the public key
//! - **Attestation**: optional statement about the authenticator; checked
//!   by `webauthn-rs`, with no trust-chain policy on top

use webauthn_rs::prelude::CreationChallengeResponse;

use crate::db::models::{CeremonyKind, CeremonyState, PendingChallenge};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

use super::challenge::Challenge;
use super::engine::{RegistrationCheck, Verdict};
use super::types::RegistrationResponse;
use super::{encoding, take_challenge, user_handle};

/// Start the passkey registration process
///
/// Issues a fresh challenge for `principal`, replacing any challenge still
/// pending for it, and returns the creation options for
/// `navigator.credentials.create()`.
///
/// Registering again under an existing username is allowed; a verified
/// finish replaces the old credential.
pub async fn start_registration(
    state: &AppState,
    principal: &str,
    display_name: Option<&str>,
) -> AppResult<CreationChallengeResponse> {
    let display_name = display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(principal);

    let (mut options, ceremony) = state
        .engine
        .begin_registration(user_handle(principal), principal, display_name)
        .map_err(|e| AppError::Internal(format!("Failed to start registration: {}", e)))?;
    options.public_key.timeout = state.rp.timeout_millis();

    let challenge = Challenge::from_bytes(&options.public_key.challenge);
    tracing::debug!(username = %principal, %challenge, "Registration challenge drawn");
    state
        .challenges
        .put_pending(
            principal,
            PendingChallenge::issue(challenge, CeremonyState::Registration(ceremony)),
        )
        .await?;

    tracing::info!(username = %principal, "Registration challenge issued");

    Ok(options)
}

/// Finish the passkey registration process
///
/// ## Flow
/// 1. Take the pending registration challenge (spent from here on)
/// 2. Reject it if the validity window has passed
/// 3. Let the engine verify the attestation against the ceremony state
/// 4. Store the credential, only if the verdict is verified
///
/// ## Returns
/// `true` when the credential was stored, `false` when the response was
/// well formed but did not verify.
///
/// ## Errors
/// - ChallengeMissing: no pending registration challenge
/// - ChallengeExpired: challenge older than the validity window
/// - VerificationFailed: response malformed or bound to something else
pub async fn finish_registration(
    state: &AppState,
    principal: &str,
    response: &RegistrationResponse,
) -> AppResult<bool> {
    let pending = take_challenge(state, principal, CeremonyKind::Registration).await?;
    let CeremonyState::Registration(ceremony) = &pending.state else {
        return Err(AppError::Internal(
            "Registration challenge without registration state".to_string(),
        ));
    };

    let verdict = state
        .engine
        .verify_registration(RegistrationCheck {
            response,
            state: ceremony,
        })
        .await
        .map_err(|e| {
            tracing::warn!(username = %principal, error = %e, "Registration rejected");
            AppError::VerificationFailed(e.to_string())
        })?;

    match verdict {
        Verdict::Verified(credential) => {
            tracing::info!(
                username = %principal,
                credential_id = %encoding::encode(&credential.credential_id),
                "Passkey registered"
            );
            state.credentials.put_credential(principal, credential).await?;
            Ok(true)
        }
        Verdict::Unverified(reason) => {
            tracing::warn!(username = %principal, %reason, "Registration not verified");
            Ok(false)
        }
    }
}
