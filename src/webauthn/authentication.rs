//! Passkey authentication (login) ceremony.

use chrono::Utc;
use webauthn_rs::prelude::RequestChallengeResponse;

use crate::db::models::{CeremonyKind, CeremonyState, CounterUpdate, Credential, PendingChallenge};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

use super::challenge::Challenge;
use super::engine::{AuthenticationCheck, Verdict};
use super::types::AuthenticationResponse;
use super::{encoding, take_challenge};

async fn registered_credential(state: &AppState, principal: &str) -> AppResult<Credential> {
    state
        .credentials
        .get_credential(principal)
        .await?
        .ok_or_else(|| AppError::UnknownPrincipal(principal.to_string()))
}

/// Issue a login challenge for a principal with a registered credential.
///
/// Unknown principals get `UnknownPrincipal` and no challenge is stored.
pub async fn start_authentication(
    state: &AppState,
    principal: &str,
) -> AppResult<RequestChallengeResponse> {
    let credential = registered_credential(state, principal).await?;

    let (mut options, ceremony) = state
        .engine
        .begin_authentication(&credential)
        .map_err(|e| AppError::Internal(format!("Failed to start authentication: {}", e)))?;
    options.public_key.timeout = state.rp.timeout_millis();

    let challenge = Challenge::from_bytes(&options.public_key.challenge);
    state
        .challenges
        .put_pending(
            principal,
            PendingChallenge::issue(challenge, CeremonyState::Authentication(ceremony)),
        )
        .await?;

    tracing::info!(username = %principal, "Authentication challenge issued");

    Ok(options)
}

/// Verify an assertion and, if it holds, record the new counter.
///
/// The counter is written only onto the credential the assertion was
/// verified against. If a re-registration replaced it meanwhile, the new
/// credential is kept as is and the login still counts as verified.
pub async fn finish_authentication(
    state: &AppState,
    principal: &str,
    response: &AuthenticationResponse,
) -> AppResult<bool> {
    let credential = registered_credential(state, principal).await?;
    let pending = take_challenge(state, principal, CeremonyKind::Authentication).await?;
    let CeremonyState::Authentication(ceremony) = &pending.state else {
        return Err(AppError::Internal(
            "Authentication challenge without authentication state".to_string(),
        ));
    };

    let verdict = state
        .engine
        .verify_authentication(AuthenticationCheck {
            response,
            state: ceremony,
            credential: &credential,
        })
        .await
        .map_err(|e| {
            tracing::warn!(username = %principal, error = %e, "Authentication rejected");
            AppError::VerificationFailed(e.to_string())
        })?;

    match verdict {
        Verdict::Verified(outcome) => {
            let recorded = state
                .credentials
                .update_sign_count(
                    principal,
                    CounterUpdate {
                        credential_id: credential.credential_id.clone(),
                        public_key: outcome.public_key,
                        sign_count: outcome.sign_count,
                        used_at: Utc::now(),
                    },
                )
                .await?;
            if !recorded {
                tracing::warn!(
                    username = %principal,
                    credential_id = %encoding::encode(&credential.credential_id),
                    "Credential replaced during login; counter not recorded"
                );
            }
            tracing::info!(
                username = %principal,
                sign_count = outcome.sign_count,
                user_verified = outcome.user_verified,
                "Authentication verified"
            );
            Ok(true)
        }
        Verdict::Unverified(reason) => {
            tracing::warn!(username = %principal, %reason, "Authentication not verified");
            Ok(false)
        }
    }
}
