//! # Verification Engine
//!
//! The cryptographic half of both ceremonies, behind [`VerificationEngine`]
//! so the orchestrators never touch CBOR, COSE or signatures themselves.
//! [`WebAuthnEngine`] is the bundled implementation on `webauthn-rs`:
//! - `begin_*` draws the challenge and returns the ceremony state that
//!   must come back at finish time
//! - `verify_*` checks the client response against that state (challenge,
//!   origin, RP ID hash, flags, attestation, signature)
//!
//! A verified login also yields the refreshed `Passkey` so the caller can
//! persist the counter `webauthn-rs` tracks inside it.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;
use webauthn_rs::prelude::{
    CreationChallengeResponse, Passkey, PasskeyAuthentication, PasskeyRegistration,
    PublicKeyCredential, RegisterPublicKeyCredential, RequestChallengeResponse, Webauthn,
    WebauthnBuilder, WebauthnError,
};

use super::relying_party::RelyingParty;
use crate::db::models::Credential;

/// Transport hint stored when the client reports none.
pub const DEFAULT_TRANSPORTS: &[&str] = &["internal"];

/// Why a response could not be checked at all, or was bound to something
/// other than this ceremony.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("{0}")]
    Webauthn(#[from] WebauthnError),

    #[error("stored credential cannot be read: {0}")]
    StoredCredential(#[from] serde_json::Error),

    #[error("signature counter went from {stored} to {received}; credential may be cloned")]
    CounterRegression { stored: u32, received: u32 },
}

/// Outcome of a check that ran to completion.
#[derive(Debug)]
pub enum Verdict<T> {
    Verified(T),
    /// Well formed and bound to this ceremony, but the proof does not hold.
    Unverified(String),
}

#[derive(Debug, Clone, Copy)]
pub struct RegistrationCheck<'a> {
    pub response: &'a RegisterPublicKeyCredential,
    pub state: &'a PasskeyRegistration,
}

#[derive(Debug, Clone, Copy)]
pub struct AuthenticationCheck<'a> {
    pub response: &'a PublicKeyCredential,
    pub state: &'a PasskeyAuthentication,
    /// The credential on file when the login was verified.
    pub credential: &'a Credential,
}

/// What a verified assertion tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionOutcome {
    pub sign_count: u32,
    pub user_verified: bool,
    /// Credential material after the assertion, to be written back.
    pub public_key: Vec<u8>,
}

#[async_trait]
pub trait VerificationEngine: Send + Sync {
    /// Creation options plus the state `verify_registration` needs.
    fn begin_registration(
        &self,
        user_handle: Uuid,
        principal: &str,
        display_name: &str,
    ) -> Result<(CreationChallengeResponse, PasskeyRegistration), VerificationError>;

    /// Request options allowing only `credential`, plus the state
    /// `verify_authentication` needs.
    fn begin_authentication(
        &self,
        credential: &Credential,
    ) -> Result<(RequestChallengeResponse, PasskeyAuthentication), VerificationError>;

    async fn verify_registration(
        &self,
        check: RegistrationCheck<'_>,
    ) -> Result<Verdict<Credential>, VerificationError>;

    async fn verify_authentication(
        &self,
        check: AuthenticationCheck<'_>,
    ) -> Result<Verdict<AssertionOutcome>, VerificationError>;
}

pub struct WebAuthnEngine {
    webauthn: Webauthn,
}

impl WebAuthnEngine {
    /// Build the `webauthn-rs` instance for `rp`.
    ///
    /// The first web origin anchors the RP ID check; every other origin
    /// (Android app origins included) is appended as an extra allowed one.
    pub fn new(rp: &RelyingParty) -> anyhow::Result<Self> {
        let primary = rp
            .web_origin()
            .context("At least one http(s) origin is required")?;

        let mut builder = WebauthnBuilder::new(&rp.id, primary)
            .map_err(|e| anyhow!("Invalid relying party '{}': {:?}", rp.id, e))?
            .rp_name(&rp.name)
            .allow_subdomains(false);
        for origin in rp.origins.iter().filter(|origin| *origin != primary) {
            builder = builder.append_allowed_origin(origin);
        }

        let webauthn = builder
            .build()
            .map_err(|e| anyhow!("Failed to build WebAuthn instance: {:?}", e))?;

        Ok(Self { webauthn })
    }
}

impl std::fmt::Debug for WebAuthnEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebAuthnEngine").finish_non_exhaustive()
    }
}

#[async_trait]
impl VerificationEngine for WebAuthnEngine {
    fn begin_registration(
        &self,
        user_handle: Uuid,
        principal: &str,
        display_name: &str,
    ) -> Result<(CreationChallengeResponse, PasskeyRegistration), VerificationError> {
        Ok(self
            .webauthn
            .start_passkey_registration(user_handle, principal, display_name, None)?)
    }

    fn begin_authentication(
        &self,
        credential: &Credential,
    ) -> Result<(RequestChallengeResponse, PasskeyAuthentication), VerificationError> {
        let passkey: Passkey = serde_json::from_slice(&credential.public_key)?;
        Ok(self.webauthn.start_passkey_authentication(&[passkey])?)
    }

    async fn verify_registration(
        &self,
        check: RegistrationCheck<'_>,
    ) -> Result<Verdict<Credential>, VerificationError> {
        let passkey = self
            .webauthn
            .finish_passkey_registration(check.response, check.state)?;

        Ok(Verdict::Verified(Credential {
            credential_id: passkey.cred_id().to_vec(),
            public_key: serde_json::to_vec(&passkey)?,
            sign_count: 0,
            transports: reported_transports(check.response),
            created_at: Utc::now(),
            last_used_at: None,
        }))
    }

    async fn verify_authentication(
        &self,
        check: AuthenticationCheck<'_>,
    ) -> Result<Verdict<AssertionOutcome>, VerificationError> {
        let result = match self
            .webauthn
            .finish_passkey_authentication(check.response, check.state)
        {
            Ok(result) => result,
            Err(WebauthnError::AuthenticationFailure) => {
                return Ok(Verdict::Unverified(
                    "signature does not match the stored public key".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        // Authenticators without a counter report 0 forever.
        let stored = check.credential.sign_count;
        let received = result.counter();
        if (stored != 0 || received != 0) && received <= stored {
            return Err(VerificationError::CounterRegression { stored, received });
        }

        let mut passkey: Passkey = serde_json::from_slice(&check.credential.public_key)?;
        passkey.update_credential(&result);

        Ok(Verdict::Verified(AssertionOutcome {
            sign_count: received,
            user_verified: result.user_verified(),
            public_key: serde_json::to_vec(&passkey)?,
        }))
    }
}

fn reported_transports(response: &RegisterPublicKeyCredential) -> Vec<String> {
    response
        .response
        .transports
        .as_ref()
        .and_then(|transports| serde_json::to_value(transports).ok())
        .and_then(|value| serde_json::from_value::<Vec<String>>(value).ok())
        .filter(|transports| !transports.is_empty())
        .unwrap_or_else(|| DEFAULT_TRANSPORTS.iter().map(|t| t.to_string()).collect())
}
