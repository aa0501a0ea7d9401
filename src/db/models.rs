//! # Store Models
//!
//! Data structures held by the ceremony stores.
//!
//! - [`PendingChallenge`]: a challenge waiting for its finish call
//! - [`Credential`]: the durable result of a verified registration
//! - [`CredentialRow`]: the SQLite row behind a [`Credential`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use webauthn_rs::prelude::{PasskeyAuthentication, PasskeyRegistration};

use crate::error::AppError;
use crate::webauthn::challenge::Challenge;

/// Which ceremony a pending challenge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl std::fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CeremonyKind::Registration => f.write_str("registration"),
            CeremonyKind::Authentication => f.write_str("authentication"),
        }
    }
}

/// Ceremony state `webauthn-rs` needs back at finish time. It carries the
/// expected challenge along with the policy the options advertised.
pub enum CeremonyState {
    Registration(PasskeyRegistration),
    Authentication(PasskeyAuthentication),
}

impl CeremonyState {
    pub fn kind(&self) -> CeremonyKind {
        match self {
            CeremonyState::Registration(_) => CeremonyKind::Registration,
            CeremonyState::Authentication(_) => CeremonyKind::Authentication,
        }
    }
}

impl std::fmt::Debug for CeremonyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CeremonyState({})", self.kind())
    }
}

/// A challenge issued by a ceremony start and not yet consumed.
///
/// ## Challenge Lifecycle
/// 1. Start issues it and stores it under the principal (replacing any other)
/// 2. Finish takes it out of the store, whatever happens next
/// 3. If a validity window is configured and has passed, finish rejects it
#[derive(Debug)]
pub struct PendingChallenge {
    pub challenge: Challenge,
    pub state: CeremonyState,
    pub issued_at: DateTime<Utc>,
}

impl PendingChallenge {
    /// Stamp a freshly issued challenge with the current time.
    pub fn issue(challenge: Challenge, state: CeremonyState) -> Self {
        Self {
            challenge,
            state,
            issued_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> CeremonyKind {
        self.state.kind()
    }

    /// Whether the challenge is past its validity window at `now`.
    /// Without a window, challenges never expire.
    pub fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        match ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()) {
            Some(window) => now - self.issued_at > window,
            None => false,
        }
    }
}

/// A registered passkey credential bound to one principal.
///
/// Only the public half is ever held here; the private key never leaves
/// the authenticator. `sign_count` and `last_used_at` move together with
/// `public_key` through [`CounterUpdate`], never through a full rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Authenticator-assigned credential identifier
    pub credential_id: Vec<u8>,

    /// Verification material: the `webauthn-rs` `Passkey`, serialized as JSON
    pub public_key: Vec<u8>,

    /// Signature counter (anti-clone). Refreshed after every verified login.
    pub sign_count: u32,

    /// Transport hints for the allow-list, e.g. "internal", "usb", "hybrid"
    pub transports: Vec<String>,

    pub created_at: DateTime<Utc>,

    /// When the credential last produced a verified assertion
    pub last_used_at: Option<DateTime<Utc>>,
}

/// What a verified login changes on the stored credential.
///
/// Applied only while the stored credential still has `credential_id`; a
/// credential replaced mid-login is left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterUpdate {
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub sign_count: u32,
    pub used_at: DateTime<Utc>,
}

/// SQLite row for the `credentials` table.
///
/// Timestamps are RFC3339 text and transports a JSON array, which keeps
/// the schema readable from the sqlite3 shell.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    pub username: String,
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub sign_count: i64,
    pub transports: String,
    pub created_at: String,
    pub last_used_at: Option<String>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = AppError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        let sign_count = u32::try_from(row.sign_count).map_err(|_| {
            AppError::Internal(format!(
                "Stored sign count {} for '{}' is out of range",
                row.sign_count, row.username
            ))
        })?;

        Ok(Credential {
            credential_id: row.credential_id,
            public_key: row.public_key,
            sign_count,
            transports: serde_json::from_str(&row.transports)?,
            created_at: parse_timestamp(&row.created_at)?,
            last_used_at: row
                .last_used_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| AppError::Internal(format!("Invalid stored timestamp '{}'", value)))
}

/// A registration-kind pending challenge issued by a real `webauthn-rs`
/// instance for `localhost`.
#[cfg(test)]
pub(crate) fn registration_pending() -> PendingChallenge {
    use webauthn_rs::prelude::{Url, WebauthnBuilder};

    let origin = Url::parse("http://localhost:8080").unwrap();
    let webauthn = WebauthnBuilder::new("localhost", &origin)
        .unwrap()
        .build()
        .unwrap();
    let (options, state) = webauthn
        .start_passkey_registration(
            crate::webauthn::user_handle("alice"),
            "alice",
            "alice",
            None,
        )
        .unwrap();

    PendingChallenge::issue(
        Challenge::from_bytes(&options.public_key.challenge),
        CeremonyState::Registration(state),
    )
}
