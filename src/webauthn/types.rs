//! # WebAuthn API Types
//!
//! Request types for the ceremony endpoints. The `PublicKeyCredential`
//! shapes the browser (or platform SDK) produces are the `webauthn-rs` ones.
//!
//! ## API Flow
//! Each ceremony has two steps: start and finish
//! - Start: server issues a challenge inside the options payload
//! - Finish: client returns the authenticator's response for verification

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Body of `POST /register/start`
///
/// ## Example JSON
/// ```json
/// { "username": "alice" }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationStartRequest {
    pub username: String,
    /// Shown by the authenticator during creation; defaults to the username
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
}

/// Body of `POST /login/start`
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticationStartRequest {
    pub username: String,
}

/// Body of both finish endpoints.
///
/// `data` carries the `PublicKeyCredential` JSON. Browser clients
/// send it as a JSON-encoded string; an embedded object works too.
#[derive(Debug, Serialize, Deserialize)]
pub struct FinishRequest {
    pub username: String,
    pub data: Value,
}

impl FinishRequest {
    /// Decode `data` into the expected credential shape.
    pub fn credential<T: DeserializeOwned>(&self) -> AppResult<T> {
        let parsed = match &self.data {
            Value::String(encoded) => serde_json::from_str(encoded),
            other => serde_json::from_value(other.clone()),
        };
        parsed.map_err(|e| AppError::MalformedRequest(format!("Invalid credential data: {}", e)))
    }
}

/// Trimmed username, or `MalformedRequest` if there is nothing left.
pub fn principal(username: &str) -> AppResult<&str> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(AppError::MalformedRequest("username is required".to_string()));
    }
    Ok(trimmed)
}

/// Result of `navigator.credentials.create()`, as `webauthn-rs` reads it.
pub type RegistrationResponse = webauthn_rs::prelude::RegisterPublicKeyCredential;

/// Result of `navigator.credentials.get()`, as `webauthn-rs` reads it.
pub type AuthenticationResponse = webauthn_rs::prelude::PublicKeyCredential;
