//! # Challenge Generator
//!
//! Challenges are drawn by the verification engine when a ceremony starts
//! (32 bytes from a CSPRNG, inside `webauthn-rs`) and travel as unpadded
//! base64url. [`Challenge`] is that transport form, kept next to the
//! ceremony state so the pending slot can be inspected and logged.

use serde::Serialize;

use super::encoding;

/// Number of random bytes behind each challenge (256 bits).
pub const CHALLENGE_LENGTH: usize = 32;

/// An opaque, single-use challenge in its transport encoding.
///
/// Only built from the bytes the engine issued; never parsed from client
/// input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Challenge(String);

impl Challenge {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Challenge(encoding::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
