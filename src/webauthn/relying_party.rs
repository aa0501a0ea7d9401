//! Relying-party identity and the origins allowed to run ceremonies.

use std::time::Duration;
use url::Url;

use crate::config::Config;

/// Who we are, which origins may talk to us, and how long a challenge
/// stays redeemable.
#[derive(Debug, Clone)]
pub struct RelyingParty {
    pub id: String,
    pub name: String,
    pub origins: Vec<Url>,
    pub challenge_ttl: Option<Duration>,
}

impl RelyingParty {
    pub fn new(id: impl Into<String>, name: impl Into<String>, origins: Vec<Url>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            origins,
            challenge_ttl: None,
        }
    }

    pub fn with_challenge_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    /// Build from configuration, checking that every origin is well formed.
    ///
    /// Web origins (`https://example.com`) and Android app origins
    /// (`android:apk-key-hash:...`) are both valid URLs.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let origins = config
            .rp_origins
            .iter()
            .map(|origin| {
                Url::parse(origin)
                    .map_err(|e| anyhow::anyhow!("Invalid origin '{}': {}", origin, e))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self::new(&config.rp_id, &config.rp_name, origins)
            .with_challenge_ttl(config.challenge_ttl))
    }

    /// The first `http`/`https` origin. `webauthn-rs` anchors the RP ID
    /// check on it; the rest are appended as extra allowed origins.
    pub fn web_origin(&self) -> Option<&Url> {
        self.origins
            .iter()
            .find(|origin| matches!(origin.scheme(), "http" | "https"))
    }

    /// Client-side timeout hint in milliseconds, matching the validity window.
    pub fn timeout_millis(&self) -> Option<u32> {
        self.challenge_ttl
            .map(|ttl| u32::try_from(ttl.as_millis()).unwrap_or(u32::MAX))
    }
}
