//! # Configuration Management
//!
//! Configuration comes from the environment (with an optional `.env` file).
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8080)
//! - `DATABASE_URL`: SQLite connection string for credential persistence.
//!   When unset, credentials live in memory for the lifetime of the process.
//! - `RP_ID`: WebAuthn Relying Party ID (usually your domain)
//! - `RP_NAME`: Human-readable name for your service
//! - `RP_ORIGINS`: Comma-separated list of accepted origins. Web origins
//!   (`https://example.com`) and Android app origins
//!   (`android:apk-key-hash:<hash>`) may be mixed.
//! - `CHALLENGE_TTL_SECS`: Validity window for pending challenges. When
//!   unset, finish never rejects a challenge as expired, but the cleanup
//!   task still drops challenges older than [`STALE_CHALLENGE_AGE`] so
//!   abandoned ceremonies cannot pile up.

use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

/// Age at which an unconsumed challenge is swept when no validity window
/// is configured.
pub const STALE_CHALLENGE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Bounds on how often the cleanup task runs.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
pub const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Application configuration
///
/// ## WebAuthn Terminology
/// - **RP (Relying Party)**: this server, which relies on the authenticator
/// - **RP ID**: the domain credentials are scoped to (e.g. "example.com")
/// - **Origins**: every origin a client may legitimately call us from
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// SQLite database connection URL, e.g. "sqlite:passkey.db?mode=rwc"
    pub database_url: Option<String>,

    /// WebAuthn Relying Party ID
    pub rp_id: String,

    /// Human-readable name shown to users during passkey creation
    pub rp_name: String,

    /// Accepted client origins, checked on every verify
    pub rp_origins: Vec<String>,

    /// How long a pending challenge stays redeemable (`None` = no expiry)
    pub challenge_ttl: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// ## Example .env file
    /// ```text
    /// HOST=127.0.0.1
    /// PORT=8080
    /// RP_ID=localhost
    /// RP_NAME=Passkey RP
    /// RP_ORIGINS=http://localhost:8080
    /// CHALLENGE_TTL_SECS=300
    /// ```
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a valid port number")?;

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());

        let rp_origins = parse_origins(
            &env::var("RP_ORIGINS").unwrap_or_else(|_| "http://localhost:8080".to_string()),
        );

        let challenge_ttl = match env::var("CHALLENGE_TTL_SECS") {
            Ok(raw) if !raw.trim().is_empty() => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .context("CHALLENGE_TTL_SECS must be a whole number of seconds")?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            database_url,
            rp_id: env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string()),
            rp_name: env::var("RP_NAME").unwrap_or_else(|_| "Passkey RP".to_string()),
            rp_origins,
            challenge_ttl,
        };
        config.validate()?;

        Ok(config)
    }

    /// Reject configurations no ceremony could ever succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.rp_id.trim().is_empty() {
            bail!("RP_ID must not be empty");
        }
        if self.rp_origins.is_empty() {
            bail!("RP_ORIGINS must list at least one origin");
        }
        if self.challenge_ttl == Some(Duration::ZERO) {
            bail!("CHALLENGE_TTL_SECS must be greater than zero");
        }
        Ok(())
    }

    /// Age after which the cleanup task drops a pending challenge.
    pub fn sweep_after(&self) -> Duration {
        self.challenge_ttl.unwrap_or(STALE_CHALLENGE_AGE)
    }

    /// Period of the cleanup task.
    pub fn cleanup_interval(&self) -> Duration {
        self.sweep_after()
            .clamp(MIN_CLEANUP_INTERVAL, MAX_CLEANUP_INTERVAL)
    }

    /// Socket address to bind to, e.g. "127.0.0.1:8080"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
