//! # Error Handling
//!
//! Custom error types for the relying party and their conversion into HTTP
//! responses. Every ceremony failure is recoverable at the request boundary:
//! the client gets a structured `{ "error", "code" }` body and the server
//! keeps serving.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type
///
/// The first five variants are the ceremony taxonomy; the rest are
/// infrastructure failures whose details are logged but never sent to
/// clients.
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication requested for a principal with no credential on file
    #[error("No passkey registered for user '{0}'")]
    UnknownPrincipal(String),

    /// No pending challenge: never issued, already consumed, or replaced
    #[error("No pending challenge for this ceremony")]
    ChallengeMissing,

    /// The pending challenge outlived the configured validity window.
    /// It has been consumed; the client must start over.
    #[error("Challenge expired")]
    ChallengeExpired,

    /// The verification engine rejected the authenticator response
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// The request body cannot be parsed into the expected shape
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Credential persistence errors (SQLx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnknownPrincipal(_) => "unknown_principal",
            AppError::ChallengeMissing => "challenge_missing",
            AppError::ChallengeExpired => "challenge_expired",
            AppError::VerificationFailed(_) => "verification_failed",
            AppError::MalformedRequest(_) => "malformed_request",
            AppError::Database(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                "internal"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownPrincipal(_) => StatusCode::NOT_FOUND,
            AppError::ChallengeMissing
            | AppError::VerificationFailed(_)
            | AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ChallengeExpired => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert AppError into an HTTP response
///
/// Infrastructure errors are logged in full and replaced by a generic
/// message; ceremony errors carry their own (safe) reason.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                "Serialization error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
