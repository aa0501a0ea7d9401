//! # Health Check Handler
//!
//! Liveness plus a glance at the ceremony stores.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::state::AppState;

/// Health check endpoint
///
/// ## Route
/// GET /health
///
/// ## Response
/// ```json
/// {
///   "status": "healthy",
///   "service": "passkey-rp-server",
///   "credential_store": "sqlite",
///   "credentials": 3,
///   "pending_challenges": 1
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let credentials = state.credentials.credential_count().await?;
    let pending_challenges = state.challenges.pending_count().await?;

    Ok(Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "credential_store": state.credentials.backend(),
        "credentials": credentials,
        "pending_challenges": pending_challenges,
    })))
}
