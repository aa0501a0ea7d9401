//! Ceremony endpoints.
//!
//! Handlers only validate the principal, decode `data`, and shape the
//! response; the ceremony logic lives in [`crate::webauthn`].

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::state::AppState;
use crate::webauthn::types::{
    principal, AuthenticationResponse, AuthenticationStartRequest, FinishRequest,
    RegistrationResponse, RegistrationStartRequest,
};
use crate::webauthn::{authentication, registration};

// Registration endpoints

/// POST /register/start
///
/// Returns the bare `PublicKeyCredentialCreationOptions`, ready for
/// `navigator.credentials.create({ publicKey })`.
pub async fn register_start(
    State(state): State<AppState>,
    Json(req): Json<RegistrationStartRequest>,
) -> AppResult<Json<Value>> {
    let username = principal(&req.username)?;
    let options =
        registration::start_registration(&state, username, req.display_name.as_deref()).await?;

    Ok(Json(json!(options.public_key)))
}

/// POST /register/finish
///
/// `{"status": true}` once the credential is stored. A response that is
/// well formed but does not verify gets `{"status": false}` with 400, a
/// client error like every other rejected registration.
pub async fn register_finish(
    State(state): State<AppState>,
    Json(req): Json<FinishRequest>,
) -> AppResult<Response> {
    let username = principal(&req.username)?;
    let response: RegistrationResponse = req.credential()?;

    let verified = registration::finish_registration(&state, username, &response).await?;
    let status = if verified {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    Ok((status, Json(json!({ "status": verified }))).into_response())
}

// Authentication endpoints

/// POST /login/start
pub async fn login_start(
    State(state): State<AppState>,
    Json(req): Json<AuthenticationStartRequest>,
) -> AppResult<Json<Value>> {
    let username = principal(&req.username)?;
    let options = authentication::start_authentication(&state, username).await?;

    Ok(Json(json!(options.public_key)))
}

/// POST /login/finish
pub async fn login_finish(
    State(state): State<AppState>,
    Json(req): Json<FinishRequest>,
) -> AppResult<Json<Value>> {
    let username = principal(&req.username)?;
    let response: AuthenticationResponse = req.credential()?;

    let verified = authentication::finish_authentication(&state, username, &response).await?;

    Ok(Json(json!({ "verified": verified })))
}
