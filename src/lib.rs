//! # Passkey Relying-Party Server
//!
//! Issues WebAuthn registration and authentication challenges, verifies the
//! responses authenticators send back, and binds one passkey credential to
//! each username.
//!
//! ## Key Concepts
//! - **Relying Party**: this server, which relies on the authenticator's
//!   signature to decide whether a login is genuine
//! - **Ceremony**: a start/finish exchange around one single-use challenge
//! - **Passkey**: a WebAuthn credential; we only ever see its public key

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod state;
pub mod webauthn;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::auth::{login_finish, login_start, register_finish, register_start};
use crate::handlers::health::health_check;
use crate::state::AppState;

/// Build the application router
///
/// Layers apply bottom-up: tracing sees every request, including CORS
/// preflights.
pub fn create_router(state: AppState) -> Router {
    // Native apps and arbitrary web origins call the API; origin checks
    // happen on the signed client data instead.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Registration (creating a passkey)
        .route("/register/start", post(register_start))
        .route("/register/finish", post(register_finish))
        // Authentication (logging in with a passkey)
        .route("/login/start", post(login_start))
        .route("/login/finish", post(login_finish))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
