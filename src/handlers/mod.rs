//! # HTTP Request Handlers
//!
//! ## Submodules
//! - `auth`: registration and login ceremony endpoints
//! - `health`: health check (for monitoring)
//!
//! ## Handler Pattern
//! Handlers are async functions that:
//! 1. Extract the JSON body and shared state
//! 2. Call the ceremony orchestrator
//! 3. Return JSON, or an `AppError` that renders itself

pub mod auth;
pub mod health;
