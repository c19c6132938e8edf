//! Axum HTTP API server for the JobPort job board.
//!
//! This crate provides:
//! - JWT session tokens with live principal resolution
//! - In-process token revocation
//! - Per-resource route trees with role gating
//! - Rate limiting, security headers, and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod revocation;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
