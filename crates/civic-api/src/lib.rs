//! HTTP API for the civic events service.
//!
//! This crate exposes an Axum router over the stores in `civic-db`:
//!
//! - **Public listings** of upcoming events by state or by distance, with
//!   bills, tags, and agenda summaries nested into each event
//! - **Admin endpoints** for creating, editing, and deleting events and
//!   scraper configurations, guarded by an `X-API-Key` header
//! - **Cache endpoints** for inspecting and invalidating scraper output
//!
//! All responses are JSON with camelCase fields. Errors use the shape
//! `{ "error": ..., "message": ... }`.

pub mod admin;
pub mod auth;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod router;
pub mod scraper_configs;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use auth::{API_KEY_HEADER, AdminKey};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
