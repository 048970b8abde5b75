//! Data layer for the civic events API (`PostgreSQL` + key-value cache).
//!
//! `PostgreSQL` holds events, their bills, tags, and agenda summaries, and
//! the scraper configurations. A Redis-compatible store holds scraper
//! output keyed by state. Every store has an in-memory counterpart so the
//! API runs and is tested without external services.
//!
//! # Architecture
//!
//! ```text
//! HTTP handler
//!     |
//!     +-- EventRepository ---------+-- EventStore (PostgreSQL)
//!     |                            +-- MemoryEventStore
//!     +-- ScraperConfigRepository -+-- ScraperConfigStore (PostgreSQL)
//!     |                            +-- MemoryScraperConfigStore
//!     +-- ScrapeCache -------------+-- KvCache (fred)
//!                                  +-- MemoryCache
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`event_store`] -- Filtered, shaped event queries and admin writes
//! - [`scraper_config_store`] -- Scraper configuration CRUD
//! - [`memory`] -- In-memory stores
//! - [`kv`] -- Redis-compatible scrape cache
//! - [`cache`] -- Cache key layout, in-memory cache, backend dispatch
//! - [`repository`] -- Backend dispatch for the HTTP layer
//! - [`error`] -- Shared error types

pub mod cache;
pub mod error;
pub mod event_store;
pub mod kv;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod scraper_config_store;

// Re-export primary types for convenience.
pub use cache::{CacheKeys, CachedPayload, MemoryCache, ScrapeCache};
pub use error::DbError;
pub use event_store::{EventRow, EventStore};
pub use kv::KvCache;
pub use memory::{MemoryEventStore, MemoryScraperConfigStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use repository::{Backends, EventRepository, ScraperConfigRepository};
pub use scraper_config_store::{ScraperConfigRow, ScraperConfigStore};
