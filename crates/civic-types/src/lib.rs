//! Shared type definitions for the civic events API.
//!
//! This crate is the single source of truth for the records the API reads,
//! writes, and returns. Types flow downstream to `TypeScript` via `ts-rs`
//! for the public web client.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers for events and scraper configurations
//! - [`enums`] -- Government level and validated state codes
//! - [`structs`] -- Event, bill, shaped output, scraper config, cache records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Level, ParseCodeError, STATE_CODES, StateCode};
pub use ids::{EventId, ScraperConfigId};
pub use structs::{
    AssociationChanges, Bill, CacheEntry, CacheInfo, EventDraft, EventRecord, EventUpdate,
    NewEvent, NewScraperConfig, ScraperConfig, ShapedEvent,
};
