//! Query filtering, result shaping, and configuration for the civic events
//! API.
//!
//! This crate holds the storage-independent logic shared by every event
//! store and by the HTTP layer.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `civic-config.yaml` into
//!   strongly-typed structs, with environment overrides.
//! - [`filter`] -- [`EventFilter`] criteria and query-string parsing.
//! - [`shape`] -- Correlation of bills, tags, and agenda summaries with
//!   their parent events.
//!
//! [`EventFilter`]: filter::EventFilter

pub mod config;
pub mod filter;
pub mod shape;

pub use config::{AppConfig, ConfigError, ShapingStrategy};
pub use filter::{EventFilter, FilterError, GeoRadius, SortOrder};
pub use shape::{
    AgendaSummaryRow, AggregatedEvent, BillRow, ChildRows, TagRow, shape_aggregated,
    shape_events,
};
