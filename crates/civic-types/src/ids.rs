//! Typed identifier wrappers.
//!
//! Event identifiers are opaque strings assigned by the ingestion process
//! (scrapers emit ids such as `ca-senate-judiciary-2025-03-04`). Scraper
//! configurations are owned by this service and use UUID v7 so that
//! listings sort by creation time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Identifier of a civic event (meeting or hearing).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct EventId(pub String);

impl EventId {
    /// Generate a fresh identifier for an event created through the admin API.
    pub fn generate() -> Self {
        Self(format!("evt-{}", Uuid::now_v7().simple()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Identifier of a persisted scraper configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct ScraperConfigId(pub Uuid);

impl ScraperConfigId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ScraperConfigId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ScraperConfigId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ScraperConfigId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<ScraperConfigId> for Uuid {
    fn from(id: ScraperConfigId) -> Self {
        id.0
    }
}
