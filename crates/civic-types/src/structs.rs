//! Core record structs: events, bills, shaped API output, scraper configs.
//!
//! Every struct here serializes with camelCase field names, which is the
//! single naming convention of the public API. Input structs additionally
//! accept the snake_case spellings emitted by older ingestion jobs
//! (`details_url`, `source_url`, ...).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::{Validate, ValidationError};

use crate::enums::{Level, StateCode};
use crate::ids::{EventId, ScraperConfigId};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A civic meeting or hearing as stored in the `events` table.
///
/// This is the flat parent record; child data (bills, tags, agenda
/// summary) is attached by the result shaper to produce a [`ShapedEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EventRecord {
    /// Unique event identifier.
    pub id: EventId,
    /// Meeting title.
    pub name: String,
    /// Calendar date of the meeting.
    pub date: NaiveDate,
    /// Start time as published by the source (e.g. `10:00 AM`).
    pub time: Option<String>,
    /// Venue or room name.
    pub location_name: Option<String>,
    /// Latitude of the venue, when geocoded.
    pub lat: Option<f64>,
    /// Longitude of the venue, when geocoded.
    pub lng: Option<f64>,
    /// Level of government, when known.
    pub level: Option<Level>,
    /// Two-letter state or territory code.
    pub state: String,
    /// Name of the committee holding the meeting.
    pub committee_name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Page the event was scraped from.
    pub source_url: Option<String>,
    /// Page with meeting details.
    pub details_url: Option<String>,
    /// Docket page.
    pub docket_url: Option<String>,
    /// Agenda document.
    pub agenda_url: Option<String>,
    /// Link for joining remotely.
    pub virtual_meeting_url: Option<String>,
    /// Whether members of the public may testify or comment.
    pub allows_public_participation: bool,
    /// When the row was first stored.
    pub created_at: DateTime<Utc>,
}

/// A legislative item referenced by an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Bill {
    /// Bill number (e.g. `AB 1234`).
    #[validate(length(min = 1, max = 64))]
    pub number: String,
    /// Short title.
    pub title: Option<String>,
    /// Link to the bill text or status page.
    #[validate(url)]
    pub url: Option<String>,
    /// Plain-language summary.
    pub summary: Option<String>,
}

/// An event with its bills, tags, and agenda summary nested.
///
/// `bills` and `tags` are always present (possibly empty). `agendaSummary`
/// is omitted entirely when there is no non-empty summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ShapedEvent {
    /// The flat event fields.
    #[serde(flatten)]
    pub event: EventRecord,
    /// Bills discussed at the meeting, in association order.
    pub bills: Vec<Bill>,
    /// Free-text labels.
    pub tags: Vec<String>,
    /// Generated summary of the latest agenda.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub agenda_summary: Option<String>,
}

// ---------------------------------------------------------------------------
// Event input
// ---------------------------------------------------------------------------

/// Request body for creating an event through the admin API.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NewEvent {
    /// Caller-chosen id; one is generated when absent.
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub id: Option<String>,
    /// Meeting title.
    #[validate(length(min = 1, max = 500))]
    pub name: String,
    /// Calendar date (`YYYY-MM-DD`).
    pub date: NaiveDate,
    /// Start time text.
    #[serde(default)]
    pub time: Option<String>,
    /// Venue or room name.
    #[serde(default, alias = "location_name", alias = "location")]
    pub location_name: Option<String>,
    /// Latitude.
    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    /// Longitude.
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    /// Level of government.
    #[serde(default)]
    pub level: Option<Level>,
    /// Two-letter state code.
    #[validate(custom(function = "validate_state_code"))]
    pub state: String,
    /// Committee name.
    #[serde(default, alias = "committee_name", alias = "committee")]
    pub committee_name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Source page.
    #[serde(default, alias = "source_url")]
    #[validate(url)]
    pub source_url: Option<String>,
    /// Details page.
    #[serde(default, alias = "details_url")]
    #[validate(url)]
    pub details_url: Option<String>,
    /// Docket page.
    #[serde(default, alias = "docket_url")]
    #[validate(url)]
    pub docket_url: Option<String>,
    /// Agenda document.
    #[serde(default, alias = "agenda_url")]
    #[validate(url)]
    pub agenda_url: Option<String>,
    /// Remote meeting link.
    #[serde(default, alias = "virtual_meeting_url")]
    #[validate(url)]
    pub virtual_meeting_url: Option<String>,
    /// Public participation flag.
    #[serde(default, alias = "allows_public_participation")]
    pub allows_public_participation: bool,
    /// Bills to associate with the event.
    #[serde(default)]
    #[validate(nested)]
    pub bills: Vec<Bill>,
    /// Tags to attach.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An event record together with the child rows to insert alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    /// The flat record.
    pub event: EventRecord,
    /// Bills to associate.
    pub bills: Vec<Bill>,
    /// Tags to attach.
    pub tags: Vec<String>,
}

impl NewEvent {
    /// Turn validated input into a storable draft.
    ///
    /// The state code is upper-cased, blank tags and repeated bill numbers
    /// are dropped, and an id is generated when the caller did not supply
    /// one.
    pub fn into_draft(self, now: DateTime<Utc>) -> EventDraft {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .map_or_else(EventId::generate, EventId::from);
        let state = normalize_state(&self.state);

        EventDraft {
            event: EventRecord {
                id,
                name: self.name,
                date: self.date,
                time: self.time,
                location_name: self.location_name,
                lat: self.lat,
                lng: self.lng,
                level: self.level,
                state,
                committee_name: self.committee_name,
                description: self.description,
                source_url: self.source_url,
                details_url: self.details_url,
                docket_url: self.docket_url,
                agenda_url: self.agenda_url,
                virtual_meeting_url: self.virtual_meeting_url,
                allows_public_participation: self.allows_public_participation,
                created_at: now,
            },
            bills: dedup_bills(self.bills),
            tags: clean_tags(self.tags),
        }
    }
}

/// Request body for `PUT /api/admin-events?id=...`.
///
/// Absent fields keep their stored value. `bills` and `tags`, when
/// present, replace the existing associations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EventUpdate {
    /// New title.
    #[serde(default)]
    #[validate(length(min = 1, max = 500))]
    pub name: Option<String>,
    /// New date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// New start time.
    #[serde(default)]
    pub time: Option<String>,
    /// New venue.
    #[serde(default, alias = "location_name")]
    pub location_name: Option<String>,
    /// New latitude.
    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    /// New longitude.
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    /// New level.
    #[serde(default)]
    pub level: Option<Level>,
    /// New state code.
    #[serde(default)]
    #[validate(custom(function = "validate_state_code"))]
    pub state: Option<String>,
    /// New committee.
    #[serde(default, alias = "committee_name")]
    pub committee_name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New source page.
    #[serde(default, alias = "source_url")]
    #[validate(url)]
    pub source_url: Option<String>,
    /// New details page.
    #[serde(default, alias = "details_url")]
    #[validate(url)]
    pub details_url: Option<String>,
    /// New docket page.
    #[serde(default, alias = "docket_url")]
    #[validate(url)]
    pub docket_url: Option<String>,
    /// New agenda document.
    #[serde(default, alias = "agenda_url")]
    #[validate(url)]
    pub agenda_url: Option<String>,
    /// New remote meeting link.
    #[serde(default, alias = "virtual_meeting_url")]
    #[validate(url)]
    pub virtual_meeting_url: Option<String>,
    /// New participation flag.
    #[serde(default, alias = "allows_public_participation")]
    pub allows_public_participation: Option<bool>,
    /// Replacement bill list.
    #[serde(default)]
    #[validate(nested)]
    pub bills: Option<Vec<Bill>>,
    /// Replacement tag list.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Child associations to replace as part of an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationChanges {
    /// Replacement bills, if any.
    pub bills: Option<Vec<Bill>>,
    /// Replacement tags, if any.
    pub tags: Option<Vec<String>>,
}

impl EventUpdate {
    /// Merge the update into `record` in place and return the association
    /// replacements it carries.
    pub fn apply(self, record: &mut EventRecord) -> AssociationChanges {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(date) = self.date {
            record.date = date;
        }
        if self.time.is_some() {
            record.time = self.time;
        }
        if self.location_name.is_some() {
            record.location_name = self.location_name;
        }
        if self.lat.is_some() {
            record.lat = self.lat;
        }
        if self.lng.is_some() {
            record.lng = self.lng;
        }
        if self.level.is_some() {
            record.level = self.level;
        }
        if let Some(state) = self.state {
            record.state = normalize_state(&state);
        }
        if self.committee_name.is_some() {
            record.committee_name = self.committee_name;
        }
        if self.description.is_some() {
            record.description = self.description;
        }
        if self.source_url.is_some() {
            record.source_url = self.source_url;
        }
        if self.details_url.is_some() {
            record.details_url = self.details_url;
        }
        if self.docket_url.is_some() {
            record.docket_url = self.docket_url;
        }
        if self.agenda_url.is_some() {
            record.agenda_url = self.agenda_url;
        }
        if self.virtual_meeting_url.is_some() {
            record.virtual_meeting_url = self.virtual_meeting_url;
        }
        if let Some(flag) = self.allows_public_participation {
            record.allows_public_participation = flag;
        }

        AssociationChanges {
            bills: self.bills.map(dedup_bills),
            tags: self.tags.map(clean_tags),
        }
    }
}

// ---------------------------------------------------------------------------
// Scraper configuration
// ---------------------------------------------------------------------------

/// A persisted description of how to scrape one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ScraperConfig {
    /// Unique identifier.
    pub id: ScraperConfigId,
    /// Human-readable name.
    pub name: String,
    /// Target page.
    pub url: String,
    /// Field extraction rules (selectors keyed by output field).
    pub fields: serde_json::Value,
    /// Optional AI-assisted extraction rules.
    pub ai_fields: Option<serde_json::Value>,
    /// Where scraped results are written.
    pub storage: serde_json::Value,
    /// Whether the scraper is scheduled.
    pub enabled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing a scraper configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NewScraperConfig {
    /// Human-readable name.
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Target page.
    #[validate(url)]
    pub url: String,
    /// Field extraction rules; must be a JSON object or array.
    #[validate(custom(function = "validate_rule_set"))]
    pub fields: serde_json::Value,
    /// Optional AI-assisted extraction rules.
    #[serde(default, alias = "ai_fields")]
    #[validate(custom(function = "validate_rule_set"))]
    pub ai_fields: Option<serde_json::Value>,
    /// Storage target; must be a JSON object.
    #[serde(default = "default_storage")]
    #[validate(custom(function = "validate_storage"))]
    pub storage: serde_json::Value,
    /// Whether the scraper is scheduled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_storage() -> serde_json::Value {
    serde_json::json!({ "type": "database" })
}

const fn default_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Cache metadata
// ---------------------------------------------------------------------------

/// Metadata about one entry in the scraper result cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CacheEntry {
    /// Full key in the key-value store.
    pub key: String,
    /// When the cached payload was written, if recorded.
    pub cached_at: Option<DateTime<Utc>>,
    /// Remaining time to live; `None` when the key does not expire.
    pub ttl_seconds: Option<i64>,
}

/// Response body of `GET /api/cache-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CacheInfo {
    /// State the listing is scoped to, or `None` for every state.
    pub state: Option<String>,
    /// Number of entries.
    pub count: usize,
    /// The entries, sorted by key.
    pub entries: Vec<CacheEntry>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_state_code(value: &str) -> Result<(), ValidationError> {
    StateCode::parse(value).map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("state_code");
        err.message = Some(e.to_string().into());
        err
    })
}

fn validate_rule_set(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_object() || value.is_array() {
        Ok(())
    } else {
        Err(ValidationError::new("rule_set"))
    }
}

fn validate_storage(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ValidationError::new("storage"))
    }
}

fn normalize_state(raw: &str) -> String {
    StateCode::parse(raw).map_or_else(|_| raw.trim().to_ascii_uppercase(), String::from)
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if !trimmed.is_empty() && !out.iter().any(|t| t == trimmed) {
            out.push(trimmed.to_owned());
        }
    }
    out
}

/// A bill number links to an event at most once; the first entry wins.
fn dedup_bills(bills: Vec<Bill>) -> Vec<Bill> {
    let mut out: Vec<Bill> = Vec::with_capacity(bills.len());
    for bill in bills {
        if !out.iter().any(|b| b.number.trim() == bill.number.trim()) {
            out.push(bill);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn sample_new_event() -> NewEvent {
        serde_json::from_value(serde_json::json!({
            "name": "Senate Judiciary Hearing",
            "date": "2025-03-04",
            "state": "ca",
            "details_url": "https://example.gov/hearing/1",
            "tags": ["housing", " housing ", "", "water"],
        }))
        .expect("fixture should parse")
    }

    #[test]
    fn new_event_accepts_snake_case_aliases() {
        let input = sample_new_event();
        assert_eq!(
            input.details_url.as_deref(),
            Some("https://example.gov/hearing/1")
        );
        assert!(input.validate().is_ok());
    }

    #[test]
    fn new_event_rejects_unknown_state() {
        let mut input = sample_new_event();
        input.state = "ZZ".to_owned();
        assert!(input.validate().is_err());
    }

    #[test]
    fn new_event_rejects_out_of_range_latitude() {
        let mut input = sample_new_event();
        input.lat = Some(123.0);
        assert!(input.validate().is_err());
    }

    #[test]
    fn draft_normalizes_state_and_tags() {
        let draft = sample_new_event().into_draft(Utc::now());
        assert_eq!(draft.event.state, "CA");
        assert_eq!(draft.tags, vec!["housing".to_owned(), "water".to_owned()]);
        assert!(draft.event.id.as_str().starts_with("evt-"));
    }

    #[test]
    fn repeated_bill_numbers_collapse_to_the_first() {
        let mut input = sample_new_event();
        input.bills = serde_json::from_value(serde_json::json!([
            {"number": "AB 1", "title": "Budget Act"},
            {"number": "AB 1", "title": "Duplicate"},
            {"number": "SB 2"},
        ]))
        .expect("fixture should parse");
        let draft = input.into_draft(Utc::now());
        let numbers: Vec<&str> = draft.bills.iter().map(|b| b.number.as_str()).collect();
        assert_eq!(numbers, vec!["AB 1", "SB 2"]);
        assert_eq!(draft.bills.first().and_then(|b| b.title.as_deref()), Some("Budget Act"));

        let mut record = draft.event;
        let repeated = Bill {
            number: "HB 9".to_owned(),
            title: None,
            url: None,
            summary: None,
        };
        let update = EventUpdate {
            bills: Some(vec![repeated.clone(), repeated]),
            ..EventUpdate::default()
        };
        let changes = update.apply(&mut record);
        assert_eq!(changes.bills.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn shaped_event_serializes_camel_case_and_omits_missing_summary() {
        let draft = sample_new_event().into_draft(Utc::now());
        let shaped = ShapedEvent {
            event: draft.event,
            bills: Vec::new(),
            tags: Vec::new(),
            agenda_summary: None,
        };
        let json = serde_json::to_value(&shaped).unwrap_or_default();
        assert_eq!(json["detailsUrl"], "https://example.gov/hearing/1");
        assert!(json.get("details_url").is_none());
        assert_eq!(json["bills"], serde_json::json!([]));
        assert_eq!(json["tags"], serde_json::json!([]));
        assert!(json.get("agendaSummary").is_none());
    }

    #[test]
    fn update_only_touches_present_fields() {
        let mut record = sample_new_event().into_draft(Utc::now()).event;
        let update = EventUpdate {
            name: Some("Rescheduled Hearing".to_owned()),
            tags: Some(vec!["budget".to_owned()]),
            ..EventUpdate::default()
        };
        let changes = update.apply(&mut record);
        assert_eq!(record.name, "Rescheduled Hearing");
        assert_eq!(record.state, "CA");
        assert_eq!(changes.tags, Some(vec!["budget".to_owned()]));
        assert!(changes.bills.is_none());
    }

    #[test]
    fn scraper_config_requires_structured_fields() {
        let bad: NewScraperConfig = serde_json::from_value(serde_json::json!({
            "name": "County board",
            "url": "https://county.example.gov/meetings",
            "fields": "not-a-rule-set",
        }))
        .expect("fixture should parse");
        assert!(bad.validate().is_err());

        let good: NewScraperConfig = serde_json::from_value(serde_json::json!({
            "name": "County board",
            "url": "https://county.example.gov/meetings",
            "fields": { "title": "h2.meeting-title" },
        }))
        .expect("fixture should parse");
        assert!(good.validate().is_ok());
        assert!(good.enabled);
        assert_eq!(good.storage["type"], "database");
    }
}
