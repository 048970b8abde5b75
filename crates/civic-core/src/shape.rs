//! Result shaping: nesting child rows under their parent events.
//!
//! Listing endpoints fetch a page of events and then the bills, tags, and
//! agenda summaries belonging to that page. [`shape_events`] correlates the
//! child rows with their parents in one pass per child collection
//! (O(P + C)) and guarantees:
//!
//! - `bills` and `tags` are always arrays, empty when nothing matched
//! - `null` tag placeholders produced by outer-join aggregation are dropped
//! - `agenda_summary` is set only from the latest matching row, and only
//!   when that row carries non-blank text
//!
//! When the database aggregates children itself (`json_agg`/`array_agg`
//! over a `LEFT JOIN`), an event without children comes back as `[null]`
//! or `NULL` rather than `[]`. [`shape_aggregated`] normalizes those
//! artifacts with [`drop_null_artifacts`] and [`bills_from_json`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use civic_types::{Bill, EventId, EventRecord, ShapedEvent};

/// A bill associated with an event, as returned by the batched child query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillRow {
    /// The owning event.
    pub event_id: EventId,
    /// The bill itself.
    pub bill: Bill,
}

/// A tag attached to an event. `tag` is `None` for outer-join placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    /// The owning event.
    pub event_id: EventId,
    /// Tag text.
    pub tag: Option<String>,
}

/// A generated agenda summary for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaSummaryRow {
    /// The owning event.
    pub event_id: EventId,
    /// Summary text; may be `NULL` while generation is pending.
    pub summary: Option<String>,
    /// When the summary row was written. The newest row wins.
    pub created_at: DateTime<Utc>,
}

/// All child rows fetched for one page of parent events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildRows {
    /// Bill associations, in display order.
    pub bills: Vec<BillRow>,
    /// Tags, in display order.
    pub tags: Vec<TagRow>,
    /// Agenda summaries, in any order.
    pub agenda_summaries: Vec<AgendaSummaryRow>,
}

/// An event whose children were aggregated by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedEvent {
    /// The flat event.
    pub event: EventRecord,
    /// `json_agg` output: `NULL`, `[null]`, or an array of bill objects.
    pub bills: serde_json::Value,
    /// `array_agg` output, possibly `{NULL}`.
    pub tags: Vec<Option<String>>,
    /// Latest agenda summary text, if any.
    pub agenda_summary: Option<String>,
}

/// Nest `children` under `parents`, preserving parent order.
///
/// Child rows whose `event_id` matches no parent are ignored.
pub fn shape_events(parents: Vec<EventRecord>, children: ChildRows) -> Vec<ShapedEvent> {
    let mut bills_by_event: HashMap<EventId, Vec<Bill>> = HashMap::new();
    for row in children.bills {
        bills_by_event.entry(row.event_id).or_default().push(row.bill);
    }

    let mut tags_by_event: HashMap<EventId, Vec<String>> = HashMap::new();
    for row in children.tags {
        if let Some(tag) = row.tag {
            tags_by_event.entry(row.event_id).or_default().push(tag);
        }
    }

    let mut latest_summary: HashMap<EventId, (DateTime<Utc>, Option<String>)> = HashMap::new();
    for row in children.agenda_summaries {
        let newer = latest_summary
            .get(&row.event_id)
            .is_none_or(|(seen_at, _)| row.created_at > *seen_at);
        if newer {
            latest_summary.insert(row.event_id, (row.created_at, row.summary));
        }
    }

    parents
        .into_iter()
        .map(|event| {
            let bills = bills_by_event.remove(&event.id).unwrap_or_default();
            let tags = tags_by_event.remove(&event.id).unwrap_or_default();
            let agenda_summary = latest_summary
                .remove(&event.id)
                .and_then(|(_, summary)| non_blank(summary));
            ShapedEvent {
                event,
                bills,
                tags,
                agenda_summary,
            }
        })
        .collect()
}

/// Shape rows whose children were aggregated by the database.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if a bill object in the aggregate does
/// not match the [`Bill`] shape.
pub fn shape_aggregated(rows: Vec<AggregatedEvent>) -> Result<Vec<ShapedEvent>, serde_json::Error> {
    rows.into_iter()
        .map(|row| {
            Ok(ShapedEvent {
                event: row.event,
                bills: bills_from_json(row.bills)?,
                tags: drop_null_artifacts(row.tags),
                agenda_summary: non_blank(row.agenda_summary),
            })
        })
        .collect()
}

/// Remove `None` entries left by outer-join aggregation.
///
/// `[null]` becomes `[]`; real values keep their order.
pub fn drop_null_artifacts<T>(items: Vec<Option<T>>) -> Vec<T> {
    items.into_iter().flatten().collect()
}

/// Decode a `json_agg` bill aggregate, treating `NULL` and `null`
/// elements as absent.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if the value is neither `null` nor an
/// array, or if an element is not a valid [`Bill`].
pub fn bills_from_json(value: serde_json::Value) -> Result<Vec<Bill>, serde_json::Error> {
    let items: Vec<Option<Bill>> = match value {
        serde_json::Value::Null => return Ok(Vec::new()),
        other => serde_json::from_value(other)?,
    };
    Ok(drop_null_artifacts(items))
}

fn non_blank(summary: Option<String>) -> Option<String> {
    summary.filter(|s| !s.trim().is_empty())
}
