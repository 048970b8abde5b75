//! Process-local stores for development and tests.
//!
//! These mirror the `PostgreSQL` stores operation for operation, including
//! filter push-down before shaping and cascade on delete, so the HTTP
//! layer behaves identically against either backend. State lives behind a
//! [`tokio::sync::RwLock`] shared by clones.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use civic_core::filter::{EventFilter, SortOrder};
use civic_core::shape::{AgendaSummaryRow, BillRow, ChildRows, TagRow, shape_events};
use civic_types::{
    Bill, EventDraft, EventId, EventRecord, EventUpdate, NewScraperConfig, ScraperConfig,
    ScraperConfigId, ShapedEvent,
};
use tokio::sync::RwLock;

use crate::error::DbError;

#[derive(Debug, Default)]
struct EventTables {
    events: Vec<EventRecord>,
    bills: Vec<BillRow>,
    tags: Vec<TagRow>,
    summaries: Vec<AgendaSummaryRow>,
}

impl EventTables {
    /// Child rows belonging to `parents`, in stored order.
    fn children_of(&self, parents: &[EventRecord]) -> ChildRows {
        let ids: HashSet<&EventId> = parents.iter().map(|e| &e.id).collect();
        ChildRows {
            bills: self
                .bills
                .iter()
                .filter(|r| ids.contains(&r.event_id))
                .cloned()
                .collect(),
            tags: self
                .tags
                .iter()
                .filter(|r| ids.contains(&r.event_id))
                .cloned()
                .collect(),
            agenda_summaries: self
                .summaries
                .iter()
                .filter(|r| ids.contains(&r.event_id))
                .cloned()
                .collect(),
        }
    }

    fn shaped(&self, id: &EventId) -> Option<ShapedEvent> {
        let parent = self.events.iter().find(|e| &e.id == id)?.clone();
        let parents = vec![parent];
        let children = self.children_of(&parents);
        shape_events(parents, children).into_iter().next()
    }

    fn replace_bills(&mut self, id: &EventId, bills: Vec<Bill>) {
        self.bills.retain(|r| &r.event_id != id);
        self.bills.extend(bills.into_iter().map(|bill| BillRow {
            event_id: id.clone(),
            bill,
        }));
    }

    fn replace_tags(&mut self, id: &EventId, tags: Vec<String>) {
        self.tags.retain(|r| &r.event_id != id);
        self.tags.extend(tags.into_iter().map(|tag| TagRow {
            event_id: id.clone(),
            tag: Some(tag),
        }));
    }
}

/// In-memory counterpart of [`EventStore`](crate::EventStore).
#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    tables: Arc<RwLock<EventTables>>,
}

impl MemoryEventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// List events matching `filter`, shaped with their children.
    pub async fn list(&self, filter: &EventFilter) -> Vec<ShapedEvent> {
        let tables = self.tables.read().await;
        let mut parents: Vec<EventRecord> = tables
            .events
            .iter()
            .filter(|e| matches_filter(filter, e))
            .cloned()
            .collect();
        parents.sort_by(|a, b| compare_events(filter, a, b));
        parents.truncate(usize::try_from(filter.limit).unwrap_or(usize::MAX));

        let children = tables.children_of(&parents);
        shape_events(parents, children)
    }

    /// Fetch one shaped event by id.
    pub async fn get(&self, id: &EventId) -> Option<ShapedEvent> {
        self.tables.read().await.shaped(id)
    }

    /// Insert an event with its bills and tags.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] if the id is already taken.
    pub async fn create(&self, draft: EventDraft) -> Result<ShapedEvent, DbError> {
        let EventDraft { event, bills, tags } = draft;
        let mut tables = self.tables.write().await;
        if tables.events.iter().any(|e| e.id == event.id) {
            return Err(DbError::Conflict(format!("event {}", event.id)));
        }

        let id = event.id.clone();
        tables.events.push(event);
        tables.replace_bills(&id, bills);
        tables.replace_tags(&id, tags);

        tables
            .shaped(&id)
            .ok_or_else(|| DbError::CorruptRow(format!("event {id} vanished after insert")))
    }

    /// Merge `update` into the stored event. Returns `None` when no event
    /// has that id.
    pub async fn update(&self, id: &EventId, update: EventUpdate) -> Option<ShapedEvent> {
        let mut tables = self.tables.write().await;
        let record = tables.events.iter_mut().find(|e| &e.id == id)?;
        let changes = update.apply(record);

        if let Some(bills) = changes.bills {
            tables.replace_bills(id, bills);
        }
        if let Some(tags) = changes.tags {
            tables.replace_tags(id, tags);
        }
        tables.shaped(id)
    }

    /// Delete an event and its children. Returns whether it existed.
    pub async fn delete(&self, id: &EventId) -> bool {
        let mut tables = self.tables.write().await;
        let before = tables.events.len();
        tables.events.retain(|e| &e.id != id);
        let deleted = tables.events.len() < before;
        if deleted {
            tables.bills.retain(|r| &r.event_id != id);
            tables.tags.retain(|r| &r.event_id != id);
            tables.summaries.retain(|r| &r.event_id != id);
        }
        deleted
    }

    /// Record a generated agenda summary for an event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the event does not exist.
    pub async fn add_agenda_summary(
        &self,
        id: &EventId,
        summary: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if !tables.events.iter().any(|e| &e.id == id) {
            return Err(DbError::NotFound(format!("event {id}")));
        }
        tables.summaries.push(AgendaSummaryRow {
            event_id: id.clone(),
            summary: summary.map(str::to_owned),
            created_at,
        });
        Ok(())
    }
}

fn matches_filter(filter: &EventFilter, event: &EventRecord) -> bool {
    if filter
        .state
        .as_ref()
        .is_some_and(|state| state.as_str() != event.state)
    {
        return false;
    }
    if filter.from_date.is_some_and(|from| event.date < from) {
        return false;
    }
    if filter.level.is_some() && filter.level != event.level {
        return false;
    }
    match (filter.near, event.lat, event.lng) {
        (None, _, _) => true,
        (Some(near), Some(lat), Some(lng)) => near.contains(lat, lng),
        (Some(_), _, _) => false,
    }
}

/// Ordering matching the SQL `ORDER BY` clauses: date and time with
/// missing times last, distance first when searching by location, id as
/// the final tie-break.
fn compare_events(filter: &EventFilter, a: &EventRecord, b: &EventRecord) -> Ordering {
    let ascending = || {
        a.date
            .cmp(&b.date)
            .then_with(|| compare_times(a.time.as_deref(), b.time.as_deref(), false))
    };

    let primary = match (filter.order, filter.near) {
        (SortOrder::Nearest, Some(near)) => {
            let distance = |e: &EventRecord| match (e.lat, e.lng) {
                (Some(lat), Some(lng)) => near.distance_miles(lat, lng),
                _ => f64::INFINITY,
            };
            distance(a).total_cmp(&distance(b)).then_with(ascending)
        }
        (SortOrder::DateDescending, _) => b
            .date
            .cmp(&a.date)
            .then_with(|| compare_times(a.time.as_deref(), b.time.as_deref(), true)),
        _ => ascending(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

fn compare_times(a: Option<&str>, b: Option<&str>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(a),
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// In-memory counterpart of
/// [`ScraperConfigStore`](crate::ScraperConfigStore).
#[derive(Debug, Clone, Default)]
pub struct MemoryScraperConfigStore {
    configs: Arc<RwLock<Vec<ScraperConfig>>>,
}

impl MemoryScraperConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All configurations, newest first.
    pub async fn list(&self) -> Vec<ScraperConfig> {
        let mut configs = self.configs.read().await.clone();
        configs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        configs
    }

    /// One configuration by id.
    pub async fn get(&self, id: ScraperConfigId) -> Option<ScraperConfig> {
        self.configs
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Insert a new configuration with a fresh id.
    pub async fn create(&self, input: NewScraperConfig) -> ScraperConfig {
        let now = Utc::now();
        let config = ScraperConfig {
            id: ScraperConfigId::new(),
            name: input.name,
            url: input.url,
            fields: input.fields,
            ai_fields: input.ai_fields,
            storage: input.storage,
            enabled: input.enabled,
            created_at: now,
            updated_at: now,
        };
        self.configs.write().await.push(config.clone());
        config
    }

    /// Replace every user-editable field. Returns `None` for an unknown id.
    pub async fn replace(
        &self,
        id: ScraperConfigId,
        input: NewScraperConfig,
    ) -> Option<ScraperConfig> {
        let mut configs = self.configs.write().await;
        let config = configs.iter_mut().find(|c| c.id == id)?;
        config.name = input.name;
        config.url = input.url;
        config.fields = input.fields;
        config.ai_fields = input.ai_fields;
        config.storage = input.storage;
        config.enabled = input.enabled;
        config.updated_at = Utc::now();
        Some(config.clone())
    }

    /// Delete a configuration. Returns whether it existed.
    pub async fn delete(&self, id: ScraperConfigId) -> bool {
        let mut configs = self.configs.write().await;
        let before = configs.len();
        configs.retain(|c| c.id != id);
        configs.len() < before
    }
}
