//! `PostgreSQL` operations on events and their child rows.
//!
//! Parent filtering (state, date window, level, search radius) is always
//! part of the parent `SELECT`. Child rows are then attached using the
//! configured [`ShapingStrategy`]:
//!
//! - **Batched**: one `= ANY($1)` query per child table, grouped in memory
//!   by [`shape_events`].
//! - **Aggregated**: a single statement with `LEFT JOIN LATERAL` and
//!   `json_agg`/`array_agg`, normalized by [`shape_aggregated`].

use chrono::{DateTime, NaiveDate, Utc};
use civic_core::filter::{EventFilter, GeoRadius, MILES_PER_DEGREE, SortOrder};
use civic_core::shape::{
    AgendaSummaryRow, AggregatedEvent, BillRow, ChildRows, TagRow, shape_aggregated, shape_events,
};
use civic_core::ShapingStrategy;
use civic_types::{Bill, EventDraft, EventId, EventRecord, EventUpdate, Level, ShapedEvent};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::error::DbError;

/// Columns of the `events` table, qualified with the `e` alias.
const EVENT_COLUMNS: &str = "e.id, e.name, e.date, e.time, e.location_name, e.lat, e.lng, \
     e.level, e.state, e.committee_name, e.description, e.source_url, e.details_url, \
     e.docket_url, e.agenda_url, e.virtual_meeting_url, e.allows_public_participation, \
     e.created_at";

/// Child aggregation joins used by the aggregated strategy.
const AGGREGATE_JOINS: &str = r"
    LEFT JOIN LATERAL (
        SELECT json_agg(
                   json_build_object('number', b.number, 'title', b.title, 'url', b.url, 'summary', b.summary)
                   ORDER BY eb.position
               ) AS bills
        FROM event_bills eb
        JOIN bills b ON b.id = eb.bill_id
        WHERE eb.event_id = e.id
    ) bl ON TRUE
    LEFT JOIN LATERAL (
        SELECT array_agg(t.tag ORDER BY t.position) AS tags
        FROM event_tags t
        WHERE t.event_id = e.id
    ) tg ON TRUE
    LEFT JOIN LATERAL (
        SELECT s.summary
        FROM agenda_summaries s
        WHERE s.event_id = e.id
        ORDER BY s.created_at DESC
        LIMIT 1
    ) sm ON TRUE";

/// Which events a `SELECT` targets.
#[derive(Debug, Clone, Copy)]
enum Selection<'f> {
    Filter(&'f EventFilter),
    Id(&'f EventId),
}

/// Operations on the `events`, `event_bills`, `event_tags`, and
/// `agenda_summaries` tables.
pub struct EventStore<'a> {
    pool: &'a PgPool,
    shaping: ShapingStrategy,
}

impl<'a> EventStore<'a> {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            shaping: ShapingStrategy::Batched,
        }
    }

    /// Choose how child rows are attached.
    #[must_use]
    pub const fn with_shaping(mut self, shaping: ShapingStrategy) -> Self {
        self.shaping = shaping;
        self
    }

    /// List events matching `filter`, shaped with their children.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the parent or any child query
    /// fails; no partial result is returned.
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<ShapedEvent>, DbError> {
        let shaped = self.select(Selection::Filter(filter)).await?;
        tracing::debug!(
            count = shaped.len(),
            strategy = ?self.shaping,
            "Listed events"
        );
        Ok(shaped)
    }

    /// Fetch one shaped event by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn get(&self, id: &EventId) -> Result<Option<ShapedEvent>, DbError> {
        Ok(self.select(Selection::Id(id)).await?.into_iter().next())
    }

    /// Insert an event with its bills and tags in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] if the id is already taken, or
    /// [`DbError::Postgres`] if any statement fails.
    pub async fn create(&self, draft: EventDraft) -> Result<ShapedEvent, DbError> {
        let EventDraft { event, bills, tags } = draft;
        let mut tx = self.pool.begin().await?;

        bind_event_columns(sqlx::query(
            r"INSERT INTO events (id, name, date, time, location_name, lat, lng, level, state,
                                  committee_name, description, source_url, details_url, docket_url,
                                  agenda_url, virtual_meeting_url, allows_public_participation, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        ), &event)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from_insert(e, &format!("event {}", event.id)))?;

        replace_bills(&mut tx, &event.id, &event.state, &bills).await?;
        replace_tags(&mut tx, &event.id, &tags).await?;
        tx.commit().await?;

        self.get(&event.id)
            .await?
            .ok_or_else(|| DbError::CorruptRow(format!("event {} vanished after insert", event.id)))
    }

    /// Merge `update` into the stored event. Returns `None` when no event
    /// has that id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any statement fails.
    pub async fn update(
        &self,
        id: &EventId,
        update: EventUpdate,
    ) -> Result<Option<ShapedEvent>, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1 FOR UPDATE"
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut record = EventRecord::from(row);
        let changes = update.apply(&mut record);

        bind_event_columns(sqlx::query(
            r"UPDATE events
              SET name = $2, date = $3, time = $4, location_name = $5, lat = $6, lng = $7,
                  level = $8, state = $9, committee_name = $10, description = $11,
                  source_url = $12, details_url = $13, docket_url = $14, agenda_url = $15,
                  virtual_meeting_url = $16, allows_public_participation = $17
              WHERE id = $1",
        ), &record)
        .execute(&mut *tx)
        .await?;

        if let Some(bills) = &changes.bills {
            replace_bills(&mut tx, &record.id, &record.state, bills).await?;
        }
        if let Some(tags) = &changes.tags {
            replace_tags(&mut tx, &record.id, tags).await?;
        }
        tx.commit().await?;

        self.get(id).await
    }

    /// Delete an event. Children go with it via `ON DELETE CASCADE`.
    /// Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&self, id: &EventId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a generated agenda summary for an event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the event does not exist, or
    /// [`DbError::Postgres`] if the insert fails.
    pub async fn add_agenda_summary(
        &self,
        id: &EventId,
        summary: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO agenda_summaries (event_id, summary, created_at) VALUES ($1, $2, $3)",
        )
        .bind(id.as_str())
        .bind(summary)
        .bind(created_at)
        .execute(self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, &format!("event {id}")))?;
        Ok(())
    }

    // =========================================================================
    // Selection and shaping
    // =========================================================================

    async fn select(&self, selection: Selection<'_>) -> Result<Vec<ShapedEvent>, DbError> {
        match self.shaping {
            ShapingStrategy::Batched => self.select_batched(selection).await,
            ShapingStrategy::Aggregated => self.select_aggregated(selection).await,
        }
    }

    async fn select_batched(&self, selection: Selection<'_>) -> Result<Vec<ShapedEvent>, DbError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {EVENT_COLUMNS} FROM events e"));
        push_selection(&mut qb, selection);

        let rows: Vec<EventRow> = qb.build_query_as().fetch_all(self.pool).await?;
        let parents: Vec<EventRecord> = rows.into_iter().map(EventRecord::from).collect();
        let ids: Vec<String> = parents.iter().map(|e| e.id.as_str().to_owned()).collect();

        let children = self.fetch_children(&ids).await?;
        Ok(shape_events(parents, children))
    }

    async fn select_aggregated(
        &self,
        selection: Selection<'_>,
    ) -> Result<Vec<ShapedEvent>, DbError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {EVENT_COLUMNS}, bl.bills, tg.tags, sm.summary AS agenda_summary \
             FROM events e {AGGREGATE_JOINS}"
        ));
        push_selection(&mut qb, selection);

        let rows: Vec<AggregatedRow> = qb.build_query_as().fetch_all(self.pool).await?;
        let aggregated = rows
            .into_iter()
            .map(|row| AggregatedEvent {
                event: EventRecord::from(row.event),
                bills: row.bills.unwrap_or(serde_json::Value::Null),
                tags: row.tags.unwrap_or_default(),
                agenda_summary: row.agenda_summary,
            })
            .collect();
        Ok(shape_aggregated(aggregated)?)
    }

    /// Load every child row for the given parent ids, one query per table.
    async fn fetch_children(&self, ids: &[String]) -> Result<ChildRows, DbError> {
        if ids.is_empty() {
            return Ok(ChildRows::default());
        }

        let bills = sqlx::query_as::<_, BillJoinRow>(
            r"SELECT eb.event_id, b.number, b.title, b.url, b.summary
              FROM event_bills eb
              JOIN bills b ON b.id = eb.bill_id
              WHERE eb.event_id = ANY($1)
              ORDER BY eb.event_id, eb.position",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let tags = sqlx::query_as::<_, TagJoinRow>(
            r"SELECT event_id, tag
              FROM event_tags
              WHERE event_id = ANY($1)
              ORDER BY event_id, position",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let summaries = sqlx::query_as::<_, SummaryJoinRow>(
            r"SELECT event_id, summary, created_at
              FROM agenda_summaries
              WHERE event_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(ChildRows {
            bills: bills.into_iter().map(BillRow::from).collect(),
            tags: tags.into_iter().map(TagRow::from).collect(),
            agenda_summaries: summaries.into_iter().map(AgendaSummaryRow::from).collect(),
        })
    }
}

// =============================================================================
// SQL construction
// =============================================================================

/// Bind the 17 event columns in table order (`$1` = id ... `$17` =
/// `allows_public_participation`).
fn bind_event_columns<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    event: &EventRecord,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(event.id.as_str().to_owned())
        .bind(event.name.clone())
        .bind(event.date)
        .bind(event.time.clone())
        .bind(event.location_name.clone())
        .bind(event.lat)
        .bind(event.lng)
        .bind(event.level.map(Level::as_str))
        .bind(event.state.clone())
        .bind(event.committee_name.clone())
        .bind(event.description.clone())
        .bind(event.source_url.clone())
        .bind(event.details_url.clone())
        .bind(event.docket_url.clone())
        .bind(event.agenda_url.clone())
        .bind(event.virtual_meeting_url.clone())
        .bind(event.allows_public_participation)
}

fn push_selection(qb: &mut QueryBuilder<'_, Postgres>, selection: Selection<'_>) {
    match selection {
        Selection::Id(id) => {
            qb.push(" WHERE e.id = ");
            qb.push_bind(id.as_str().to_owned());
        }
        Selection::Filter(filter) => push_filter(qb, filter),
    }
}

/// Append `WHERE`, `ORDER BY`, and `LIMIT` for a listing filter.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter) {
    qb.push(" WHERE TRUE");

    if let Some(state) = &filter.state {
        qb.push(" AND e.state = ");
        qb.push_bind(state.as_str().to_owned());
    }
    if let Some(from_date) = filter.from_date {
        qb.push(" AND e.date >= ");
        qb.push_bind(from_date);
    }
    if let Some(level) = filter.level {
        qb.push(" AND e.level = ");
        qb.push_bind(level.as_str());
    }
    if let Some(near) = filter.near {
        qb.push(" AND e.lat IS NOT NULL AND e.lng IS NOT NULL AND ");
        push_distance(qb, near);
        qb.push(" <= ");
        qb.push_bind(near.radius_miles);
    }

    match (filter.order, filter.near) {
        (SortOrder::Nearest, Some(near)) => {
            qb.push(" ORDER BY ");
            push_distance(qb, near);
            qb.push(", e.date ASC, e.time ASC NULLS LAST, e.id ASC");
        }
        (SortOrder::DateDescending, _) => {
            qb.push(" ORDER BY e.date DESC, e.time DESC NULLS LAST, e.id ASC");
        }
        _ => {
            qb.push(" ORDER BY e.date ASC, e.time ASC NULLS LAST, e.id ASC");
        }
    }

    qb.push(" LIMIT ");
    qb.push_bind(i64::from(filter.limit));
}

/// Planar distance in miles from the search center, as SQL.
fn push_distance(qb: &mut QueryBuilder<'_, Postgres>, near: GeoRadius) {
    let miles_per_lng_degree = MILES_PER_DEGREE * near.lat.to_radians().cos();
    qb.push("sqrt(power((e.lng - ");
    qb.push_bind(near.lng);
    qb.push(") * ");
    qb.push_bind(miles_per_lng_degree);
    qb.push(", 2) + power((e.lat - ");
    qb.push_bind(near.lat);
    qb.push(") * ");
    qb.push_bind(MILES_PER_DEGREE);
    qb.push(", 2))");
}

/// Replace an event's bill associations, upserting the bills themselves.
async fn replace_bills(
    conn: &mut PgConnection,
    event_id: &EventId,
    state: &str,
    bills: &[Bill],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM event_bills WHERE event_id = $1")
        .bind(event_id.as_str())
        .execute(&mut *conn)
        .await?;

    for (position, bill) in bills.iter().enumerate() {
        let bill_id: i64 = sqlx::query_scalar(
            r"INSERT INTO bills (state, number, title, url, summary)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (state, number) DO UPDATE
              SET title = COALESCE(EXCLUDED.title, bills.title),
                  url = COALESCE(EXCLUDED.url, bills.url),
                  summary = COALESCE(EXCLUDED.summary, bills.summary)
              RETURNING id",
        )
        .bind(state)
        .bind(&bill.number)
        .bind(bill.title.as_deref())
        .bind(bill.url.as_deref())
        .bind(bill.summary.as_deref())
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r"INSERT INTO event_bills (event_id, bill_id, position)
              VALUES ($1, $2, $3)
              ON CONFLICT (event_id, bill_id) DO NOTHING",
        )
        .bind(event_id.as_str())
        .bind(bill_id)
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Replace an event's tags.
async fn replace_tags(
    conn: &mut PgConnection,
    event_id: &EventId,
    tags: &[String],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM event_tags WHERE event_id = $1")
        .bind(event_id.as_str())
        .execute(&mut *conn)
        .await?;

    if tags.is_empty() {
        return Ok(());
    }

    let positions: Vec<i32> = (0..tags.len())
        .map(|p| i32::try_from(p).unwrap_or(i32::MAX))
        .collect();
    sqlx::query(
        r"INSERT INTO event_tags (event_id, tag, position)
          SELECT $1, * FROM UNNEST($2::TEXT[], $3::INT[])
          ON CONFLICT (event_id, tag) DO NOTHING",
    )
    .bind(event_id.as_str())
    .bind(tags)
    .bind(&positions)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Row types
// =============================================================================

/// A row from the `events` table.
///
/// Uses runtime types rather than compile-time checked types to
/// avoid requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Event id.
    pub id: String,
    /// Meeting title.
    pub name: String,
    /// Calendar date.
    pub date: NaiveDate,
    /// Start time text.
    pub time: Option<String>,
    /// Venue.
    pub location_name: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
    /// Level of government as stored text.
    pub level: Option<String>,
    /// Two-letter state code.
    pub state: String,
    /// Committee.
    pub committee_name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Source page.
    pub source_url: Option<String>,
    /// Details page.
    pub details_url: Option<String>,
    /// Docket page.
    pub docket_url: Option<String>,
    /// Agenda document.
    pub agenda_url: Option<String>,
    /// Remote meeting link.
    pub virtual_meeting_url: Option<String>,
    /// Public participation flag.
    pub allows_public_participation: bool,
    /// Insert time.
    pub created_at: DateTime<Utc>,
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        // Unrecognized level text reads as no level.
        let level = row.level.as_deref().and_then(|l| l.parse().ok());
        Self {
            id: EventId::from(row.id),
            name: row.name,
            date: row.date,
            time: row.time,
            location_name: row.location_name,
            lat: row.lat,
            lng: row.lng,
            level,
            state: row.state,
            committee_name: row.committee_name,
            description: row.description,
            source_url: row.source_url,
            details_url: row.details_url,
            docket_url: row.docket_url,
            agenda_url: row.agenda_url,
            virtual_meeting_url: row.virtual_meeting_url,
            allows_public_participation: row.allows_public_participation,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AggregatedRow {
    #[sqlx(flatten)]
    event: EventRow,
    bills: Option<serde_json::Value>,
    tags: Option<Vec<Option<String>>>,
    agenda_summary: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct BillJoinRow {
    event_id: String,
    number: String,
    title: Option<String>,
    url: Option<String>,
    summary: Option<String>,
}

impl From<BillJoinRow> for BillRow {
    fn from(row: BillJoinRow) -> Self {
        Self {
            event_id: EventId::from(row.event_id),
            bill: Bill {
                number: row.number,
                title: row.title,
                url: row.url,
                summary: row.summary,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TagJoinRow {
    event_id: String,
    tag: Option<String>,
}

impl From<TagJoinRow> for TagRow {
    fn from(row: TagJoinRow) -> Self {
        Self {
            event_id: EventId::from(row.event_id),
            tag: row.tag,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryJoinRow {
    event_id: String,
    summary: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SummaryJoinRow> for AgendaSummaryRow {
    fn from(row: SummaryJoinRow) -> Self {
        Self {
            event_id: EventId::from(row.event_id),
            summary: row.summary,
            created_at: row.created_at,
        }
    }
}
