//! Admin event endpoints.
//!
//! Reads are open; every mutation takes an [`AdminKey`] first so an
//! unauthenticated request is rejected before its body is parsed or the
//! store is touched.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/admin-events` | All events, latest first, or one by `id` |
//! | `POST` | `/api/admin-events` | Create an event with bills and tags |
//! | `PUT` | `/api/admin-events?id=` | Merge changes into an event |
//! | `DELETE` | `/api/admin-events?id=` | Delete an event (idempotent) |
//! | `POST` | `/api/agenda-summaries` | Record a generated agenda summary |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use civic_core::filter::{EventFilter, SortOrder, parse_id, parse_limit};
use civic_types::{EventId, EventUpdate, NewEvent, ShapedEvent};
use validator::{Validate, ValidationError};

use crate::auth::AdminKey;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the admin event endpoints.
#[derive(Debug, Default, serde::Deserialize)]
pub struct AdminEventsQuery {
    /// Event id; selects one event on `GET`, required on `PUT`/`DELETE`.
    pub id: Option<String>,
    /// Maximum number of events on `GET`.
    pub limit: Option<String>,
}

/// Request body for `POST /api/agenda-summaries`.
#[derive(Debug, Clone, serde::Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AgendaSummaryInput {
    /// Event the summary describes.
    #[serde(alias = "event_id")]
    #[validate(custom(function = "not_blank"))]
    pub event_id: String,
    /// Generated text. Whitespace-only text is rejected.
    #[validate(custom(function = "not_blank"))]
    pub summary: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

/// `GET /api/admin-events`
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminEventsQuery>,
) -> Result<Response, ApiError> {
    if params.id.is_some() {
        let id = EventId::from(parse_id(params.id.as_deref())?);
        let event = state
            .events
            .get(&id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("event {id}")))?;
        return Ok(Json(event).into_response());
    }

    let limit = parse_limit(
        params.limit.as_deref(),
        state.api.default_limit,
        state.api.max_limit,
    )?;
    let criteria = EventFilter::all(limit).with_order(SortOrder::DateDescending);
    let events = state.events.list(&criteria).await?;
    Ok(Json(events).into_response())
}

/// `POST /api/admin-events`
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminKey,
    body: Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<ShapedEvent>), ApiError> {
    let Json(input) = body?;
    input.validate()?;

    let created = state.events.create(input.into_draft(Utc::now())).await?;
    tracing::info!(
        id = %created.event.id,
        state = %created.event.state,
        bills = created.bills.len(),
        tags = created.tags.len(),
        "Created event"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/admin-events?id=...`
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminKey,
    Query(params): Query<AdminEventsQuery>,
    body: Result<Json<EventUpdate>, JsonRejection>,
) -> Result<Json<ShapedEvent>, ApiError> {
    let id = EventId::from(parse_id(params.id.as_deref())?);
    let Json(update) = body?;
    update.validate()?;

    let updated = state
        .events
        .update(&id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("event {id}")))?;
    tracing::info!(id = %id, "Updated event");
    Ok(Json(updated))
}

/// `DELETE /api/admin-events?id=...`
///
/// Deleting an id that does not exist succeeds with `deleted: false`.
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminKey,
    Query(params): Query<AdminEventsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = EventId::from(parse_id(params.id.as_deref())?);
    let deleted = state.events.delete(&id).await?;
    tracing::info!(id = %id, deleted, "Deleted event");
    Ok(Json(serde_json::json!({ "deleted": deleted, "id": id })))
}

/// `POST /api/agenda-summaries`
///
/// Stores a summary for an existing event and returns the event as it now
/// lists, with the newest summary attached.
pub async fn add_agenda_summary(
    State(state): State<Arc<AppState>>,
    _admin: AdminKey,
    body: Result<Json<AgendaSummaryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ShapedEvent>), ApiError> {
    let Json(input) = body?;
    input.validate()?;

    let id = EventId::from(input.event_id.trim());
    state
        .events
        .add_agenda_summary(&id, Some(input.summary.as_str()), Utc::now())
        .await?;
    let event = state
        .events
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("event {id}")))?;

    tracing::info!(id = %id, "Stored agenda summary");
    Ok((StatusCode::CREATED, Json(event)))
}
