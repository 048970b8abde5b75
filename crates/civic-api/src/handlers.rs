//! Public listing endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/state-events` | Upcoming events in one state |
//! | `GET` | `/api/local-meetings` | Upcoming events near a point |
//!
//! Every parameter is validated before the store is queried. Query values
//! arrive as raw strings so a malformed value is reported by name instead
//! of as a generic extractor rejection.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use civic_core::filter::{
    self, EventFilter, GeoRadius, parse_coordinate, parse_f64_or, parse_level, parse_limit,
};
use civic_types::ShapedEvent;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/state-events`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct StateEventsQuery {
    /// Two-letter state code (required).
    pub state: Option<String>,
    /// Maximum number of events.
    pub limit: Option<String>,
}

/// Query parameters for `GET /api/local-meetings`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct LocalMeetingsQuery {
    /// Center latitude (required).
    pub lat: Option<String>,
    /// Center longitude (required).
    pub lng: Option<String>,
    /// Search radius in miles.
    pub radius: Option<String>,
    /// `federal`, `state`, or `local`.
    pub level: Option<String>,
    /// Maximum number of events.
    pub limit: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /api/state-events?state=CA&limit=50`
///
/// Upcoming events (today or later) for one state, soonest first.
pub async fn state_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StateEventsQuery>,
) -> Result<Json<Vec<ShapedEvent>>, ApiError> {
    let code = filter::parse_state(params.state.as_deref())?;
    let limit = parse_limit(
        params.limit.as_deref(),
        state.api.default_limit,
        state.api.max_limit,
    )?;

    let criteria = EventFilter::upcoming_in_state(code, state.today(), limit);
    let events = state.events.list(&criteria).await?;

    tracing::debug!(state = ?criteria.state, count = events.len(), "Listed state events");
    Ok(Json(events))
}

/// `GET /api/local-meetings?lat=..&lng=..&radius=25&level=local`
///
/// Upcoming geocoded events inside the search circle, nearest first.
pub async fn local_meetings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocalMeetingsQuery>,
) -> Result<Json<Vec<ShapedEvent>>, ApiError> {
    let lat = parse_coordinate("lat", params.lat.as_deref())?;
    let lng = parse_coordinate("lng", params.lng.as_deref())?;
    let radius = parse_f64_or(
        "radius",
        params.radius.as_deref(),
        state.api.default_radius_miles,
    )?;
    let near = GeoRadius::new(lat, lng, radius, state.api.max_radius_miles)?;
    let level = parse_level(params.level.as_deref())?;
    let limit = parse_limit(
        params.limit.as_deref(),
        state.api.default_limit,
        state.api.max_limit,
    )?;

    let criteria = EventFilter::upcoming_near(near, state.today(), limit).with_level(level);
    let events = state.events.list(&criteria).await?;

    tracing::debug!(lat, lng, radius, count = events.len(), "Listed local meetings");
    Ok(Json(events))
}

/// Fallback for unmatched paths, answered in the API's JSON error shape.
pub async fn not_found(uri: axum::http::Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
