//! Axum router construction for the civic events API.
//!
//! Assembles every route into a single [`Router`] with permissive CORS
//! (the API is read by browser clients on other origins) and per-request
//! tracing spans.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{admin, cache, handlers, scraper_configs};

/// Build the complete router.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `GET /api/state-events` -- upcoming events for a state
/// - `GET /api/local-meetings` -- upcoming events near a point
/// - `GET|POST|PUT|DELETE /api/admin-events` -- event administration
/// - `POST /api/agenda-summaries` -- attach a generated agenda summary
/// - `GET|POST|PUT|DELETE /api/scraper-configs` -- scraper configurations
/// - `GET /api/cache-info` -- scrape cache contents
/// - `GET /api/invalidate-cache` -- drop a state's cached scrapes
///
/// `OPTIONS` requests on any path are answered by the CORS layer with an
/// empty 200. Unknown paths get a JSON 404.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Public listings
        .route("/api/state-events", get(handlers::state_events))
        .route("/api/local-meetings", get(handlers::local_meetings))
        // Administration
        .route(
            "/api/admin-events",
            get(admin::list_events)
                .post(admin::create_event)
                .put(admin::update_event)
                .delete(admin::delete_event),
        )
        .route("/api/agenda-summaries", post(admin::add_agenda_summary))
        .route(
            "/api/scraper-configs",
            get(scraper_configs::list_configs)
                .post(scraper_configs::create_config)
                .put(scraper_configs::replace_config)
                .delete(scraper_configs::delete_config),
        )
        // Scrape cache
        .route("/api/cache-info", get(cache::cache_info))
        .route("/api/invalidate-cache", get(cache::invalidate_cache))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
