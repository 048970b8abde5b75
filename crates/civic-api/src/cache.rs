//! Scrape cache inspection and invalidation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use civic_core::filter::{parse_optional_state, parse_state};
use civic_types::CacheInfo;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the cache endpoints.
#[derive(Debug, Default, serde::Deserialize)]
pub struct CacheQuery {
    /// Two-letter state code.
    pub state: Option<String>,
}

/// `GET /api/cache-info?state=CA`
///
/// Without `state`, lists entries for every state.
pub async fn cache_info(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CacheQuery>,
) -> Result<Json<CacheInfo>, ApiError> {
    let code = parse_optional_state(params.state.as_deref())?;
    Ok(Json(state.cache.info(code.as_ref()).await?))
}

/// `GET /api/invalidate-cache?state=CA`
pub async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CacheQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let code = parse_state(params.state.as_deref())?;
    let invalidated = state.cache.invalidate(&code).await?;
    Ok(Json(serde_json::json!({
        "state": code.as_str(),
        "invalidated": invalidated,
    })))
}
