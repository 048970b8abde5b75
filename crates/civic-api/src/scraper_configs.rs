//! Scraper configuration endpoints.
//!
//! Listing and fetching one by `id` are public. Creating, replacing, and deleting require the admin
//! key. Ids are UUIDs; a malformed id is a 400 and an unknown one a 404.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use civic_core::filter::parse_id;
use civic_types::{NewScraperConfig, ScraperConfig, ScraperConfigId};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminKey;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters carrying a configuration id.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ConfigIdQuery {
    /// Configuration UUID.
    pub id: Option<String>,
}

fn parse_config_id(raw: Option<&str>) -> Result<ScraperConfigId, ApiError> {
    let value = parse_id(raw)?;
    Uuid::parse_str(value)
        .map(ScraperConfigId::from)
        .map_err(|e| ApiError::Validation(format!("invalid parameter id: {e}")))
}

/// `GET /api/scraper-configs`
///
/// With `?id=` returns that one configuration, otherwise all of them.
pub async fn list_configs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConfigIdQuery>,
) -> Result<Response, ApiError> {
    if params.id.is_some() {
        let id = parse_config_id(params.id.as_deref())?;
        let config = state
            .scraper_configs
            .get(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("scraper config {id}")))?;
        return Ok(Json(config).into_response());
    }
    Ok(Json(state.scraper_configs.list().await?).into_response())
}

/// `POST /api/scraper-configs`
pub async fn create_config(
    State(state): State<Arc<AppState>>,
    _admin: AdminKey,
    body: Result<Json<NewScraperConfig>, JsonRejection>,
) -> Result<(StatusCode, Json<ScraperConfig>), ApiError> {
    let Json(input) = body?;
    input.validate()?;

    let created = state.scraper_configs.create(input).await?;
    tracing::info!(id = %created.id, name = %created.name, "Created scraper config");
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/scraper-configs?id=...`
pub async fn replace_config(
    State(state): State<Arc<AppState>>,
    _admin: AdminKey,
    Query(params): Query<ConfigIdQuery>,
    body: Result<Json<NewScraperConfig>, JsonRejection>,
) -> Result<Json<ScraperConfig>, ApiError> {
    let id = parse_config_id(params.id.as_deref())?;
    let Json(input) = body?;
    input.validate()?;

    let replaced = state
        .scraper_configs
        .replace(id, input)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("scraper config {id}")))?;
    tracing::info!(id = %id, "Replaced scraper config");
    Ok(Json(replaced))
}

/// `DELETE /api/scraper-configs?id=...`
pub async fn delete_config(
    State(state): State<Arc<AppState>>,
    _admin: AdminKey,
    Query(params): Query<ConfigIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_config_id(params.id.as_deref())?;
    if !state.scraper_configs.delete(id).await? {
        return Err(ApiError::NotFound(format!("scraper config {id}")));
    }
    tracing::info!(id = %id, "Deleted scraper config");
    Ok(Json(serde_json::json!({ "deleted": true, "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_ids_must_be_uuids() {
        assert!(matches!(parse_config_id(None), Err(ApiError::Validation(_))));
        assert!(matches!(
            parse_config_id(Some("not-a-uuid")),
            Err(ApiError::Validation(_))
        ));
        let id = Uuid::now_v7();
        assert!(matches!(
            parse_config_id(Some(&id.to_string())),
            Ok(parsed) if parsed.into_inner() == id
        ));
    }
}
