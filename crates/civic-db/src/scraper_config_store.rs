//! `PostgreSQL` operations on the `scraper_configs` table.
//!
//! `fields`, `ai_fields`, and `storage` are stored as `JSONB` and returned
//! exactly as written.

use chrono::{DateTime, Utc};
use civic_types::{NewScraperConfig, ScraperConfig, ScraperConfigId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

const CONFIG_COLUMNS: &str =
    "id, name, url, fields, ai_fields, storage, enabled, created_at, updated_at";

/// Operations on the `scraper_configs` table.
pub struct ScraperConfigStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ScraperConfigStore<'a> {
    /// Create a new store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All configurations, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<ScraperConfig>, DbError> {
        let rows = sqlx::query_as::<_, ScraperConfigRow>(&format!(
            "SELECT {CONFIG_COLUMNS} FROM scraper_configs ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(ScraperConfig::from).collect())
    }

    /// One configuration by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: ScraperConfigId) -> Result<Option<ScraperConfig>, DbError> {
        let row = sqlx::query_as::<_, ScraperConfigRow>(&format!(
            "SELECT {CONFIG_COLUMNS} FROM scraper_configs WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(ScraperConfig::from))
    }

    /// Insert a new configuration with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn create(&self, input: NewScraperConfig) -> Result<ScraperConfig, DbError> {
        let id = ScraperConfigId::new();
        let row = sqlx::query_as::<_, ScraperConfigRow>(&format!(
            r"INSERT INTO scraper_configs (id, name, url, fields, ai_fields, storage, enabled, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
              RETURNING {CONFIG_COLUMNS}"
        ))
        .bind(id.into_inner())
        .bind(input.name)
        .bind(input.url)
        .bind(input.fields)
        .bind(input.ai_fields)
        .bind(input.storage)
        .bind(input.enabled)
        .fetch_one(self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, &format!("scraper config {id}")))?;

        Ok(ScraperConfig::from(row))
    }

    /// Replace every user-editable field of a configuration. Returns
    /// `None` when no configuration has that id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn replace(
        &self,
        id: ScraperConfigId,
        input: NewScraperConfig,
    ) -> Result<Option<ScraperConfig>, DbError> {
        let row = sqlx::query_as::<_, ScraperConfigRow>(&format!(
            r"UPDATE scraper_configs
              SET name = $2, url = $3, fields = $4, ai_fields = $5, storage = $6, enabled = $7,
                  updated_at = now()
              WHERE id = $1
              RETURNING {CONFIG_COLUMNS}"
        ))
        .bind(id.into_inner())
        .bind(input.name)
        .bind(input.url)
        .bind(input.fields)
        .bind(input.ai_fields)
        .bind(input.storage)
        .bind(input.enabled)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ScraperConfig::from))
    }

    /// Delete a configuration. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&self, id: ScraperConfigId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM scraper_configs WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// A row from the `scraper_configs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScraperConfigRow {
    /// Configuration id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Target page.
    pub url: String,
    /// Extraction rules.
    pub fields: serde_json::Value,
    /// AI-assisted extraction rules.
    pub ai_fields: Option<serde_json::Value>,
    /// Storage target.
    pub storage: serde_json::Value,
    /// Scheduling flag.
    pub enabled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<ScraperConfigRow> for ScraperConfig {
    fn from(row: ScraperConfigRow) -> Self {
        Self {
            id: ScraperConfigId::from(row.id),
            name: row.name,
            url: row.url,
            fields: row.fields,
            ai_fields: row.ai_fields,
            storage: row.storage,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
