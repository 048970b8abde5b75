//! Backend-independent entry points used by the HTTP layer.
//!
//! Each repository is an enum over the `PostgreSQL` store and its
//! in-memory counterpart. Async methods dispatch with a `match` rather than
//! through trait objects.

use chrono::{DateTime, Utc};
use civic_core::ShapingStrategy;
use civic_core::config::{AppConfig, CacheBackend, StoreBackend};
use civic_core::filter::EventFilter;
use civic_types::{
    EventDraft, EventId, EventUpdate, NewScraperConfig, ScraperConfig, ScraperConfigId,
    ShapedEvent,
};

use crate::cache::{MemoryCache, ScrapeCache};
use crate::error::DbError;
use crate::event_store::EventStore;
use crate::kv::KvCache;
use crate::memory::{MemoryEventStore, MemoryScraperConfigStore};
use crate::postgres::{PostgresConfig, PostgresPool};
use crate::scraper_config_store::ScraperConfigStore;

/// Event storage selected by configuration.
#[derive(Clone)]
pub enum EventRepository {
    /// `PostgreSQL` with the configured child-row strategy.
    Postgres {
        /// Connection pool.
        pool: PostgresPool,
        /// How bills, tags, and summaries are attached.
        shaping: ShapingStrategy,
    },
    /// Process-local tables.
    Memory(MemoryEventStore),
}

impl EventRepository {
    /// List events matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any backend query fails.
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<ShapedEvent>, DbError> {
        match self {
            Self::Postgres { pool, shaping } => {
                EventStore::new(pool.pool())
                    .with_shaping(*shaping)
                    .list(filter)
                    .await
            }
            Self::Memory(store) => Ok(store.list(filter).await),
        }
    }

    /// Fetch one event by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a backend query fails.
    pub async fn get(&self, id: &EventId) -> Result<Option<ShapedEvent>, DbError> {
        match self {
            Self::Postgres { pool, shaping } => {
                EventStore::new(pool.pool()).with_shaping(*shaping).get(id).await
            }
            Self::Memory(store) => Ok(store.get(id).await),
        }
    }

    /// Insert an event with its bills and tags.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] if the id is taken, or another
    /// [`DbError`] if the backend fails.
    pub async fn create(&self, draft: EventDraft) -> Result<ShapedEvent, DbError> {
        match self {
            Self::Postgres { pool, shaping } => {
                EventStore::new(pool.pool())
                    .with_shaping(*shaping)
                    .create(draft)
                    .await
            }
            Self::Memory(store) => store.create(draft).await,
        }
    }

    /// Merge `update` into an event. `None` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn update(
        &self,
        id: &EventId,
        update: EventUpdate,
    ) -> Result<Option<ShapedEvent>, DbError> {
        match self {
            Self::Postgres { pool, shaping } => {
                EventStore::new(pool.pool())
                    .with_shaping(*shaping)
                    .update(id, update)
                    .await
            }
            Self::Memory(store) => Ok(store.update(id, update).await),
        }
    }

    /// Delete an event. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn delete(&self, id: &EventId) -> Result<bool, DbError> {
        match self {
            Self::Postgres { pool, .. } => EventStore::new(pool.pool()).delete(id).await,
            Self::Memory(store) => Ok(store.delete(id).await),
        }
    }

    /// Record a generated agenda summary.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown event, or another
    /// [`DbError`] if the backend fails.
    pub async fn add_agenda_summary(
        &self,
        id: &EventId,
        summary: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        match self {
            Self::Postgres { pool, .. } => {
                EventStore::new(pool.pool())
                    .add_agenda_summary(id, summary, created_at)
                    .await
            }
            Self::Memory(store) => store.add_agenda_summary(id, summary, created_at).await,
        }
    }
}

/// Scraper configuration storage selected by configuration.
#[derive(Clone)]
pub enum ScraperConfigRepository {
    /// `PostgreSQL`.
    Postgres(PostgresPool),
    /// Process-local list.
    Memory(MemoryScraperConfigStore),
}

impl ScraperConfigRepository {
    /// All configurations, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn list(&self) -> Result<Vec<ScraperConfig>, DbError> {
        match self {
            Self::Postgres(pool) => ScraperConfigStore::new(pool.pool()).list().await,
            Self::Memory(store) => Ok(store.list().await),
        }
    }

    /// One configuration by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn get(&self, id: ScraperConfigId) -> Result<Option<ScraperConfig>, DbError> {
        match self {
            Self::Postgres(pool) => ScraperConfigStore::new(pool.pool()).get(id).await,
            Self::Memory(store) => Ok(store.get(id).await),
        }
    }

    /// Insert a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn create(&self, input: NewScraperConfig) -> Result<ScraperConfig, DbError> {
        match self {
            Self::Postgres(pool) => ScraperConfigStore::new(pool.pool()).create(input).await,
            Self::Memory(store) => Ok(store.create(input).await),
        }
    }

    /// Replace a configuration. `None` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn replace(
        &self,
        id: ScraperConfigId,
        input: NewScraperConfig,
    ) -> Result<Option<ScraperConfig>, DbError> {
        match self {
            Self::Postgres(pool) => {
                ScraperConfigStore::new(pool.pool()).replace(id, input).await
            }
            Self::Memory(store) => Ok(store.replace(id, input).await),
        }
    }

    /// Delete a configuration. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn delete(&self, id: ScraperConfigId) -> Result<bool, DbError> {
        match self {
            Self::Postgres(pool) => ScraperConfigStore::new(pool.pool()).delete(id).await,
            Self::Memory(store) => Ok(store.delete(id).await),
        }
    }
}

/// Every storage handle the API needs.
#[derive(Clone)]
pub struct Backends {
    /// Events with their children.
    pub events: EventRepository,
    /// Scraper configurations.
    pub scraper_configs: ScraperConfigRepository,
    /// Scrape result cache.
    pub cache: ScrapeCache,
}

impl Backends {
    /// Fresh in-memory backends.
    pub fn in_memory(key_prefix: &str) -> Self {
        Self {
            events: EventRepository::Memory(MemoryEventStore::new()),
            scraper_configs: ScraperConfigRepository::Memory(MemoryScraperConfigStore::new()),
            cache: ScrapeCache::Memory(MemoryCache::new(key_prefix)),
        }
    }

    /// Connect the backends named in `config`, running migrations when
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a connection or migration fails.
    pub async fn connect(config: &AppConfig) -> Result<Self, DbError> {
        let (events, scraper_configs) = match config.database.backend {
            StoreBackend::Postgres => {
                let pool = PostgresPool::connect(&PostgresConfig::from_settings(&config.database)?)
                    .await?;
                if config.database.run_migrations {
                    pool.run_migrations().await?;
                }
                (
                    EventRepository::Postgres {
                        pool: pool.clone(),
                        shaping: config.database.shaping,
                    },
                    ScraperConfigRepository::Postgres(pool),
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory event store; data is lost on restart");
                (
                    EventRepository::Memory(MemoryEventStore::new()),
                    ScraperConfigRepository::Memory(MemoryScraperConfigStore::new()),
                )
            }
        };

        let cache = match (config.cache.backend, config.cache.url.as_deref()) {
            (CacheBackend::Redis, Some(url)) => {
                ScrapeCache::Kv(KvCache::connect(url, &config.cache.key_prefix).await?)
            }
            (CacheBackend::Redis, None) => {
                return Err(DbError::Config("cache.url is not set".to_owned()));
            }
            (CacheBackend::Memory, _) => {
                ScrapeCache::Memory(MemoryCache::new(&config.cache.key_prefix))
            }
        };

        Ok(Self {
            events,
            scraper_configs,
            cache,
        })
    }
}
