//! Shared application state for the API server.
//!
//! [`AppState`] owns the storage handles every handler reads from, plus
//! the request-independent settings (limits, admin key) taken from
//! [`AppConfig`].

use chrono::{NaiveDate, Utc};
use civic_core::AppConfig;
use civic_core::config::ApiConfig;
use civic_db::{Backends, EventRepository, ScrapeCache, ScraperConfigRepository};

/// State shared by all handlers through `Arc<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Events with bills, tags, and summaries.
    pub events: EventRepository,
    /// Scraper configurations.
    pub scraper_configs: ScraperConfigRepository,
    /// Scrape result cache.
    pub cache: ScrapeCache,
    /// Listing limits and search radius bounds.
    pub api: ApiConfig,
    /// Key required on mutating requests; `None` rejects them all.
    pub admin_api_key: Option<String>,
    fixed_today: Option<NaiveDate>,
}

impl AppState {
    /// Assemble state from connected backends.
    ///
    /// A blank admin key counts as unset.
    pub fn new(backends: Backends, config: &AppConfig) -> Self {
        let admin_api_key = config
            .auth
            .admin_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned);
        if admin_api_key.is_none() {
            tracing::warn!("No admin API key configured; admin mutations will be rejected");
        }

        Self {
            events: backends.events,
            scraper_configs: backends.scraper_configs,
            cache: backends.cache,
            api: config.api.clone(),
            admin_api_key,
            fixed_today: None,
        }
    }

    /// State over fresh in-memory backends.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(Backends::in_memory(&config.cache.key_prefix), config)
    }

    /// Pin the date used for "upcoming" filters.
    #[must_use]
    pub const fn with_fixed_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    /// The current date in UTC, unless pinned.
    pub fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}
