//! Scrape result cache.
//!
//! Scrapers park their output in a key-value store, one key per state and
//! source. The API only inspects and invalidates that cache; [`ScrapeCache`]
//! dispatches to either the Redis-compatible [`KvCache`] or the in-process
//! [`MemoryCache`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use civic_types::{CacheEntry, CacheInfo, StateCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::kv::KvCache;

/// Builds the key names shared by every cache backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    /// Key names under `prefix`.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches(':').to_owned(),
        }
    }

    /// `{prefix}:{STATE}:{name}`
    pub fn entry(&self, state: &StateCode, name: &str) -> String {
        format!("{}:{state}:{name}", self.prefix)
    }

    /// `{prefix}:{STATE}:index`
    pub fn index(&self, state: &StateCode) -> String {
        self.index_for(state.as_str())
    }

    pub(crate) fn index_for(&self, state: &str) -> String {
        format!("{}:{state}:index", self.prefix)
    }

    /// `{prefix}:states`
    pub fn states(&self) -> String {
        format!("{}:states", self.prefix)
    }
}

/// The value stored under each entry key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPayload {
    /// When the payload was written.
    pub cached_at: DateTime<Utc>,
    /// The scraper output.
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    state: String,
    payload: CachedPayload,
    expires_at: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process cache with the same key layout and expiry semantics as
/// [`KvCache`].
#[derive(Debug, Clone)]
pub struct MemoryCache {
    keys: CacheKeys,
    entries: Arc<RwLock<BTreeMap<String, MemoryEntry>>>,
}

impl MemoryCache {
    /// Create an empty cache whose keys start with `key_prefix`.
    pub fn new(key_prefix: &str) -> Self {
        Self {
            keys: CacheKeys::new(key_prefix),
            entries: Arc::default(),
        }
    }

    /// Store `payload` under `name` for `state`.
    pub async fn put(
        &self,
        state: &StateCode,
        name: &str,
        payload: &serde_json::Value,
        ttl: Option<Duration>,
    ) -> String {
        let now = Utc::now();
        let key = self.keys.entry(state, name);
        let expires_at = ttl
            .and_then(|t| chrono::Duration::from_std(t).ok())
            .and_then(|t| now.checked_add_signed(t));
        let entry = MemoryEntry {
            state: state.as_str().to_owned(),
            payload: CachedPayload {
                cached_at: now,
                data: payload.clone(),
            },
            expires_at,
        };
        self.entries.write().await.insert(key.clone(), entry);
        key
    }

    /// Read a cached payload, if present and unexpired.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the payload does not decode
    /// as `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        state: &StateCode,
        name: &str,
    ) -> Result<Option<T>, DbError> {
        let now = Utc::now();
        let data = self
            .entries
            .read()
            .await
            .get(&self.keys.entry(state, name))
            .filter(|e| e.is_live(now))
            .map(|e| e.payload.data.clone());
        Ok(data.map(serde_json::from_value).transpose()?)
    }

    /// Describe live entries for one state, or for every state.
    pub async fn info(&self, state: Option<&StateCode>) -> CacheInfo {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.is_live(now));

        let listed: Vec<CacheEntry> = entries
            .iter()
            .filter(|(_, e)| state.is_none_or(|s| s.as_str() == e.state))
            .map(|(key, e)| CacheEntry {
                key: key.clone(),
                cached_at: Some(e.payload.cached_at),
                ttl_seconds: e
                    .expires_at
                    .map(|at| at.signed_duration_since(now).num_seconds().max(0)),
            })
            .collect();

        CacheInfo {
            state: state.map(|s| s.as_str().to_owned()),
            count: listed.len(),
            entries: listed,
        }
    }

    /// Delete every entry for `state`. Returns how many were live.
    pub async fn invalidate(&self, state: &StateCode) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let mut removed = 0_usize;
        entries.retain(|_, e| {
            if e.state != state.as_str() {
                return true;
            }
            if e.is_live(now) {
                removed = removed.saturating_add(1);
            }
            false
        });
        tracing::info!(state = %state, removed, "Invalidated cache");
        removed
    }
}

/// Scrape cache backend selected by configuration.
#[derive(Clone)]
pub enum ScrapeCache {
    /// Redis-compatible server.
    Kv(KvCache),
    /// In-process map.
    Memory(MemoryCache),
}

impl ScrapeCache {
    /// Store a scraper payload. Returns the full key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend write fails.
    pub async fn put(
        &self,
        state: &StateCode,
        name: &str,
        payload: &serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<String, DbError> {
        match self {
            Self::Kv(kv) => kv.put(state, name, payload, ttl).await,
            Self::Memory(mem) => Ok(mem.put(state, name, payload, ttl).await),
        }
    }

    /// Read a cached payload.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or decode fails.
    pub async fn get<T: DeserializeOwned>(
        &self,
        state: &StateCode,
        name: &str,
    ) -> Result<Option<T>, DbError> {
        match self {
            Self::Kv(kv) => kv.get(state, name).await,
            Self::Memory(mem) => mem.get(state, name).await,
        }
    }

    /// Describe cached entries.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn info(&self, state: Option<&StateCode>) -> Result<CacheInfo, DbError> {
        match self {
            Self::Kv(kv) => kv.info(state).await,
            Self::Memory(mem) => Ok(mem.info(state).await),
        }
    }

    /// Delete every entry for `state`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend delete fails.
    pub async fn invalidate(&self, state: &StateCode) -> Result<usize, DbError> {
        match self {
            Self::Kv(kv) => kv.invalidate(state).await,
            Self::Memory(mem) => Ok(mem.invalidate(state).await),
        }
    }
}
