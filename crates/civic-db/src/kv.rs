//! Redis-compatible scrape cache operations.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{prefix}:{STATE}:{name}` | JSON | Cached payload envelope |
//! | `{prefix}:{STATE}:index` | Set | Keys cached for one state |
//! | `{prefix}:states` | Set | States with at least one cached key |

use std::time::Duration;

use chrono::{DateTime, Utc};
use civic_types::{CacheEntry, CacheInfo, StateCode};
use fred::prelude::*;
use fred::types::Expiration;
use serde::de::DeserializeOwned;

use crate::cache::{CacheKeys, CachedPayload};
use crate::error::DbError;

/// Connection handle to a Redis-compatible cache.
///
/// Wraps a [`fred::prelude::Client`] and maintains the per-state key
/// index alongside each cached payload.
#[derive(Clone)]
pub struct KvCache {
    client: Client,
    keys: CacheKeys,
}

impl KvCache {
    /// Connect to the store at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Kv`] if the connection fails.
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid KV URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!(prefix = key_prefix, "Connected to KV cache");
        Ok(Self {
            client,
            keys: CacheKeys::new(key_prefix),
        })
    }

    /// Store `payload` under `name` for `state`, optionally expiring after
    /// `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the payload cannot be encoded.
    /// Returns [`DbError::Kv`] if a write fails.
    pub async fn put(
        &self,
        state: &StateCode,
        name: &str,
        payload: &serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<String, DbError> {
        let key = self.keys.entry(state, name);
        let envelope = CachedPayload {
            cached_at: Utc::now(),
            data: payload.clone(),
        };
        let json = serde_json::to_string(&envelope)?;
        let expiration = ttl.map(|t| Expiration::EX(i64::try_from(t.as_secs()).unwrap_or(i64::MAX)));

        let _: () = self
            .client
            .set(key.as_str(), json.as_str(), expiration, None, false)
            .await?;
        let _: u32 = self
            .client
            .sadd(self.keys.index(state).as_str(), key.as_str())
            .await?;
        let _: u32 = self
            .client
            .sadd(self.keys.states().as_str(), state.as_str())
            .await?;

        tracing::debug!(key = %key, ttl_secs = ttl.map(|t| t.as_secs()), "Cached payload");
        Ok(key)
    }

    /// Read a cached payload, if present.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the stored value is not a valid
    /// envelope, or [`DbError::Kv`] if the read fails.
    pub async fn get<T: DeserializeOwned>(
        &self,
        state: &StateCode,
        name: &str,
    ) -> Result<Option<T>, DbError> {
        let raw: Option<String> = self.client.get(self.keys.entry(state, name).as_str()).await?;
        raw.map(|s| {
            let envelope: CachedPayload = serde_json::from_str(&s)?;
            Ok(serde_json::from_value(envelope.data)?)
        })
        .transpose()
    }

    /// Describe cached entries for one state, or for every state.
    ///
    /// Index members whose key has expired are pruned along the way.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Kv`] if a read fails.
    pub async fn info(&self, state: Option<&StateCode>) -> Result<CacheInfo, DbError> {
        let states: Vec<String> = match state {
            Some(state) => vec![state.as_str().to_owned()],
            None => self.client.smembers(self.keys.states().as_str()).await?,
        };

        let mut entries = Vec::new();
        for code in &states {
            let index = self.keys.index_for(code);
            let members: Vec<String> = self.client.smembers(index.as_str()).await?;
            for key in members {
                // -2: key is gone, -1: key has no expiry.
                let ttl: i64 = self.client.ttl(key.as_str()).await?;
                if ttl == -2 {
                    let _: u32 = self.client.srem(index.as_str(), key.as_str()).await?;
                    continue;
                }
                let raw: Option<String> = self.client.get(key.as_str()).await?;
                entries.push(CacheEntry {
                    cached_at: raw.as_deref().and_then(cached_at),
                    ttl_seconds: (ttl >= 0).then_some(ttl),
                    key,
                });
            }
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(CacheInfo {
            state: state.map(|s| s.as_str().to_owned()),
            count: entries.len(),
            entries,
        })
    }

    /// Delete every cached entry for `state`. Returns how many payload keys
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Kv`] if a delete fails.
    pub async fn invalidate(&self, state: &StateCode) -> Result<usize, DbError> {
        let index = self.keys.index(state);
        let members: Vec<String> = self.client.smembers(index.as_str()).await?;

        let removed: i64 = if members.is_empty() {
            0
        } else {
            self.client.del(members).await?
        };
        let _: i64 = self.client.del(index.as_str()).await?;
        let _: u32 = self
            .client
            .srem(self.keys.states().as_str(), state.as_str())
            .await?;

        tracing::info!(state = %state, removed, "Invalidated cache");
        Ok(usize::try_from(removed).unwrap_or(0))
    }
}

/// Pull `cachedAt` out of a stored envelope without decoding the payload.
fn cached_at(raw: &str) -> Option<DateTime<Utc>> {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Stamp {
        cached_at: DateTime<Utc>,
    }
    serde_json::from_str::<Stamp>(raw).ok().map(|s| s.cached_at)
}
