//! TTL-bounded caches for read-mostly reference data
//!
//! Entity-type and relation-type rows are shared across all workers and
//! change rarely, but the cache still carries an explicit expiry plus an
//! invalidation hook for type mutations. A map that only grows is a
//! defect, not a feature; here staleness is bounded by the TTL and the
//! population is bounded by the reference tables themselves.

use entilink_common::db::models::EntityType;
use entilink_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::db;

/// Generic slug-keyed cache with per-entry expiry
#[derive(Clone)]
pub struct TtlCache<V: Clone> {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, (V, Instant)>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch a live entry; expired entries are evicted and miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, inserted_at)) if inserted_at.elapsed() < self.ttl => {
                    return Some(value.clone());
                }
                Some(_) => {} // expired, evict below
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if let Some((_, inserted_at)) = entries.get(key) {
            if inserted_at.elapsed() >= self.ttl {
                entries.remove(key);
            }
        }
        None
    }

    pub async fn insert(&self, key: String, value: V) {
        self.entries.write().await.insert(key, (value, Instant::now()));
    }

    /// Drop one entry immediately (mutation hook)
    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}

/// Cache over `entity_types` keyed by slug
#[derive(Clone)]
pub struct EntityTypeCache {
    cache: TtlCache<EntityType>,
}

impl EntityTypeCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            cache: TtlCache::new(ttl_secs),
        }
    }

    /// Resolve a type slug, hitting storage on a cache miss.
    ///
    /// An unknown slug is fatal to the calling operation.
    pub async fn resolve(&self, db: &SqlitePool, slug: &str) -> Result<EntityType> {
        if let Some(entity_type) = self.cache.get(slug).await {
            return Ok(entity_type);
        }

        let entity_type = db::entity_types::find_by_slug(db, slug)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Unknown entity type: {}", slug)))?;

        tracing::debug!(slug = %slug, "Cached entity type");
        self.cache.insert(slug.to_string(), entity_type.clone()).await;
        Ok(entity_type)
    }

    /// Must be called after any entity-type mutation.
    pub async fn invalidate(&self, slug: &str) {
        self.cache.invalidate(slug).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache: TtlCache<u32> = TtlCache::new(0);
        cache.insert("a".to_string(), 1).await;
        // TTL of zero expires immediately
        assert_eq!(cache.get("a").await, None);
    }

    #[tokio::test]
    async fn invalidate_drops_entry() {
        let cache: TtlCache<u32> = TtlCache::new(3600);
        cache.insert("a".to_string(), 1).await;
        assert_eq!(cache.get("a").await, Some(1));
        cache.invalidate("a").await;
        assert_eq!(cache.get("a").await, None);
    }

    #[tokio::test]
    async fn live_entries_are_served() {
        let cache: TtlCache<u32> = TtlCache::new(3600);
        cache.insert("a".to_string(), 7).await;
        assert_eq!(cache.get("a").await, Some(7));
    }
}
