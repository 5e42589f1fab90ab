//! Bulk name resolution for extraction pipelines
//!
//! Normalizes every input once, deduplicates within the batch by
//! normalized key before touching storage, then resolves the distinct
//! keys in fixed-size chunks — one `IN (...)` query per chunk, never one
//! query per name. Keys still unmatched after all chunks go through the
//! race-safe single resolver.

use entilink_common::config::EngineConfig;
use entilink_common::db::models::Entity;
use entilink_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::db;
use crate::services::normalizer::{normalize, Locale};
use crate::services::resolver::{MatchResolver, ResolveOptions};

/// Chunked bulk resolver built on [`MatchResolver`]
#[derive(Clone)]
pub struct BatchResolver {
    db: SqlitePool,
    config: EngineConfig,
    resolver: MatchResolver,
}

impl BatchResolver {
    pub fn new(db: SqlitePool, config: EngineConfig, resolver: MatchResolver) -> Self {
        Self {
            db,
            config,
            resolver,
        }
    }

    /// Resolve every input name to an entity, creating where needed.
    ///
    /// Postconditions: every input name is a key in the returned map,
    /// and equivalent normalized keys — whether they collided inside the
    /// batch or against pre-existing rows — map to the same entity.
    ///
    /// Failure mode is best-effort per statement: an error aborts the
    /// call and already-created rows stay committed. Re-running the same
    /// batch is safe because single resolution is idempotent.
    pub async fn resolve_batch(
        &self,
        entity_type_slug: &str,
        names: &[String],
        locale: Locale,
    ) -> Result<HashMap<String, Entity>> {
        let entity_type = self
            .resolver
            .type_cache()
            .resolve(&self.db, entity_type_slug)
            .await?;

        // Normalize once per input; remember the first spelling seen for
        // each distinct key so created rows get a stable display name.
        let mut key_of_name: Vec<(String, String)> = Vec::with_capacity(names.len());
        let mut representative: HashMap<String, String> = HashMap::new();
        for name in names {
            let key = normalize(name, locale);
            if key.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Name normalizes to an empty key: {:?}",
                    name
                )));
            }
            representative
                .entry(key.clone())
                .or_insert_with(|| name.clone());
            key_of_name.push((name.clone(), key));
        }

        let distinct_keys: Vec<String> = representative.keys().cloned().collect();
        debug!(
            inputs = names.len(),
            distinct = distinct_keys.len(),
            "Resolving batch"
        );

        // Chunked lookups against existing rows
        let mut by_key: HashMap<String, Entity> = HashMap::with_capacity(distinct_keys.len());
        for chunk in distinct_keys.chunks(self.config.batch_chunk_size) {
            let found =
                db::entities::find_by_normalized_keys(&self.db, entity_type.guid, chunk).await?;
            for entity in found {
                by_key.insert(entity.name_normalized.clone(), entity);
            }
        }

        // Stragglers go through get_or_create, preserving race safety
        // against concurrent batches creating the same keys.
        for key in &distinct_keys {
            if by_key.contains_key(key) {
                continue;
            }
            let name = &representative[key];
            let (entity, created) = self
                .resolver
                .get_or_create(
                    entity_type_slug,
                    name,
                    ResolveOptions {
                        locale,
                        ..Default::default()
                    },
                )
                .await?;
            debug!(name = %name, created, "Resolved batch straggler");
            // The resolver may have fuzzy-matched a row with a different
            // key; map this batch key to whatever it returned.
            by_key.insert(key.clone(), entity);
        }

        // Fan the distinct entities back out to every input spelling
        let mut mapping = HashMap::with_capacity(key_of_name.len());
        for (name, key) in key_of_name {
            let entity = by_key.get(&key).ok_or_else(|| {
                Error::Internal(format!("batch key {:?} missing after resolution", key))
            })?;
            mapping.insert(name, entity.clone());
        }

        Ok(mapping)
    }
}
