//! Typed relation linking between already-resolved entities
//!
//! No fuzzy matching here: both endpoints are resolved identities, so
//! equality is exact. Relation types are resolved once per distinct slug
//! through a TTL cache; pair existence is checked in chunks on a
//! composite key.

use entilink_common::config::EngineConfig;
use entilink_common::db::models::{Entity, EntityRelation, RelationType};
use entilink_common::error::is_unique_violation;
use entilink_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::db;
use crate::db::relations::PairKey;
use crate::services::type_cache::TtlCache;

/// One requested link between two resolved entities
#[derive(Debug, Clone)]
pub struct RelationPair {
    pub source: Entity,
    pub target: Entity,
    /// Relation-type slug, e.g. "member_of"
    pub relation_type: String,
    pub confidence: f64,
}

/// Batch relation creator with relation-type caching
#[derive(Clone)]
pub struct RelationLinker {
    db: SqlitePool,
    config: EngineConfig,
    relation_types: TtlCache<RelationType>,
}

impl RelationLinker {
    pub fn new(db: SqlitePool, config: EngineConfig) -> Self {
        let relation_types = TtlCache::new(config.type_cache_ttl_secs);
        Self {
            db,
            config,
            relation_types,
        }
    }

    /// Create any relations among `pairs` that do not already exist.
    ///
    /// Returns the number of rows actually inserted. Duplicate pairs in
    /// the input, pairs already present as active relations, and pairs a
    /// concurrent writer inserts first all count zero.
    pub async fn link_batch(&self, pairs: &[RelationPair]) -> Result<u64> {
        if pairs.is_empty() {
            return Ok(0);
        }

        // Resolve each distinct slug once; endpoint types come from the
        // first pair using the slug and later pairs must agree.
        let mut types_by_slug: HashMap<String, RelationType> = HashMap::new();
        for pair in pairs {
            if types_by_slug.contains_key(&pair.relation_type) {
                continue;
            }
            let relation_type = self
                .resolve_relation_type(
                    &pair.relation_type,
                    pair.source.entity_type,
                    pair.target.entity_type,
                )
                .await?;
            types_by_slug.insert(pair.relation_type.clone(), relation_type);
        }

        // Dedup on (source, target, relation_type), validating endpoint
        // types against the relation type's declared pair.
        let mut seen: HashSet<PairKey> = HashSet::new();
        let mut deduped: Vec<(PairKey, f64)> = Vec::new();
        for pair in pairs {
            let relation_type = &types_by_slug[&pair.relation_type];
            if pair.source.entity_type != relation_type.source_type
                || pair.target.entity_type != relation_type.target_type
            {
                return Err(Error::InvalidInput(format!(
                    "Relation {:?} does not allow {} -> {}",
                    pair.relation_type, pair.source.entity_type, pair.target.entity_type
                )));
            }
            let key = (pair.source.guid, pair.target.guid, relation_type.guid);
            if seen.insert(key) {
                deduped.push((key, pair.confidence));
            }
        }

        // Chunked existence check over the exact pair set
        let keys: Vec<PairKey> = deduped.iter().map(|(key, _)| *key).collect();
        let mut existing: HashSet<PairKey> = HashSet::new();
        for chunk in keys.chunks(self.config.batch_chunk_size) {
            existing.extend(db::relations::find_existing_pairs(&self.db, chunk).await?);
        }

        let mut created = 0u64;
        for ((source, target, relation_type), confidence) in deduped {
            if existing.contains(&(source, target, relation_type)) {
                continue;
            }
            let relation = EntityRelation::new(source, target, relation_type, confidence);
            match db::relations::insert(&self.db, &relation).await {
                Ok(()) => created += 1,
                // Concurrent writer linked the same pair first
                Err(Error::Database(err)) if is_unique_violation(&err) => {
                    debug!(source = %source, target = %target, "Relation already linked");
                }
                Err(err) => return Err(err),
            }
        }

        debug!(
            requested = pairs.len(),
            distinct = keys.len(),
            created,
            "Linked relation batch"
        );
        Ok(created)
    }

    async fn resolve_relation_type(
        &self,
        slug: &str,
        source_type: Uuid,
        target_type: Uuid,
    ) -> Result<RelationType> {
        if let Some(relation_type) = self.relation_types.get(slug).await {
            return Ok(relation_type);
        }

        let relation_type =
            db::relation_types::get_or_create(&self.db, slug, source_type, target_type).await?;
        self.relation_types
            .insert(slug.to_string(), relation_type.clone())
            .await;
        Ok(relation_type)
    }
}
