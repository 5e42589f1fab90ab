//! Single-entity resolution: race-safe `get_or_create`
//!
//! Resolution order, first match wins:
//! 1. exact `(entity_type, external_id)` — authoritative, skips names
//! 2. exact `(entity_type, normalized key)`
//! 3. fuzzy match against a bounded, index-served candidate set
//! 4. create; a concurrent-insert uniqueness violation is converted
//!    back into a lookup of the winning row
//!
//! Step 4 is what makes concurrent callers converge on one row per
//! identity: the storage layer's unique index is the single source of
//! truth, with no in-process lock.

use entilink_common::config::{EngineConfig, SimilarityPolicy};
use entilink_common::db::models::Entity;
use entilink_common::error::is_unique_violation;
use entilink_common::{Error, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db;
use crate::services::normalizer::{normalize, slugify, Locale};
use crate::services::similarity::SimilarityScorer;
use crate::services::type_cache::EntityTypeCache;

/// Per-call options for [`MatchResolver::get_or_create`]
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Authoritative source key; when present, name matching is skipped
    /// if an entity with this key exists.
    pub external_id: Option<String>,
    /// Locale selecting the normalizer's transliteration table
    pub locale: Locale,
    /// Initial attributes for a newly created entity
    pub attributes: Option<serde_json::Value>,
    /// Override for the configured similarity threshold; values >= 1.0
    /// disable the fuzzy step for this call.
    pub similarity_threshold: Option<f64>,
}

/// Race-safe single-entity resolver
#[derive(Clone)]
pub struct MatchResolver {
    db: SqlitePool,
    config: EngineConfig,
    scorer: Arc<dyn SimilarityScorer>,
    type_cache: EntityTypeCache,
}

impl MatchResolver {
    pub fn new(
        db: SqlitePool,
        config: EngineConfig,
        scorer: Arc<dyn SimilarityScorer>,
        type_cache: EntityTypeCache,
    ) -> Self {
        Self {
            db,
            config,
            scorer,
            type_cache,
        }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.db
    }

    pub(crate) fn type_cache(&self) -> &EntityTypeCache {
        &self.type_cache
    }

    /// Resolve one name to an entity, creating it if nothing matches.
    ///
    /// The `created` flag comes directly from the branch that performed
    /// the insert; it is never inferred from timestamps after the fact.
    pub async fn get_or_create(
        &self,
        entity_type_slug: &str,
        name: &str,
        opts: ResolveOptions,
    ) -> Result<(Entity, bool)> {
        let entity_type = self.type_cache.resolve(&self.db, entity_type_slug).await?;
        let threshold = opts
            .similarity_threshold
            .unwrap_or(self.config.similarity_threshold);

        // Step 1: authoritative external id
        if let Some(external_id) = &opts.external_id {
            if let Some(entity) =
                db::entities::find_by_external_id(&self.db, entity_type.guid, external_id).await?
            {
                debug!(external_id = %external_id, "Resolved by external id");
                return Ok((entity, false));
            }
        }

        let key = normalize(name, opts.locale);
        if key.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Name normalizes to an empty key: {:?}",
                name
            )));
        }

        // Step 2: exact normalized key
        if let Some(entity) =
            db::entities::find_by_normalized(&self.db, entity_type.guid, &key).await?
        {
            return Ok((entity, false));
        }

        // Step 3: fuzzy match, unless disabled
        if threshold < 1.0 {
            if let Some(candidate) = self.best_similar(entity_type.guid, &key, threshold).await? {
                match self.config.similarity_policy {
                    SimilarityPolicy::AutoMerge => {
                        debug!(
                            name = %name,
                            matched = %candidate.name,
                            "Fuzzy match treated as identity"
                        );
                        return Ok((candidate, false));
                    }
                    SimilarityPolicy::FlagOnly => {
                        warn!(
                            name = %name,
                            candidate = %candidate.name,
                            candidate_guid = %candidate.guid,
                            "Near-duplicate flagged for review; creating separate entity"
                        );
                    }
                }
            }
        }

        // Step 4: create, recovering from a lost race
        self.create_or_return_winner(&entity_type.guid, name, &key, opts)
            .await
    }

    /// Highest-scoring candidate at or above threshold, if any
    async fn best_similar(
        &self,
        entity_type: Uuid,
        key: &str,
        threshold: f64,
    ) -> Result<Option<Entity>> {
        let prefix: String = key
            .chars()
            .take(self.config.candidate_prefix_len)
            .collect();
        let candidates = db::entities::candidates_by_prefix(
            &self.db,
            entity_type,
            &prefix,
            self.config.candidate_limit,
        )
        .await?;

        let mut best: Option<(f64, Entity)> = None;
        for candidate in candidates {
            let score = self.scorer.score(key, &candidate.name_normalized);
            if score >= threshold && best.as_ref().map_or(true, |(b, _)| score > *b) {
                best = Some((score, candidate));
            }
        }

        Ok(best.map(|(_, entity)| entity))
    }

    async fn create_or_return_winner(
        &self,
        entity_type: &Uuid,
        name: &str,
        key: &str,
        opts: ResolveOptions,
    ) -> Result<(Entity, bool)> {
        let entity = Entity::new(
            *entity_type,
            name.trim().to_string(),
            key.to_string(),
            slugify(name, opts.locale),
            opts.external_id.clone(),
            opts.attributes,
        );

        match db::entities::insert(&self.db, &entity).await {
            Ok(()) => {
                debug!(name = %entity.name, guid = %entity.guid, "Created entity");
                Ok((entity, true))
            }
            Err(Error::Database(err)) if is_unique_violation(&err) => {
                debug!(name = %name, "Lost creation race, re-reading winner");

                // The conflict may be on either unique index.
                if let Some(external_id) = &opts.external_id {
                    if let Some(winner) =
                        db::entities::find_by_external_id(&self.db, *entity_type, external_id)
                            .await?
                    {
                        return Ok((winner, false));
                    }
                }

                let winner = db::entities::find_by_normalized(&self.db, *entity_type, key)
                    .await?
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "entity with key {:?} vanished after constraint conflict",
                            key
                        ))
                    })?;
                Ok((winner, false))
            }
            Err(err) => Err(err),
        }
    }

    /// Caller-driven rename.
    ///
    /// Re-runs the normalizer and re-derives the slug; a uniqueness
    /// conflict with another active entity surfaces as `Error::Conflict`
    /// rather than silently merging.
    pub async fn rename(&self, guid: Uuid, new_name: &str, locale: Locale) -> Result<Entity> {
        let key = normalize(new_name, locale);
        if key.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Name normalizes to an empty key: {:?}",
                new_name
            )));
        }
        let slug = slugify(new_name, locale);

        let updated =
            db::entities::update_name(&self.db, guid, new_name.trim(), &key, &slug).await;

        match updated {
            Ok(0) => Err(Error::NotFound(format!("No active entity {}", guid))),
            Ok(_) => db::entities::find_by_guid(&self.db, guid)
                .await?
                .ok_or_else(|| Error::Internal(format!("entity {} vanished after rename", guid))),
            Err(Error::Database(err)) if is_unique_violation(&err) => Err(Error::Conflict(
                format!("Another active entity already has key {:?}", key),
            )),
            Err(err) => Err(err),
        }
    }

    /// Shallow-merge a patch into the entity's attribute map.
    ///
    /// Read-merge-write: concurrent merges of the same entity are
    /// last-writer-wins at the key level.
    pub async fn merge_attributes(
        &self,
        guid: Uuid,
        patch: &serde_json::Value,
    ) -> Result<Entity> {
        let entity = db::entities::find_by_guid(&self.db, guid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No entity {}", guid)))?;

        let mut merged = entity.attributes.clone();
        match (merged.as_object_mut(), patch.as_object()) {
            (Some(base), Some(patch_map)) => {
                for (k, v) in patch_map {
                    base.insert(k.clone(), v.clone());
                }
            }
            _ => {
                return Err(Error::InvalidInput(
                    "Entity attributes must be a JSON object".to_string(),
                ))
            }
        }

        // The update filters to active rows; a zero count means the
        // entity was deactivated after the read above.
        let updated = db::entities::update_attributes(&self.db, guid, &merged).await?;
        if updated == 0 {
            return Err(Error::NotFound(format!("No active entity {}", guid)));
        }
        Ok(Entity {
            attributes: merged,
            ..entity
        })
    }

    /// Soft delete an entity
    pub async fn deactivate(&self, guid: Uuid) -> Result<()> {
        let updated = db::entities::deactivate(&self.db, guid).await?;
        if updated == 0 {
            return Err(Error::NotFound(format!("No active entity {}", guid)));
        }
        debug!(guid = %guid, "Deactivated entity");
        Ok(())
    }
}
