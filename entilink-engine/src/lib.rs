//! Entity identity-resolution and deduplication engine
//!
//! Turns free-text names produced by independent intake paths (bulk
//! extraction, interactive write commands, API imports) into references
//! to a single canonical entity record. Uniqueness is enforced by the
//! storage layer's partial unique indexes; no in-process lock coordinates
//! writers, so concurrent processes converge on one row per identity.

pub mod db;
pub mod services;

pub use entilink_common::{Error, Result};
pub use services::batch::BatchResolver;
pub use services::linker::{RelationLinker, RelationPair};
pub use services::normalizer::{normalize, slugify, Locale};
pub use services::resolver::{MatchResolver, ResolveOptions};
pub use services::similarity::{NoopScorer, SimilarityScorer, StrsimScorer};
pub use services::type_cache::EntityTypeCache;

use entilink_common::config::EngineConfig;
use entilink_common::db::models::Entity;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

/// Facade bundling the resolution services behind one construction point.
///
/// Collaborating services (extraction pipeline, write-command executor,
/// import services) hold one `Engine` and call the three public
/// operations; the similarity capability is injected here so call sites
/// never branch on its availability.
#[derive(Clone)]
pub struct Engine {
    resolver: MatchResolver,
    batch: BatchResolver,
    linker: RelationLinker,
    type_cache: EntityTypeCache,
}

impl Engine {
    /// Create an engine with the default strsim-backed scorer
    pub fn new(db: SqlitePool, config: EngineConfig) -> Self {
        Self::with_scorer(db, config, Arc::new(StrsimScorer))
    }

    /// Create an engine with an explicit similarity capability.
    ///
    /// Pass [`NoopScorer`] to disable fuzzy matching; resolution then
    /// degrades to exact-match-or-create without any call-site branching.
    pub fn with_scorer(
        db: SqlitePool,
        config: EngineConfig,
        scorer: Arc<dyn SimilarityScorer>,
    ) -> Self {
        let type_cache = EntityTypeCache::new(config.type_cache_ttl_secs);
        let resolver = MatchResolver::new(db.clone(), config.clone(), scorer, type_cache.clone());
        let batch = BatchResolver::new(db.clone(), config.clone(), resolver.clone());
        let linker = RelationLinker::new(db, config);
        Self {
            resolver,
            batch,
            linker,
            type_cache,
        }
    }

    /// Resolve a single name to an entity, creating it if needed.
    ///
    /// Returns the entity and whether this call created it.
    pub async fn get_or_create(
        &self,
        entity_type_slug: &str,
        name: &str,
        opts: ResolveOptions,
    ) -> Result<(Entity, bool)> {
        self.resolver
            .get_or_create(entity_type_slug, name, opts)
            .await
    }

    /// Resolve a batch of names to entities, creating where needed.
    ///
    /// Every input name appears as a key in the returned mapping.
    pub async fn resolve_batch(
        &self,
        entity_type_slug: &str,
        names: &[String],
        locale: Locale,
    ) -> Result<HashMap<String, Entity>> {
        self.batch
            .resolve_batch(entity_type_slug, names, locale)
            .await
    }

    /// Create any missing relations among the given pairs.
    ///
    /// Returns the number of relation rows actually inserted.
    pub async fn link_batch(&self, pairs: &[RelationPair]) -> Result<u64> {
        self.linker.link_batch(pairs).await
    }

    /// Invalidate the cached entity-type row for `slug`.
    ///
    /// Must be called after any entity-type mutation so readers do not
    /// serve stale reference data for up to the cache TTL.
    pub async fn invalidate_entity_type(&self, slug: &str) {
        self.type_cache.invalidate(slug).await;
    }

    /// Register an entity type (idempotent, race-safe)
    pub async fn register_entity_type(
        &self,
        slug: &str,
        display_name: &str,
    ) -> Result<entilink_common::db::models::EntityType> {
        db::entity_types::get_or_create(self.resolver.pool(), slug, display_name).await
    }

    /// Update an entity type's display name, invalidating the cache
    pub async fn rename_entity_type(&self, slug: &str, display_name: &str) -> Result<()> {
        db::entity_types::update_display_name(self.resolver.pool(), slug, display_name).await?;
        self.type_cache.invalidate(slug).await;
        Ok(())
    }

    /// Rename an entity, re-running normalization and re-checking the
    /// uniqueness invariant. Conflicts surface; they never merge.
    pub async fn rename_entity(
        &self,
        guid: uuid::Uuid,
        new_name: &str,
        locale: Locale,
    ) -> Result<Entity> {
        self.resolver.rename(guid, new_name, locale).await
    }

    /// Shallow-merge new attributes into an entity
    pub async fn merge_entity_attributes(
        &self,
        guid: uuid::Uuid,
        patch: &serde_json::Value,
    ) -> Result<Entity> {
        self.resolver.merge_attributes(guid, patch).await
    }

    /// Soft delete an entity
    pub async fn deactivate_entity(&self, guid: uuid::Uuid) -> Result<()> {
        self.resolver.deactivate(guid).await
    }
}
