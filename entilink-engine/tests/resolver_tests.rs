//! Integration tests for single-entity resolution

use entilink_common::config::{EngineConfig, SimilarityPolicy};
use entilink_common::Error;
use entilink_engine::{Engine, Locale, NoopScorer, ResolveOptions};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

/// In-memory pool with the full schema installed. A single connection
/// keeps every query on the same in-memory database.
async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    entilink_common::db::schema::init_tables(&pool).await.unwrap();
    pool
}

async fn setup_engine(config: EngineConfig) -> Engine {
    let pool = setup_pool().await;
    let engine = Engine::new(pool, config);
    engine
        .register_entity_type("municipality", "Municipality")
        .await
        .unwrap();
    engine
}

fn de_opts() -> ResolveOptions {
    ResolveOptions {
        locale: Locale::from_tag("de-DE"),
        ..Default::default()
    }
}

#[tokio::test]
async fn get_or_create_is_idempotent() {
    let engine = setup_engine(EngineConfig::default()).await;

    let (first, created_first) = engine
        .get_or_create("municipality", "München", de_opts())
        .await
        .unwrap();
    let (second, created_second) = engine
        .get_or_create("municipality", "München", de_opts())
        .await
        .unwrap();

    assert!(created_first);
    assert!(!created_second);
    assert_eq!(first.guid, second.guid);
}

#[tokio::test]
async fn normalization_equivalent_names_resolve_to_one_entity() {
    let engine = setup_engine(EngineConfig::default()).await;

    let (first, _) = engine
        .get_or_create("municipality", "Stadt München", de_opts())
        .await
        .unwrap();
    let (second, created) = engine
        .get_or_create("municipality", "münchen", de_opts())
        .await
        .unwrap();

    assert!(!created);
    assert_eq!(first.guid, second.guid);
    assert_eq!(first.name_normalized, "muenchen");
}

#[tokio::test]
async fn unknown_entity_type_is_fatal() {
    let engine = setup_engine(EngineConfig::default()).await;

    let err = engine
        .get_or_create("galaxy", "Andromeda", ResolveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn external_id_is_authoritative() {
    let engine = setup_engine(EngineConfig::default()).await;

    let opts = ResolveOptions {
        external_id: Some("ags:09162000".to_string()),
        locale: Locale::German,
        ..Default::default()
    };
    let (first, created) = engine
        .get_or_create("municipality", "München", opts.clone())
        .await
        .unwrap();
    assert!(created);

    // Same external id under a completely different name still hits the
    // same row; name matching is bypassed entirely.
    let opts_renamed = ResolveOptions {
        external_id: Some("ags:09162000".to_string()),
        locale: Locale::German,
        ..Default::default()
    };
    let (second, created) = engine
        .get_or_create("municipality", "Landeshauptstadt Muenchen", opts_renamed)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(first.guid, second.guid);
}

#[tokio::test]
async fn similarity_at_threshold_matches_inclusively() {
    let engine = setup_engine(EngineConfig::default()).await;

    // 20-char key; a 3-substitution variant scores exactly 0.85
    let (original, _) = engine
        .get_or_create("municipality", "aaaaaaaaaaaaaaaaaaaa", ResolveOptions::default())
        .await
        .unwrap();
    let (matched, created) = engine
        .get_or_create("municipality", "aaaaaaaaaaaaaaaaabbb", ResolveOptions::default())
        .await
        .unwrap();

    assert!(!created, "0.85 against threshold 0.85 must match");
    assert_eq!(original.guid, matched.guid);
}

#[tokio::test]
async fn similarity_below_threshold_creates_new_entity() {
    let engine = setup_engine(EngineConfig::default()).await;

    // 25-char key; a 4-substitution variant scores 0.84
    let (original, _) = engine
        .get_or_create(
            "municipality",
            "aaaaaaaaaaaaaaaaaaaaaaaaa",
            ResolveOptions::default(),
        )
        .await
        .unwrap();
    let (other, created) = engine
        .get_or_create(
            "municipality",
            "aaaaaaaaaaaaaaaaaaaaabbbb",
            ResolveOptions::default(),
        )
        .await
        .unwrap();

    assert!(created, "0.84 against threshold 0.85 must not match");
    assert_ne!(original.guid, other.guid);
}

#[tokio::test]
async fn threshold_of_one_disables_fuzzy_step() {
    let engine = setup_engine(EngineConfig::default()).await;

    let (original, _) = engine
        .get_or_create("municipality", "Gummersbach", de_opts())
        .await
        .unwrap();
    let opts = ResolveOptions {
        similarity_threshold: Some(1.0),
        locale: Locale::German,
        ..Default::default()
    };
    let (other, created) = engine
        .get_or_create("municipality", "Gummersbachh", opts)
        .await
        .unwrap();

    assert!(created);
    assert_ne!(original.guid, other.guid);
}

#[tokio::test]
async fn noop_scorer_degrades_to_exact_match_or_create() {
    let pool = setup_pool().await;
    let engine = Engine::with_scorer(pool, EngineConfig::default(), Arc::new(NoopScorer));
    engine
        .register_entity_type("municipality", "Municipality")
        .await
        .unwrap();

    let (original, _) = engine
        .get_or_create("municipality", "Gummersbach", de_opts())
        .await
        .unwrap();
    // A near-duplicate that the strsim scorer would merge
    let (other, created) = engine
        .get_or_create("municipality", "Gummersbachh", de_opts())
        .await
        .unwrap();

    assert!(created);
    assert_ne!(original.guid, other.guid);

    // Exact matches still resolve
    let (again, created) = engine
        .get_or_create("municipality", "gummersbach", de_opts())
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(original.guid, again.guid);
}

#[tokio::test]
async fn flag_only_policy_creates_instead_of_merging() {
    let config = EngineConfig {
        similarity_policy: SimilarityPolicy::FlagOnly,
        ..Default::default()
    };
    let engine = setup_engine(config).await;

    let (original, _) = engine
        .get_or_create("municipality", "aaaaaaaaaaaaaaaaaaaa", ResolveOptions::default())
        .await
        .unwrap();
    let (other, created) = engine
        .get_or_create("municipality", "aaaaaaaaaaaaaaaaabbb", ResolveOptions::default())
        .await
        .unwrap();

    assert!(created, "flag-only must not silently merge");
    assert_ne!(original.guid, other.guid);
}

#[tokio::test]
async fn blank_name_is_invalid_input() {
    let engine = setup_engine(EngineConfig::default()).await;

    let err = engine
        .get_or_create("municipality", "  ···  ", ResolveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn rename_reruns_normalizer_and_surfaces_conflicts() {
    let engine = setup_engine(EngineConfig::default()).await;

    let (koeln, _) = engine
        .get_or_create("municipality", "Köln", de_opts())
        .await
        .unwrap();
    let (bonn, _) = engine
        .get_or_create("municipality", "Bonn", de_opts())
        .await
        .unwrap();

    let renamed = engine
        .rename_entity(bonn.guid, "Bad Godesberg", Locale::German)
        .await
        .unwrap();
    assert_eq!(renamed.name_normalized, "badgodesberg");
    assert_eq!(renamed.slug, "bad-godesberg");

    // Renaming onto an existing key must not merge
    let err = engine
        .rename_entity(renamed.guid, "Stadt Köln", Locale::German)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "got {err:?}");
    let _ = koeln;
}

#[tokio::test]
async fn soft_deleted_entities_do_not_block_recreation() {
    let engine = setup_engine(EngineConfig::default()).await;

    let (original, _) = engine
        .get_or_create("municipality", "Lindlar", de_opts())
        .await
        .unwrap();
    engine.deactivate_entity(original.guid).await.unwrap();

    let (recreated, created) = engine
        .get_or_create("municipality", "Lindlar", de_opts())
        .await
        .unwrap();
    assert!(created, "inactive rows must not participate in resolution");
    assert_ne!(original.guid, recreated.guid);
}

#[tokio::test]
async fn entity_type_mutation_invalidates_and_persists() {
    let engine = setup_engine(EngineConfig::default()).await;

    // Prime the type cache
    engine
        .get_or_create("municipality", "Essen", de_opts())
        .await
        .unwrap();

    engine
        .rename_entity_type("municipality", "Municipality (DE)")
        .await
        .unwrap();

    // Registration of an existing slug returns the stored row
    let entity_type = engine
        .register_entity_type("municipality", "ignored")
        .await
        .unwrap();
    assert_eq!(entity_type.display_name, "Municipality (DE)");

    let err = engine
        .rename_entity_type("galaxy", "Galaxy")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn merge_attributes_is_shallow_and_preserves_existing_keys() {
    let engine = setup_engine(EngineConfig::default()).await;

    let opts = ResolveOptions {
        attributes: Some(serde_json::json!({"state": "NRW", "population": 50000})),
        locale: Locale::German,
        ..Default::default()
    };
    let (entity, _) = engine
        .get_or_create("municipality", "Wipperfürth", opts)
        .await
        .unwrap();

    let updated = engine
        .merge_entity_attributes(entity.guid, &serde_json::json!({"population": 51000}))
        .await
        .unwrap();

    assert_eq!(updated.attributes["state"], "NRW");
    assert_eq!(updated.attributes["population"], 51000);
}

#[tokio::test]
async fn merge_attributes_on_deactivated_entity_is_not_found() {
    let engine = setup_engine(EngineConfig::default()).await;

    let (entity, _) = engine
        .get_or_create("municipality", "Hückeswagen", de_opts())
        .await
        .unwrap();
    engine.deactivate_entity(entity.guid).await.unwrap();

    // The row still exists for the read, but the active-only write
    // must report it gone rather than claim the merge persisted.
    let err = engine
        .merge_entity_attributes(entity.guid, &serde_json::json!({"state": "NRW"}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
