//! Schema creation for the identity-resolution tables
//!
//! All statements are idempotent (`IF NOT EXISTS`) so startup can run
//! them unconditionally. The partial unique indexes on `entities` and
//! `entity_relations` are the storage-level enforcement of the engine's
//! uniqueness invariants; race safety in the resolver depends on them.

use crate::Result;
use sqlx::SqlitePool;

/// Create all tables and indexes used by the resolution engine
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    create_entity_types_table(pool).await?;
    create_entities_table(pool).await?;
    create_relation_types_table(pool).await?;
    create_entity_relations_table(pool).await?;

    tracing::info!(
        "Database tables initialized (entity_types, entities, relation_types, entity_relations)"
    );

    Ok(())
}

async fn create_entity_types_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entity_types (
            guid TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_entities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entities (
            guid TEXT PRIMARY KEY,
            entity_type TEXT NOT NULL REFERENCES entity_types(guid),
            name TEXT NOT NULL,
            name_normalized TEXT NOT NULL,
            slug TEXT NOT NULL,
            external_id TEXT,
            attributes TEXT NOT NULL DEFAULT '{}',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Uniqueness among active rows only: soft-deleted entities keep their
    // keys without blocking re-creation.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_entities_type_normalized
        ON entities(entity_type, name_normalized)
        WHERE is_active = 1
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_entities_type_external
        ON entities(entity_type, external_id)
        WHERE external_id IS NOT NULL AND is_active = 1
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_relation_types_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS relation_types (
            guid TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            source_type TEXT NOT NULL REFERENCES entity_types(guid),
            target_type TEXT NOT NULL REFERENCES entity_types(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_entity_relations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entity_relations (
            guid TEXT PRIMARY KEY,
            source_id TEXT NOT NULL REFERENCES entities(guid),
            target_id TEXT NOT NULL REFERENCES entities(guid),
            relation_type TEXT NOT NULL REFERENCES relation_types(guid),
            confidence REAL NOT NULL DEFAULT 1.0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_relations_pair
        ON entity_relations(source_id, target_id, relation_type)
        WHERE is_active = 1
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_relations_source ON entity_relations(source_id)")
        .execute(pool)
        .await?;

    Ok(())
}
