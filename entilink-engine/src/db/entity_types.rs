//! Entity-type reference data queries

use entilink_common::db::models::EntityType;
use entilink_common::error::is_unique_violation;
use entilink_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Load entity type by slug
pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<EntityType>> {
    let row = sqlx::query("SELECT guid, slug, display_name FROM entity_types WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(EntityType::from_row(&row)?)),
        None => Ok(None),
    }
}

/// Get an entity type by slug, creating it if missing.
///
/// Race-safe: a concurrent insert of the same slug is converted into a
/// lookup of the winning row.
pub async fn get_or_create(
    pool: &SqlitePool,
    slug: &str,
    display_name: &str,
) -> Result<EntityType> {
    if let Some(existing) = find_by_slug(pool, slug).await? {
        return Ok(existing);
    }

    let entity_type = EntityType {
        guid: Uuid::new_v4(),
        slug: slug.to_string(),
        display_name: display_name.to_string(),
    };

    let inserted = sqlx::query(
        "INSERT INTO entity_types (guid, slug, display_name) VALUES (?, ?, ?)",
    )
    .bind(entity_type.guid.to_string())
    .bind(&entity_type.slug)
    .bind(&entity_type.display_name)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => {
            tracing::info!(slug = %slug, "Created entity type");
            Ok(entity_type)
        }
        Err(err) if is_unique_violation(&err) => find_by_slug(pool, slug)
            .await?
            .ok_or_else(|| Error::Internal(format!("entity type {} vanished after conflict", slug))),
        Err(err) => Err(err.into()),
    }
}

/// Update the display name of an entity type.
///
/// Callers must invalidate the type cache afterwards.
pub async fn update_display_name(pool: &SqlitePool, slug: &str, display_name: &str) -> Result<()> {
    let result = sqlx::query("UPDATE entity_types SET display_name = ? WHERE slug = ?")
        .bind(display_name)
        .bind(slug)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Unknown entity type: {}", slug)));
    }
    Ok(())
}
