//! Relation-type reference data queries

use entilink_common::db::models::RelationType;
use entilink_common::error::is_unique_violation;
use entilink_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Load relation type by slug
pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<RelationType>> {
    let row = sqlx::query(
        "SELECT guid, slug, source_type, target_type FROM relation_types WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(RelationType::from_row(&row)?)),
        None => Ok(None),
    }
}

/// Get a relation type by slug, creating it with the given endpoint
/// types if missing. Race-safe in the same way as entity creation.
pub async fn get_or_create(
    pool: &SqlitePool,
    slug: &str,
    source_type: Uuid,
    target_type: Uuid,
) -> Result<RelationType> {
    if let Some(existing) = find_by_slug(pool, slug).await? {
        return Ok(existing);
    }

    let relation_type = RelationType {
        guid: Uuid::new_v4(),
        slug: slug.to_string(),
        source_type,
        target_type,
    };

    let inserted = sqlx::query(
        "INSERT INTO relation_types (guid, slug, source_type, target_type) VALUES (?, ?, ?, ?)",
    )
    .bind(relation_type.guid.to_string())
    .bind(&relation_type.slug)
    .bind(relation_type.source_type.to_string())
    .bind(relation_type.target_type.to_string())
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => {
            tracing::info!(slug = %slug, "Created relation type");
            Ok(relation_type)
        }
        Err(err) if is_unique_violation(&err) => find_by_slug(pool, slug).await?.ok_or_else(|| {
            Error::Internal(format!("relation type {} vanished after conflict", slug))
        }),
        Err(err) => Err(err.into()),
    }
}
