//! Entity persistence and lookup queries
//!
//! All lookups filter to active rows; soft-deleted entities never
//! participate in resolution. Inserts are plain INSERTs — the partial
//! unique indexes are the arbiter under concurrent writers, and callers
//! decide how to react to a violation.

use entilink_common::db::models::Entity;
use entilink_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

const SELECT_COLUMNS: &str = "guid, entity_type, name, name_normalized, slug, external_id, \
                              attributes, is_active, created_at";

/// Insert a new entity row.
///
/// A uniqueness violation surfaces as `Error::Database`; the resolver
/// inspects it to recover from creation races.
pub async fn insert(pool: &SqlitePool, entity: &Entity) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO entities (
            guid, entity_type, name, name_normalized, slug, external_id,
            attributes, is_active, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entity.guid.to_string())
    .bind(entity.entity_type.to_string())
    .bind(&entity.name)
    .bind(&entity.name_normalized)
    .bind(&entity.slug)
    .bind(&entity.external_id)
    .bind(serde_json::to_string(&entity.attributes)?)
    .bind(entity.is_active as i64)
    .bind(&entity.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Exact lookup on `(entity_type, external_id)` among active rows
pub async fn find_by_external_id(
    pool: &SqlitePool,
    entity_type: Uuid,
    external_id: &str,
) -> Result<Option<Entity>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM entities \
         WHERE entity_type = ? AND external_id = ? AND is_active = 1"
    );
    let row = sqlx::query(&sql)
        .bind(entity_type.to_string())
        .bind(external_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(Entity::from_row(&row)?)),
        None => Ok(None),
    }
}

/// Exact lookup on `(entity_type, name_normalized)` among active rows
pub async fn find_by_normalized(
    pool: &SqlitePool,
    entity_type: Uuid,
    name_normalized: &str,
) -> Result<Option<Entity>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM entities \
         WHERE entity_type = ? AND name_normalized = ? AND is_active = 1"
    );
    let row = sqlx::query(&sql)
        .bind(entity_type.to_string())
        .bind(name_normalized)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(Entity::from_row(&row)?)),
        None => Ok(None),
    }
}

/// One chunked lookup: all active entities of a type whose normalized
/// key is in `keys`. Callers are responsible for keeping `keys` within
/// the bind-parameter ceiling.
pub async fn find_by_normalized_keys(
    pool: &SqlitePool,
    entity_type: Uuid,
    keys: &[String],
) -> Result<Vec<Entity>> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; keys.len()].join(", ");
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM entities \
         WHERE entity_type = ? AND is_active = 1 AND name_normalized IN ({placeholders})"
    );

    let mut query = sqlx::query(&sql).bind(entity_type.to_string());
    for key in keys {
        query = query.bind(key);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(Entity::from_row).collect()
}

/// Bounded candidate set for fuzzy comparison: active entities of the
/// type whose normalized key shares a prefix with the probe key. Served
/// by the `(entity_type, name_normalized)` index, hard-limited — never a
/// full scan of the type's population.
pub async fn candidates_by_prefix(
    pool: &SqlitePool,
    entity_type: Uuid,
    prefix: &str,
    limit: i64,
) -> Result<Vec<Entity>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM entities \
         WHERE entity_type = ? AND is_active = 1 AND name_normalized LIKE ? \
         ORDER BY name_normalized LIMIT ?"
    );
    let rows = sqlx::query(&sql)
        .bind(entity_type.to_string())
        .bind(format!("{}%", escape_like(prefix)))
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(Entity::from_row).collect()
}

/// Rewrite name, normalized key and slug in one statement.
///
/// A uniqueness violation surfaces to the caller; renames are
/// caller-driven and must not silently merge.
pub async fn update_name(
    pool: &SqlitePool,
    guid: Uuid,
    name: &str,
    name_normalized: &str,
    slug: &str,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE entities SET name = ?, name_normalized = ?, slug = ? \
         WHERE guid = ? AND is_active = 1",
    )
    .bind(name)
    .bind(name_normalized)
    .bind(slug)
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Replace the attributes JSON object
pub async fn update_attributes(
    pool: &SqlitePool,
    guid: Uuid,
    attributes: &serde_json::Value,
) -> Result<u64> {
    let result = sqlx::query("UPDATE entities SET attributes = ? WHERE guid = ? AND is_active = 1")
        .bind(serde_json::to_string(attributes)?)
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Soft delete: relations and derived data keep a referent
pub async fn deactivate(pool: &SqlitePool, guid: Uuid) -> Result<u64> {
    let result = sqlx::query("UPDATE entities SET is_active = 0 WHERE guid = ? AND is_active = 1")
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Load one entity by guid (active or not)
pub async fn find_by_guid(pool: &SqlitePool, guid: Uuid) -> Result<Option<Entity>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM entities WHERE guid = ?");
    let row = sqlx::query(&sql)
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(Entity::from_row(&row)?)),
        None => Ok(None),
    }
}

/// Normalized keys contain no LIKE wildcards; strip them anyway so a
/// raw probe cannot widen the scan.
fn escape_like(input: &str) -> String {
    input.replace('%', "").replace('_', "")
}
