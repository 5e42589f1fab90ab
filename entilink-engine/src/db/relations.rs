//! Entity-relation persistence and batch existence checks

use entilink_common::db::models::EntityRelation;
use entilink_common::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

/// Composite key identifying one relation pair
pub type PairKey = (Uuid, Uuid, Uuid);

fn composite(source: Uuid, target: Uuid, relation_type: Uuid) -> String {
    format!("{}|{}|{}", source, target, relation_type)
}

/// Which of the given `(source, target, relation_type)` pairs already
/// exist as active relations.
///
/// The comparison runs on a concatenated composite key. Independent
/// `source IN (...) AND target IN (...)` lists would over-match — they
/// return the cross-product of sources and targets, not the intended
/// pairs.
pub async fn find_existing_pairs(
    pool: &SqlitePool,
    pairs: &[PairKey],
) -> Result<HashSet<PairKey>> {
    if pairs.is_empty() {
        return Ok(HashSet::new());
    }

    let placeholders = vec!["?"; pairs.len()].join(", ");
    let sql = format!(
        "SELECT source_id, target_id, relation_type FROM entity_relations \
         WHERE is_active = 1 \
         AND source_id || '|' || target_id || '|' || relation_type IN ({placeholders})"
    );

    let mut query = sqlx::query(&sql);
    for (source, target, relation_type) in pairs {
        query = query.bind(composite(*source, *target, *relation_type));
    }

    let rows = query.fetch_all(pool).await?;
    let mut existing = HashSet::with_capacity(rows.len());
    for row in &rows {
        let source: String = row.get("source_id");
        let target: String = row.get("target_id");
        let relation_type: String = row.get("relation_type");
        existing.insert((
            Uuid::parse_str(&source)?,
            Uuid::parse_str(&target)?,
            Uuid::parse_str(&relation_type)?,
        ));
    }

    Ok(existing)
}

/// Insert a new relation row.
///
/// A uniqueness violation (concurrent writer linked the same pair)
/// surfaces as `Error::Database` for the linker to absorb.
pub async fn insert(pool: &SqlitePool, relation: &EntityRelation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO entity_relations (
            guid, source_id, target_id, relation_type, confidence, is_active, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(relation.guid.to_string())
    .bind(relation.source_id.to_string())
    .bind(relation.target_id.to_string())
    .bind(relation.relation_type.to_string())
    .bind(relation.confidence)
    .bind(relation.is_active as i64)
    .bind(&relation.created_at)
    .execute(pool)
    .await?;

    Ok(())
}
