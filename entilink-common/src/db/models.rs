//! Record models for the identity-resolution tables
//!
//! UUIDs are stored as TEXT and parsed explicitly on read; timestamps are
//! RFC 3339 strings written by the application.

use crate::Result;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

/// A canonical entity record
#[derive(Debug, Clone)]
pub struct Entity {
    pub guid: Uuid,
    /// Owning entity type (guid of an `entity_types` row)
    pub entity_type: Uuid,
    /// Display name as provided by the winning intake path
    pub name: String,
    /// Canonical comparison key; only the normalizer may produce this
    pub name_normalized: String,
    /// URL-safe derived form
    pub slug: String,
    /// Authoritative source key, when the entity came from an import
    pub external_id: Option<String>,
    /// Open key/value map, stored as a JSON object
    pub attributes: serde_json::Value,
    pub is_active: bool,
    pub created_at: String,
}

impl Entity {
    /// Build a new active entity ready for insertion
    pub fn new(
        entity_type: Uuid,
        name: String,
        name_normalized: String,
        slug: String,
        external_id: Option<String>,
        attributes: Option<serde_json::Value>,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            entity_type,
            name,
            name_normalized,
            slug,
            external_id,
            attributes: attributes.unwrap_or_else(|| serde_json::json!({})),
            is_active: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Map a full `entities` row
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let guid: String = row.get("guid");
        let entity_type: String = row.get("entity_type");
        let attributes: String = row.get("attributes");
        let is_active: i64 = row.get("is_active");

        Ok(Self {
            guid: Uuid::parse_str(&guid)?,
            entity_type: Uuid::parse_str(&entity_type)?,
            name: row.get("name"),
            name_normalized: row.get("name_normalized"),
            slug: row.get("slug"),
            external_id: row.get("external_id"),
            attributes: serde_json::from_str(&attributes)?,
            is_active: is_active != 0,
            created_at: row.get("created_at"),
        })
    }
}

/// Entity-type reference data (read-mostly, cached)
#[derive(Debug, Clone)]
pub struct EntityType {
    pub guid: Uuid,
    pub slug: String,
    pub display_name: String,
}

impl EntityType {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let guid: String = row.get("guid");
        Ok(Self {
            guid: Uuid::parse_str(&guid)?,
            slug: row.get("slug"),
            display_name: row.get("display_name"),
        })
    }
}

/// Relation-type reference data: a slug plus the allowed endpoint types
#[derive(Debug, Clone)]
pub struct RelationType {
    pub guid: Uuid,
    pub slug: String,
    pub source_type: Uuid,
    pub target_type: Uuid,
}

impl RelationType {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let guid: String = row.get("guid");
        let source_type: String = row.get("source_type");
        let target_type: String = row.get("target_type");
        Ok(Self {
            guid: Uuid::parse_str(&guid)?,
            slug: row.get("slug"),
            source_type: Uuid::parse_str(&source_type)?,
            target_type: Uuid::parse_str(&target_type)?,
        })
    }
}

/// A typed, scored link between two resolved entities
#[derive(Debug, Clone)]
pub struct EntityRelation {
    pub guid: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub relation_type: Uuid,
    pub confidence: f64,
    pub is_active: bool,
    pub created_at: String,
}

impl EntityRelation {
    pub fn new(source_id: Uuid, target_id: Uuid, relation_type: Uuid, confidence: f64) -> Self {
        Self {
            guid: Uuid::new_v4(),
            source_id,
            target_id,
            relation_type,
            confidence,
            is_active: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
