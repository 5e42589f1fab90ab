//! Database initialization
//!
//! Creates the connection pool, applies the pragmas required for
//! concurrent multi-process writers, and installs the schema.

use super::schema;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers with one writer, which matters when
    // several extraction workers resolve entities against the same store.
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    // Writers waiting on the single-writer lock back off for up to 5s
    // before surfacing SQLITE_BUSY to the caller.
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    schema::init_tables(&pool).await?;

    Ok(pool)
}
