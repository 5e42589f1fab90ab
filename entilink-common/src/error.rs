//! Common error types for entilink

use thiserror::Error;

/// Common result type for entilink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across entilink services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UUID parsing error
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness conflict surfaced to the caller (caller-driven updates)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Check whether a sqlx error is a SQLite uniqueness-constraint violation.
///
/// Extended result codes: 2067 = SQLITE_CONSTRAINT_UNIQUE,
/// 1555 = SQLITE_CONSTRAINT_PRIMARYKEY.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let code_matches = db_err
                .code()
                .map(|c| c == "2067" || c == "1555")
                .unwrap_or(false);
            code_matches || db_err.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}
