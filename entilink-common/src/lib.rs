//! # Entilink Common Library
//!
//! Shared code for the entilink identity-resolution services including:
//! - Error type and `Result` alias
//! - Database pool initialization and schema
//! - Record models (entities, entity types, relations)
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
