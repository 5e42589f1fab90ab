//! Database queries for the resolution engine, one module per table

pub mod entities;
pub mod entity_types;
pub mod relation_types;
pub mod relations;
