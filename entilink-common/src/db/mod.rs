//! Database access shared by the entilink services

pub mod init;
pub mod models;
pub mod schema;

pub use init::*;
pub use models::*;
