//! Music Catalog Server Library
//!
//! This library exposes the internal modules for testing and for the import tool.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod server;
pub mod sqlite_persistence;
pub mod store;

// Re-export commonly used types for convenience
pub use auth::{Base64TokenVerifier, TokenVerifier};
pub use catalog::{CatalogService, CatalogSettings};
pub use server::{run_server, RequestsLoggingLevel};
pub use store::{FsObjectStore, SqliteKeyValueStore};
