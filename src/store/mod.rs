//! Storage capabilities consumed by the catalog core.
//!
//! The core only ever talks to these traits. The SQLite key-value store and the
//! filesystem object store are the backends shipped with the server; tests plug
//! in their own doubles.

mod fs_object_store;
mod schema;
mod sqlite_kv_store;

pub use fs_object_store::FsObjectStore;
pub use schema::KV_VERSIONED_SCHEMAS;
pub use sqlite_kv_store::SqliteKeyValueStore;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A stored record: attribute name to JSON value.
pub type Item = serde_json::Map<String, Value>;

/// Maximum number of items a single `batch_put_items` call accepts.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Typed attribute value used in key conditions and scan filters.
/// Numbers are compared as numbers, strings by exact equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    S(String),
    N(i64),
}

/// Equality condition on the partition attribute of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCondition {
    pub attribute: String,
    pub value: AttributeValue,
}

/// Conjunction of equality conditions applied by a full scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanFilter {
    pub conditions: Vec<(String, AttributeValue)>,
}

impl ScanFilter {
    pub fn equals(attribute: &str, value: AttributeValue) -> Self {
        Self {
            conditions: vec![(attribute.to_string(), value)],
        }
    }
}

/// A secondary index provisioned on a table, keyed by a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub table: String,
    pub index: String,
    pub attribute: String,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, table: &str, key: &str) -> Result<Option<Item>>;

    /// Fetches several items by primary key in one round trip.
    /// Missing keys are omitted and the returned order is unspecified.
    async fn batch_get_items(&self, table: &str, keys: &[String]) -> Result<Vec<Item>>;

    /// Returns every item whose indexed attribute satisfies `condition`.
    async fn query(&self, table: &str, index: &str, condition: &KeyCondition)
        -> Result<Vec<Item>>;

    async fn scan(&self, table: &str, filter: &ScanFilter) -> Result<Vec<Item>>;

    async fn put_item(&self, table: &str, key: &str, item: Item) -> Result<()>;

    /// Writes up to [`MAX_BATCH_WRITE_ITEMS`] items atomically.
    async fn batch_put_items(&self, table: &str, items: Vec<(String, Item)>) -> Result<()>;

    /// Returns whether an item was actually removed.
    async fn delete_item(&self, table: &str, key: &str) -> Result<bool>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns `Ok(None)` when the object does not exist.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()>;
}
