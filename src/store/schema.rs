//! SQLite schema for the key-value store.
//!
//! Every logical table lives in `kv_items`, one JSON document per row. The
//! rowid gives scans and index queries their natural (insertion) order.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

// =============================================================================
// Version 1 - Items table with catalog and subscription indexes
// =============================================================================

const KV_ITEMS_TABLE_V1: Table = Table {
    name: "kv_items",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("table_name", &SqlType::Text, non_null = true),
        sqlite_column!("item_key", &SqlType::Text, non_null = true),
        sqlite_column!("attributes", &SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        (
            "idx_kv_items_title",
            "table_name, json_extract(attributes, '$.title')",
        ),
        (
            "idx_kv_items_artist",
            "table_name, json_extract(attributes, '$.artist')",
        ),
        (
            "idx_kv_items_album",
            "table_name, json_extract(attributes, '$.album')",
        ),
        (
            "idx_kv_items_year",
            "table_name, json_extract(attributes, '$.year')",
        ),
        (
            "idx_kv_items_principal",
            "table_name, json_extract(attributes, '$.principal_id')",
        ),
    ],
    unique_constraints: &[&["table_name", "item_key"]],
};

pub const KV_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[KV_ITEMS_TABLE_V1],
    migration: None,
}];
