use super::schema::{DEFAULT_TIMESTAMP, KV_VERSIONED_SCHEMAS};
use super::{
    AttributeValue, IndexDefinition, Item, KeyCondition, KeyValueStore, ScanFilter,
    MAX_BATCH_WRITE_ITEMS,
};
use crate::sqlite_persistence::open_versioned;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Key-value store persisted in a single SQLite file.
///
/// Calls run on the blocking thread pool; the connection lock is only held for
/// the duration of one statement batch.
pub struct SqliteKeyValueStore {
    conn: Arc<Mutex<Connection>>,
    indexes: Arc<Vec<IndexDefinition>>,
    batch_get_max_keys: usize,
}

fn is_plain_attribute(attribute: &str) -> bool {
    !attribute.is_empty()
        && attribute
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Typed equality on one attribute. `json_extract` alone would let a JSON
/// `true` match `N(1)` or a numeric string match an integer column.
fn equality_clause(attribute: &str, value: &AttributeValue) -> String {
    let json_type = match value {
        AttributeValue::S(_) => "'text'",
        AttributeValue::N(_) => "'integer'",
    };
    format!(
        "json_extract(attributes, '$.{attr}') = ? AND json_type(attributes, '$.{attr}') = {ty}",
        attr = attribute,
        ty = json_type
    )
}

fn to_sql_value(value: &AttributeValue) -> SqlValue {
    match value {
        AttributeValue::S(s) => SqlValue::Text(s.clone()),
        AttributeValue::N(n) => SqlValue::Integer(*n),
    }
}

fn parse_item(table: &str, raw: &str) -> Result<Item> {
    serde_json::from_str(raw).with_context(|| format!("Corrupted item JSON in table {}", table))
}

fn collect_items(
    conn: &Connection,
    table: &str,
    sql: &str,
    values: Vec<SqlValue>,
) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(sql)?;
    let rows: Vec<String> = stmt
        .query_map(params_from_iter(values), |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<_>>()?;
    rows.iter().map(|raw| parse_item(table, raw)).collect()
}

impl SqliteKeyValueStore {
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        indexes: Vec<IndexDefinition>,
        batch_get_max_keys: usize,
    ) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();
        if is_new_db {
            info!("Creating new key-value database at {:?}", path);
        }

        let mut conn = Connection::open(path).context("Failed to open key-value database")?;
        open_versioned(&mut conn, KV_VERSIONED_SCHEMAS, is_new_db)
            .with_context(|| format!("Key-value database at {:?} is not usable", path))?;

        Self::with_connection(conn, indexes, batch_get_max_keys)
    }

    pub fn in_memory(indexes: Vec<IndexDefinition>, batch_get_max_keys: usize) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        open_versioned(&mut conn, KV_VERSIONED_SCHEMAS, true)?;
        Self::with_connection(conn, indexes, batch_get_max_keys)
    }

    fn with_connection(
        conn: Connection,
        indexes: Vec<IndexDefinition>,
        batch_get_max_keys: usize,
    ) -> Result<Self> {
        if batch_get_max_keys == 0 {
            bail!("batch_get_max_keys must be at least 1");
        }
        if let Some(bad) = indexes.iter().find(|d| !is_plain_attribute(&d.attribute)) {
            bail!(
                "Index {} uses unsupported attribute name '{}'",
                bad.index,
                bad.attribute
            );
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            indexes: Arc::new(indexes),
            batch_get_max_keys,
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| anyhow!("Key-value store connection lock poisoned"))?;
            f(&mut conn)
        })
        .await
        .context("Key-value store task panicked")?
    }

    fn index_attribute(&self, table: &str, index: &str) -> Result<&str> {
        self.indexes
            .iter()
            .find(|d| d.table == table && d.index == index)
            .map(|d| d.attribute.as_str())
            .ok_or_else(|| anyhow!("Unknown index {} on table {}", index, table))
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get_item(&self, table: &str, key: &str) -> Result<Option<Item>> {
        let table = table.to_string();
        let key = key.to_string();
        self.run(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT attributes FROM kv_items WHERE table_name = ?1 AND item_key = ?2",
                    params![table, key],
                    |row| row.get(0),
                )
                .optional()?;
            raw.map(|raw| parse_item(&table, &raw)).transpose()
        })
        .await
    }

    async fn batch_get_items(&self, table: &str, keys: &[String]) -> Result<Vec<Item>> {
        if keys.len() > self.batch_get_max_keys {
            bail!(
                "batch_get_items accepts at most {} keys, got {}",
                self.batch_get_max_keys,
                keys.len()
            );
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT attributes FROM kv_items WHERE table_name = ? AND item_key IN ({})",
            placeholders
        );
        let mut values = vec![SqlValue::Text(table.to_string())];
        values.extend(keys.iter().cloned().map(SqlValue::Text));

        let table = table.to_string();
        debug!("batch get of {} keys from {}", keys.len(), table);
        self.run(move |conn| collect_items(conn, &table, &sql, values))
            .await
    }

    async fn query(
        &self,
        table: &str,
        index: &str,
        condition: &KeyCondition,
    ) -> Result<Vec<Item>> {
        let attribute = self.index_attribute(table, index)?;
        if attribute != condition.attribute {
            bail!(
                "Index {} is keyed on '{}', not '{}'",
                index,
                attribute,
                condition.attribute
            );
        }

        // The path must be a literal for SQLite to use the expression index.
        let sql = format!(
            "SELECT attributes FROM kv_items WHERE table_name = ? AND {} ORDER BY id",
            equality_clause(attribute, &condition.value)
        );
        let values = vec![
            SqlValue::Text(table.to_string()),
            to_sql_value(&condition.value),
        ];
        let table = table.to_string();
        self.run(move |conn| collect_items(conn, &table, &sql, values))
            .await
    }

    async fn scan(&self, table: &str, filter: &ScanFilter) -> Result<Vec<Item>> {
        let mut sql = String::from("SELECT attributes FROM kv_items WHERE table_name = ?");
        let mut values = vec![SqlValue::Text(table.to_string())];
        for (attribute, value) in &filter.conditions {
            if !is_plain_attribute(attribute) {
                bail!("Unsupported filter attribute '{}'", attribute);
            }
            // Literal paths let the planner pick up matching expression indexes.
            sql.push_str(" AND ");
            sql.push_str(&equality_clause(attribute, value));
            values.push(to_sql_value(value));
        }
        sql.push_str(" ORDER BY id");

        let table = table.to_string();
        self.run(move |conn| collect_items(conn, &table, &sql, values))
            .await
    }

    async fn put_item(&self, table: &str, key: &str, item: Item) -> Result<()> {
        self.batch_put_items(table, vec![(key.to_string(), item)])
            .await
    }

    async fn batch_put_items(&self, table: &str, items: Vec<(String, Item)>) -> Result<()> {
        if items.len() > MAX_BATCH_WRITE_ITEMS {
            bail!(
                "batch_put_items accepts at most {} items, got {}",
                MAX_BATCH_WRITE_ITEMS,
                items.len()
            );
        }

        let table = table.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT INTO kv_items (table_name, item_key, attributes) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(table_name, item_key) \
                     DO UPDATE SET attributes = excluded.attributes, updated_at = {}",
                    DEFAULT_TIMESTAMP
                ))?;
                for (key, item) in &items {
                    let attributes = serde_json::to_string(item)?;
                    stmt.execute(params![table, key, attributes])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_item(&self, table: &str, key: &str) -> Result<bool> {
        let table = table.to_string();
        let key = key.to_string();
        self.run(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM kv_items WHERE table_name = ?1 AND item_key = ?2",
                params![table, key],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}
