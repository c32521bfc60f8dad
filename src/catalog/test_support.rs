//! Store doubles shared by the catalog unit tests.

use super::index_selector::CatalogIndex;
use super::models::CatalogItem;
use crate::store::{
    Item, KeyCondition, KeyValueStore, ObjectStore, ScanFilter, SqliteKeyValueStore,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn catalog_item(id: &str, title: &str, artist: &str, album: &str, year: i64) -> CatalogItem {
    CatalogItem {
        item_id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        album: album.to_string(),
        year,
        asset_key: None,
    }
}

/// In-memory store holding `m0..m{count}` in the `music` table.
pub async fn seeded_kv_store(count: usize, batch_get_max_keys: usize) -> SqliteKeyValueStore {
    let store =
        SqliteKeyValueStore::in_memory(CatalogIndex::definitions("music"), batch_get_max_keys)
            .unwrap();
    for i in 0..count {
        let item = catalog_item(
            &format!("m{}", i),
            &format!("Title {}", i),
            &format!("Artist {}", i),
            "Album",
            2000 + i as i64,
        );
        store
            .put_item("music", &item.item_id, item.to_item())
            .await
            .unwrap();
    }
    store
}

pub struct FailingKeyValueStore;

#[async_trait]
impl KeyValueStore for FailingKeyValueStore {
    async fn get_item(&self, _table: &str, _key: &str) -> Result<Option<Item>> {
        bail!("store is down")
    }

    async fn batch_get_items(&self, _table: &str, _keys: &[String]) -> Result<Vec<Item>> {
        bail!("store is down")
    }

    async fn query(
        &self,
        _table: &str,
        _index: &str,
        _condition: &KeyCondition,
    ) -> Result<Vec<Item>> {
        bail!("store is down")
    }

    async fn scan(&self, _table: &str, _filter: &ScanFilter) -> Result<Vec<Item>> {
        bail!("store is down")
    }

    async fn put_item(&self, _table: &str, _key: &str, _item: Item) -> Result<()> {
        bail!("store is down")
    }

    async fn batch_put_items(&self, _table: &str, _items: Vec<(String, Item)>) -> Result<()> {
        bail!("store is down")
    }

    async fn delete_item(&self, _table: &str, _key: &str) -> Result<bool> {
        bail!("store is down")
    }
}

/// Delegates to a real store and records batch-get traffic.
pub struct CountingKeyValueStore {
    inner: SqliteKeyValueStore,
    batch_get_calls: AtomicUsize,
    max_batch_len: AtomicUsize,
}

impl CountingKeyValueStore {
    pub fn new(inner: SqliteKeyValueStore) -> Self {
        Self {
            inner,
            batch_get_calls: AtomicUsize::new(0),
            max_batch_len: AtomicUsize::new(0),
        }
    }

    pub fn batch_get_calls(&self) -> usize {
        self.batch_get_calls.load(Ordering::SeqCst)
    }

    pub fn max_batch_len(&self) -> usize {
        self.max_batch_len.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for CountingKeyValueStore {
    async fn get_item(&self, table: &str, key: &str) -> Result<Option<Item>> {
        self.inner.get_item(table, key).await
    }

    async fn batch_get_items(&self, table: &str, keys: &[String]) -> Result<Vec<Item>> {
        self.batch_get_calls.fetch_add(1, Ordering::SeqCst);
        self.max_batch_len.fetch_max(keys.len(), Ordering::SeqCst);
        let mut items = self.inner.batch_get_items(table, keys).await?;
        // Batch gets make no ordering promise.
        items.reverse();
        Ok(items)
    }

    async fn query(
        &self,
        table: &str,
        index: &str,
        condition: &KeyCondition,
    ) -> Result<Vec<Item>> {
        self.inner.query(table, index, condition).await
    }

    async fn scan(&self, table: &str, filter: &ScanFilter) -> Result<Vec<Item>> {
        self.inner.scan(table, filter).await
    }

    async fn put_item(&self, table: &str, key: &str, item: Item) -> Result<()> {
        self.inner.put_item(table, key, item).await
    }

    async fn batch_put_items(&self, table: &str, items: Vec<(String, Item)>) -> Result<()> {
        self.inner.batch_put_items(table, items).await
    }

    async fn delete_item(&self, table: &str, key: &str) -> Result<bool> {
        self.inner.delete_item(table, key).await
    }
}

/// Object store with per-key failures and artificial latency.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: HashMap<(String, String), Vec<u8>>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
}

impl MemoryObjectStore {
    pub fn with_object(mut self, bucket: &str, key: &str, data: &[u8]) -> Self {
        self.objects
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
        self
    }

    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn panicking_on(mut self, key: &str) -> Self {
        self.panicking.insert(key.to_string());
        self
    }

    pub fn delayed(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
        if self.panicking.contains(key) {
            panic!("object store crashed on {}", key);
        }
        if self.failing.contains(key) {
            bail!("object store refused {}", key);
        }
        Ok(self
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }

    async fn put_object(&self, bucket: &str, key: &str, _data: &[u8]) -> Result<()> {
        bail!("read-only test store: {}/{}", bucket, key)
    }
}
