//! Per-principal subscriptions.
//!
//! Listing is a two stage lookup: discover the subscribed ids with one scan of
//! the join table, then fetch the items with as few batched multi-gets as the
//! store's batch ceiling allows. Stage two never runs for a principal with no
//! subscriptions.

use super::error::{store_call, CatalogError};
use super::models::{CatalogItem, SubscriptionLink};
use crate::server::metrics;
use crate::store::{AttributeValue, KeyValueStore, ScanFilter};
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of a subscription listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscriptions<T> {
    /// The principal has no join rows at all.
    NoSubscriptions,
    /// Resolved items in discovery order. May be empty if every id was stale.
    Items(Vec<T>),
}

#[derive(Clone)]
pub struct SubscriptionResolver {
    store: Arc<dyn KeyValueStore>,
    catalog_table: String,
    subscription_table: String,
    batch_get_max_keys: usize,
    timeout: Option<Duration>,
}

impl SubscriptionResolver {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        catalog_table: &str,
        subscription_table: &str,
        batch_get_max_keys: usize,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            catalog_table: catalog_table.to_string(),
            subscription_table: subscription_table.to_string(),
            batch_get_max_keys: batch_get_max_keys.max(1),
            timeout,
        }
    }

    pub async fn resolve(
        &self,
        principal_id: &str,
    ) -> Result<Subscriptions<CatalogItem>, CatalogError> {
        let ids = self.subscribed_ids(principal_id).await?;
        if ids.is_empty() {
            debug!("{} has no subscriptions", principal_id);
            return Ok(Subscriptions::NoSubscriptions);
        }
        let items = self.fetch_items(&ids).await?;
        if items.len() < ids.len() {
            info!(
                "{} of {} subscriptions of {} point to missing items",
                ids.len() - items.len(),
                ids.len(),
                principal_id
            );
        }
        Ok(Subscriptions::Items(items))
    }

    /// Stage one: subscribed item ids in discovery order, without duplicates.
    pub async fn subscribed_ids(&self, principal_id: &str) -> Result<Vec<String>, CatalogError> {
        let filter = ScanFilter::equals(
            "principal_id",
            AttributeValue::S(principal_id.to_string()),
        );
        let rows = store_call(
            "scan",
            self.timeout,
            self.store.scan(&self.subscription_table, &filter),
        )
        .await?;

        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let link = SubscriptionLink::from_item(row)?;
            if seen.insert(link.item_id.clone()) {
                ids.push(link.item_id);
            }
        }
        Ok(ids)
    }

    /// Stage two: batched multi-get of `ids`, chunked by the batch ceiling.
    /// The result follows the order of `ids`; ids with no item are dropped.
    pub async fn fetch_items(&self, ids: &[String]) -> Result<Vec<CatalogItem>, CatalogError> {
        let chunks: Vec<&[String]> = ids.chunks(self.batch_get_max_keys).collect();
        metrics::record_batch_get_chunks(chunks.len());
        debug!(
            "Fetching {} items from {} in {} batch(es)",
            ids.len(),
            self.catalog_table,
            chunks.len()
        );

        let batches = try_join_all(chunks.into_iter().map(|chunk| {
            store_call(
                "batch_get_items",
                self.timeout,
                self.store.batch_get_items(&self.catalog_table, chunk),
            )
        }))
        .await?;

        let mut by_id = HashMap::new();
        for raw in batches.iter().flatten() {
            let item = CatalogItem::from_item(raw)?;
            by_id.insert(item.item_id.clone(), item);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Adds the join row after checking the item exists.
    pub async fn subscribe(&self, principal_id: &str, item_id: &str) -> Result<(), CatalogError> {
        let existing = store_call(
            "get_item",
            self.timeout,
            self.store.get_item(&self.catalog_table, item_id),
        )
        .await?;
        if existing.is_none() {
            return Err(CatalogError::ItemNotFound(item_id.to_string()));
        }

        let link = SubscriptionLink::new(principal_id, item_id);
        store_call(
            "put_item",
            self.timeout,
            self.store
                .put_item(&self.subscription_table, &link.key(), link.to_item()),
        )
        .await?;
        info!("{} subscribed to {}", principal_id, item_id);
        Ok(())
    }

    pub async fn unsubscribe(&self, principal_id: &str, item_id: &str) -> Result<(), CatalogError> {
        let link = SubscriptionLink::new(principal_id, item_id);
        let removed = store_call(
            "delete_item",
            self.timeout,
            self.store.delete_item(&self.subscription_table, &link.key()),
        )
        .await?;
        if !removed {
            return Err(CatalogError::NotSubscribed(item_id.to_string()));
        }
        info!("{} unsubscribed from {}", principal_id, item_id);
        Ok(())
    }
}
