use super::error::{store_call, CatalogError};
use super::index_selector::{AccessPath, QueryPlan};
use super::models::CatalogItem;
use crate::store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs a [`QueryPlan`] against the catalog table.
#[derive(Clone)]
pub struct CatalogQuery {
    store: Arc<dyn KeyValueStore>,
    table: String,
    timeout: Option<Duration>,
}

impl CatalogQuery {
    pub fn new(store: Arc<dyn KeyValueStore>, table: &str, timeout: Option<Duration>) -> Self {
        Self {
            store,
            table: table.to_string(),
            timeout,
        }
    }

    /// Records in the store's natural return order. No match is an empty vec.
    pub async fn execute(&self, plan: &QueryPlan) -> Result<Vec<CatalogItem>, CatalogError> {
        let raw = match plan.access_path() {
            AccessPath::Index(index, condition) => {
                debug!("Querying {} on {} with {:?}", index.name(), self.table, condition.value);
                store_call(
                    "query",
                    self.timeout,
                    self.store.query(&self.table, index.name(), &condition),
                )
                .await?
            }
            AccessPath::Scan(filter) => {
                warn!(
                    "Unindexed scan of {} with {} condition(s)",
                    self.table,
                    filter.conditions.len()
                );
                store_call("scan", self.timeout, self.store.scan(&self.table, filter)).await?
            }
        };

        raw.iter().map(CatalogItem::from_item).collect()
    }
}
