//! Catalog search and subscription listing.
//!
//! A search flows through [`index_selector::select`], [`CatalogQuery`] and
//! [`ResultAssembler`]; a subscription listing through [`SubscriptionResolver`]
//! and the same assembler. [`CatalogService`] wires them together.

mod assembler;
mod asset_fetcher;
mod catalog_query;
mod error;
pub mod index_selector;
mod models;
mod service;
mod subscriptions;

#[cfg(test)]
pub(crate) mod test_support;

pub use assembler::ResultAssembler;
pub use asset_fetcher::AssetFetcher;
pub use catalog_query::CatalogQuery;
pub use error::CatalogError;
pub use index_selector::{CatalogIndex, QueryPlan, SearchCriteria};
pub use models::{asset_key_for_artist, CatalogItem, ResponseItem, SubscriptionLink};
pub use service::CatalogService;
pub use subscriptions::{SubscriptionResolver, Subscriptions};

use crate::store::IndexDefinition;
use std::time::Duration;

/// Default key ceiling of one batched multi-get.
pub const DEFAULT_BATCH_GET_MAX_KEYS: usize = 100;

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub music_table: String,
    pub subscription_table: String,
    pub image_bucket: String,
    pub batch_get_max_keys: usize,
    pub store_timeout: Option<Duration>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            music_table: "music".to_string(),
            subscription_table: "subscribe".to_string(),
            image_bucket: "covers".to_string(),
            batch_get_max_keys: DEFAULT_BATCH_GET_MAX_KEYS,
            store_timeout: None,
        }
    }
}

impl CatalogSettings {
    /// Secondary indexes the key-value store must serve for this catalog.
    pub fn index_definitions(&self) -> Vec<IndexDefinition> {
        CatalogIndex::definitions(&self.music_table)
    }
}
