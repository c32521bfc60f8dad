use super::assembler::ResultAssembler;
use super::asset_fetcher::AssetFetcher;
use super::catalog_query::CatalogQuery;
use super::error::CatalogError;
use super::index_selector::{self, SearchCriteria};
use super::models::ResponseItem;
use super::subscriptions::{SubscriptionResolver, Subscriptions};
use super::CatalogSettings;
use crate::store::{KeyValueStore, ObjectStore};
use std::sync::Arc;
use tracing::debug;

/// Entry point used by the HTTP layer.
#[derive(Clone)]
pub struct CatalogService {
    query: CatalogQuery,
    subscriptions: SubscriptionResolver,
    assembler: ResultAssembler,
}

impl CatalogService {
    pub fn new(
        kv_store: Arc<dyn KeyValueStore>,
        object_store: Arc<dyn ObjectStore>,
        settings: &CatalogSettings,
    ) -> Self {
        let query = CatalogQuery::new(
            kv_store.clone(),
            &settings.music_table,
            settings.store_timeout,
        );
        let subscriptions = SubscriptionResolver::new(
            kv_store,
            &settings.music_table,
            &settings.subscription_table,
            settings.batch_get_max_keys,
            settings.store_timeout,
        );
        let fetcher = AssetFetcher::new(
            object_store,
            &settings.image_bucket,
            settings.store_timeout,
        );
        Self {
            query,
            subscriptions,
            assembler: ResultAssembler::new(fetcher),
        }
    }

    pub async fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<ResponseItem>, CatalogError> {
        let plan = index_selector::select(criteria)?;
        let items = self.query.execute(&plan).await?;
        debug!("Search {:?} matched {} items", plan, items.len());
        self.assembler.assemble(items).await
    }

    pub async fn list_subscriptions(
        &self,
        principal_id: &str,
    ) -> Result<Subscriptions<ResponseItem>, CatalogError> {
        match self.subscriptions.resolve(principal_id).await? {
            Subscriptions::NoSubscriptions => Ok(Subscriptions::NoSubscriptions),
            Subscriptions::Items(items) => {
                Ok(Subscriptions::Items(self.assembler.assemble(items).await?))
            }
        }
    }

    pub async fn subscribe(&self, principal_id: &str, item_id: &str) -> Result<(), CatalogError> {
        self.subscriptions.subscribe(principal_id, item_id).await
    }

    pub async fn unsubscribe(&self, principal_id: &str, item_id: &str) -> Result<(), CatalogError> {
        self.subscriptions.unsubscribe(principal_id, item_id).await
    }
}
