use super::asset_fetcher::AssetFetcher;
use super::error::CatalogError;
use super::models::{CatalogItem, ResponseItem};
use futures::future::join_all;
use tracing::{debug, error};

/// Joins catalog records with their cover images.
#[derive(Clone)]
pub struct ResultAssembler {
    fetcher: AssetFetcher,
}

impl ResultAssembler {
    pub fn new(fetcher: AssetFetcher) -> Self {
        Self { fetcher }
    }

    /// One fetch task per item, each writing into the slot of its item.
    /// Output order is input order whatever order the fetches finish in.
    pub async fn assemble(
        &self,
        items: Vec<CatalogItem>,
    ) -> Result<Vec<ResponseItem>, CatalogError> {
        if let Some(position) = items.iter().position(|item| item.item_id.is_empty()) {
            return Err(CatalogError::MalformedRecord(format!(
                "item at position {} has no music_id",
                position
            )));
        }

        let handles: Vec<_> = items
            .iter()
            .map(|item| {
                let fetcher = self.fetcher.clone();
                let asset_key = item.resolved_asset_key();
                tokio::spawn(async move { fetcher.fetch(&asset_key).await })
            })
            .collect();

        // `join_all` yields results in spawn order, so position is the slot.
        let mut slots: Vec<Option<String>> = vec![None; items.len()];
        for (slot, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(image) => slots[slot] = image,
                // The slot keeps its `None`.
                Err(err) => error!("Asset fetch task for slot {} failed: {}", slot, err),
            }
        }
        debug!("Assembled {} items", items.len());

        Ok(items
            .into_iter()
            .zip(slots)
            .map(|(item, image)| ResponseItem::new(item, image))
            .collect())
    }
}
