use crate::server::metrics;
use crate::store::ObjectStore;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Loads cover images from the object store as base64 strings.
///
/// Never fails: a missing object, a store error or a timeout all resolve to
/// `None` so a single bad image cannot break a listing.
#[derive(Clone)]
pub struct AssetFetcher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    timeout: Option<Duration>,
}

impl AssetFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: &str, timeout: Option<Duration>) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            timeout,
        }
    }

    pub async fn fetch(&self, asset_key: &str) -> Option<String> {
        let call = self.store.get_object(&self.bucket, asset_key);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Timed out fetching {}/{}", self.bucket, asset_key);
                    metrics::record_asset_fetch("timeout");
                    return None;
                }
            },
            None => call.await,
        };

        match result {
            Ok(Some(bytes)) => {
                metrics::record_asset_fetch("hit");
                Some(STANDARD.encode(bytes))
            }
            Ok(None) => {
                warn!("Asset {}/{} not found", self.bucket, asset_key);
                metrics::record_asset_fetch("missing");
                None
            }
            Err(err) => {
                warn!("Failed to fetch {}/{}: {:#}", self.bucket, asset_key, err);
                metrics::record_asset_fetch("error");
                None
            }
        }
    }
}
