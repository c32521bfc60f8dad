use crate::server::metrics;
use anyhow::anyhow;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failures surfaced by the catalog core.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("At least one of title, artist, album or year must be provided")]
    InvalidCriteria,

    #[error("Store unavailable: {0:#}")]
    StoreUnavailable(#[from] anyhow::Error),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Catalog item not found: {0}")]
    ItemNotFound(String),

    #[error("Not subscribed to {0}")]
    NotSubscribed(String),
}

/// Awaits a store call, bounding it by `timeout` when one is configured.
/// Failures and timeouts both become `StoreUnavailable`.
pub(crate) async fn store_call<T, F>(
    operation: &'static str,
    timeout: Option<Duration>,
    call: F,
) -> Result<T, CatalogError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let start = Instant::now();
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("{} timed out after {:?}", operation, limit)),
        },
        None => call.await,
    };
    metrics::record_store_call(operation, start.elapsed(), result.is_ok());
    result.map_err(CatalogError::StoreUnavailable)
}
