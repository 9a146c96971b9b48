use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug_span};

use super::{FetchErrorKind, FetchResult, Fetcher};

/// Caps the number of in-flight fetches across a whole job
///
/// Every fetch acquires a permit from one shared semaphore before reaching the
/// wrapped strategy, so the bound holds no matter how many tasks call it.
#[derive(Clone)]
pub struct BoundedFetcher {
    inner: Arc<dyn Fetcher>,
    permits: Arc<Semaphore>,
}

impl BoundedFetcher {
    pub fn new(inner: Arc<dyn Fetcher>, max_concurrent: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Number of fetches that could start right now
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl Fetcher for BoundedFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let _permit = match self
            .permits
            .acquire()
            .instrument(debug_span!("acquire_fetch_permit"))
            .await
        {
            Ok(permit) => permit,
            Err(e) => {
                return FetchResult::failure(
                    url,
                    FetchErrorKind::Network(format!("fetch slots closed: {e}")),
                );
            }
        };

        self.inner.fetch(url).await
    }

    async fn shutdown(&self) {
        self.inner.shutdown().await
    }
}
