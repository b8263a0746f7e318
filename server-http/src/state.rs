use shared::config::Config;
use std::sync::Arc;
use storage_engine::UnifiedStorageFactory;
use upstream::DiyanetClient;
use vakit::planes::data::{CacheAsideService, Timeouts};
use vakit::ports::StorageFactory;

/// Server state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub cache_aside: Arc<CacheAsideService>,
}

impl AppState {
    pub fn new(cache_aside: Arc<CacheAsideService>) -> Self {
        Self { cache_aside }
    }

    /// Wire the configured cache backend and upstream client into the coordinator
    pub fn from_config(config: &Config) -> shared::Result<Self> {
        let backend = UnifiedStorageFactory.create_from_config(&config.cache)?;
        let fetcher = Arc::new(DiyanetClient::new(&config.upstream)?);

        tracing::info!(
            "Upstream service at {} (timeout {:?}), cache timeout {:?}",
            config.upstream.url,
            config.upstream.timeout,
            config.cache.timeout
        );

        let cache_aside = CacheAsideService::new(backend, fetcher).with_timeouts(Timeouts {
            cache: config.cache.timeout,
            upstream: config.upstream.timeout,
        });

        Ok(Self::new(Arc::new(cache_aside)))
    }
}
