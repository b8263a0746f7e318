use shared::Result;
use shared::config::{CacheConfig, CacheKind};
use std::sync::Arc;
use tracing::info;
use vakit::ports::{CacheBackend, StorageFactory};

pub mod http_cache;
pub mod moka_cache;

pub use http_cache::HttpCache;
pub use moka_cache::MokaCache;

/// Builds whichever cache backend the configuration selects
#[derive(Clone, Copy, Debug, Default)]
pub struct UnifiedStorageFactory;

impl StorageFactory for UnifiedStorageFactory {
    fn create_from_config(&self, config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
        match config.kind {
            CacheKind::Memory => {
                info!(
                    "Using in-memory cache backend '{}' (max entries: {:?})",
                    config.name, config.max_entries
                );
                Ok(Arc::new(MokaCache::new(&config.name, config.max_entries)))
            }
            CacheKind::Http => {
                info!(
                    "Using remote cache backend '{}' at {}",
                    config.name, config.url
                );
                Ok(Arc::new(HttpCache::new(
                    &config.url,
                    config.name.clone(),
                    config.timeout,
                )?))
            }
        }
    }
}
