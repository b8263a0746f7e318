use crate::domain::{LookupRequest, LookupResult};
use crate::key::CacheKey;
use async_trait::async_trait;
use bytes::Bytes;
use shared::Result;
use shared::config::CacheConfig;
use std::sync::Arc;

// Ports are the pluggable seams for the cache backend and the upstream service

/// Port for creating a cache backend from configuration
pub trait StorageFactory: Send + Sync + 'static {
    fn create_from_config(&self, config: &CacheConfig) -> Result<Arc<dyn CacheBackend>>;
}

/// Port for the external key-value cache.
/// A missing key is `Ok(None)`; an unreachable backend is `Error::BackendUnavailable`.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>>;
    async fn put(&self, key: &CacheKey, value: Bytes) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
}

/// Port for the remote directory/time-table service.
/// Exactly one remote operation per call, no retries.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync + 'static {
    async fn fetch(&self, request: &LookupRequest) -> LookupResult;
}
