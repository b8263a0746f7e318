use crate::error::ProxyError;
use crate::key::CacheKey;
use crate::domain::LookupRequest;
use crate::planes::data::Resolved;
use async_trait::async_trait;

/// Read path of the proxy: serve from cache or fetch, populate and serve
#[async_trait]
pub trait LookupOperations: Send + Sync + 'static {
    async fn resolve(&self, request: &LookupRequest, key: &CacheKey)
    -> Result<Resolved, ProxyError>;
}
