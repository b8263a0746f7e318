use crate::error::ProxyError;
use crate::key::CacheKey;
use async_trait::async_trait;

#[async_trait]
pub trait AdminOperations: Send + Sync + 'static {
    /// Drop the cached entry for `key`, returning whether one existed
    async fn invalidate(&self, key: &CacheKey) -> Result<bool, ProxyError>;
}
