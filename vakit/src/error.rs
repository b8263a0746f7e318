use crate::domain::FailureReason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("corrupt cache entry under '{key}': {reason}")]
    CorruptCacheEntry { key: String, reason: String },

    #[error("upstream failure: {0}")]
    UpstreamFailure(#[from] FailureReason),

    #[error("cache backend error: {0}")]
    Backend(#[from] shared::Error),
}
