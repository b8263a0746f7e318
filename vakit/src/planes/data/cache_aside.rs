use crate::domain::{FailureReason, LookupRequest, LookupResult, Record};
use crate::error::ProxyError;
use crate::key::CacheKey;
use crate::planes::control::operation::AdminOperations;
use crate::planes::data::coalescer::{Coalescer, Registration};
use crate::planes::data::operation::LookupOperations;
use crate::ports::{CacheBackend, UpstreamFetcher};
use async_trait::async_trait;
use bytes::Bytes;
use shared::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

/// Upper bounds for each suspension point of a lookup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub cache: Duration,
    pub upstream: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            cache: Duration::from_secs(1),
            upstream: Duration::from_secs(10),
        }
    }
}

/// Where the records of a [`Resolved`] came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Served from the cache backend
    Hit,
    /// Fetched from upstream by this request
    Miss,
    /// Fetched from upstream by a concurrent request for the same key
    Coalesced,
}

impl Source {
    pub fn is_hit(&self) -> bool {
        matches!(self, Source::Hit)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    pub records: Vec<Record>,
    pub source: Source,
}

/// Cache-aside coordinator: read the cache, on a miss fetch from upstream, populate the
/// cache and answer. The cache only accelerates; its failures never fail a lookup.
#[derive(Clone)]
pub struct CacheAsideService {
    backend: Arc<dyn CacheBackend>,
    fetcher: Arc<dyn UpstreamFetcher>,
    coalescer: Coalescer,
    timeouts: Timeouts,
}

impl CacheAsideService {
    pub fn new(backend: Arc<dyn CacheBackend>, fetcher: Arc<dyn UpstreamFetcher>) -> Self {
        Self {
            backend,
            fetcher,
            coalescer: Coalescer::new(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn coalescer(&self) -> &Coalescer {
        &self.coalescer
    }

    /// Read an entry, treating an unreachable or slow backend as a miss
    async fn cache_get(&self, key: &CacheKey) -> Option<Bytes> {
        let result = match timeout(self.timeouts.cache, self.backend.get(key)).await {
            Ok(result) => result,
            Err(_) => Err(Error::BackendUnavailable(format!(
                "get timed out after {:?}",
                self.timeouts.cache
            ))),
        };

        match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, stage = "cache_get", "Cache read failed, fetching fresh: {}", e);
                None
            }
        }
    }

    /// Store fetched records; a failed write is only logged
    async fn cache_put(&self, key: &CacheKey, records: &[Record]) {
        let payload = match serde_json::to_vec(records) {
            Ok(payload) => Bytes::from(payload),
            Err(e) => {
                error!(key = %key, stage = "encode", "Failed to serialize records: {}", e);
                return;
            }
        };

        let result = match timeout(self.timeouts.cache, self.backend.put(key, payload)).await {
            Ok(result) => result,
            Err(_) => Err(Error::BackendUnavailable(format!(
                "put timed out after {:?}",
                self.timeouts.cache
            ))),
        };

        match result {
            Ok(()) => debug!(key = %key, records = records.len(), "Cache populated"),
            Err(e) => warn!(key = %key, stage = "cache_put", "Cache write failed: {}", e),
        }
    }

    async fn fetch(&self, request: &LookupRequest, key: &CacheKey) -> LookupResult {
        let outcome = match timeout(self.timeouts.upstream, self.fetcher.fetch(request)).await {
            Ok(outcome) => outcome,
            Err(_) => LookupResult::Failure(FailureReason::UpstreamUnreachable(format!(
                "timed out after {:?}",
                self.timeouts.upstream
            ))),
        };

        if let LookupResult::Failure(reason) = &outcome {
            error!(
                key = %key,
                stage = "upstream",
                lookup = request.kind(),
                reason = reason.stage(),
                "{} failed: {}",
                request,
                reason
            );
        }
        outcome
    }

    /// Fetch and, on success, write the cache. Failures never touch the cache.
    async fn fetch_and_populate(&self, request: &LookupRequest, key: &CacheKey) -> LookupResult {
        let outcome = self.fetch(request, key).await;
        if let LookupResult::Success(records) = &outcome {
            self.cache_put(key, records).await;
        }
        outcome
    }

    async fn resolve_miss(
        &self,
        request: &LookupRequest,
        key: &CacheKey,
    ) -> Result<(LookupResult, Source), ProxyError> {
        match self.coalescer.register(key) {
            Registration::Leader(in_flight) => {
                // a previous leader may have completed between our cache read and registering
                if let Some(payload) = self.cache_get(key).await {
                    let records = decode(key, &payload)?;
                    debug!(key = %key, lookup = request.kind(), "Entry appeared before fetching");
                    let outcome = LookupResult::Success(records);
                    in_flight.complete(&outcome);
                    return Ok((outcome, Source::Hit));
                }

                let outcome = self.fetch_and_populate(request, key).await;
                let waiters = in_flight.complete(&outcome);
                if waiters > 0 {
                    debug!(key = %key, waiters, "Shared fetch outcome with waiting requests");
                }
                Ok((outcome, Source::Miss))
            }
            Registration::Follower(mut rx) => match rx.recv().await {
                Ok(outcome) => Ok((outcome, Source::Coalesced)),
                Err(_) => {
                    warn!(key = %key, "In-flight fetch was abandoned, fetching directly");
                    Ok((self.fetch_and_populate(request, key).await, Source::Miss))
                }
            },
        }
    }
}

fn decode(key: &CacheKey, payload: &[u8]) -> Result<Vec<Record>, ProxyError> {
    serde_json::from_slice(payload).map_err(|e| {
        error!(key = %key, stage = "decode", "Cached entry is corrupt: {}", e);
        ProxyError::CorruptCacheEntry {
            key: key.to_string(),
            reason: e.to_string(),
        }
    })
}

#[async_trait]
impl LookupOperations for CacheAsideService {
    async fn resolve(
        &self,
        request: &LookupRequest,
        key: &CacheKey,
    ) -> Result<Resolved, ProxyError> {
        if let Some(payload) = self.cache_get(key).await {
            let records = decode(key, &payload)?;
            debug!(key = %key, lookup = request.kind(), records = records.len(), "Cache hit");
            return Ok(Resolved {
                records,
                source: Source::Hit,
            });
        }

        debug!(key = %key, "Cache miss, resolving {}", request);
        match self.resolve_miss(request, key).await? {
            (LookupResult::Success(records), source) => Ok(Resolved { records, source }),
            (LookupResult::Failure(reason), _) => Err(ProxyError::UpstreamFailure(reason)),
        }
    }
}

#[async_trait]
impl AdminOperations for CacheAsideService {
    async fn invalidate(&self, key: &CacheKey) -> Result<bool, ProxyError> {
        let result = match timeout(self.timeouts.cache, self.backend.delete(key)).await {
            Ok(result) => result,
            Err(_) => Err(Error::BackendUnavailable(format!(
                "delete timed out after {:?}",
                self.timeouts.cache
            ))),
        };

        match result {
            Ok(deleted) => {
                debug!(key = %key, deleted, "Cache entry invalidated");
                Ok(deleted)
            }
            Err(e) => {
                error!(key = %key, stage = "cache_delete", "Invalidation failed: {}", e);
                Err(ProxyError::Backend(e))
            }
        }
    }
}

impl std::fmt::Debug for CacheAsideService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAsideService")
            .field("coalescer", &self.coalescer)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}
