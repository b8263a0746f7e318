use crate::domain::LookupResult;
use crate::key::CacheKey;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio::sync::broadcast;

type InFlightMap = DashMap<CacheKey, broadcast::Sender<LookupResult>>;

/// What a caller got back from [`Coalescer::register`]
pub enum Registration {
    /// No fetch for this key is running; the caller must fetch and then complete it
    Leader(InFlight),
    /// Another caller is already fetching; wait for its outcome
    Follower(broadcast::Receiver<LookupResult>),
}

/// Tracks upstream fetches in progress so concurrent misses for one key share a single fetch
#[derive(Clone, Default)]
pub struct Coalescer {
    in_flight: Arc<InFlightMap>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: &CacheKey) -> Registration {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => Registration::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx);
                Registration::Leader(InFlight {
                    key: key.clone(),
                    in_flight: Arc::clone(&self.in_flight),
                    completed: false,
                })
            }
        }
    }

    /// Number of keys with a fetch currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of followers waiting on `key`
    pub fn waiters(&self, key: &CacheKey) -> usize {
        self.in_flight
            .get(key)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for Coalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer")
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

/// Leader's handle on an in-flight fetch.
/// Dropping it without completing releases the key and wakes followers with a closed channel.
pub struct InFlight {
    key: CacheKey,
    in_flight: Arc<InFlightMap>,
    completed: bool,
}

impl InFlight {
    /// Release the key and hand `outcome` to every follower, returning how many received it
    pub fn complete(mut self, outcome: &LookupResult) -> usize {
        self.completed = true;
        match self.in_flight.remove(&self.key) {
            Some((_, tx)) => tx.send(outcome.clone()).unwrap_or(0),
            None => 0,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.completed {
            self.in_flight.remove(&self.key);
        }
    }
}
