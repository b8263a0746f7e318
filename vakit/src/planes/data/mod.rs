pub mod cache_aside;
pub mod coalescer;
pub mod operation;

pub use cache_aside::{CacheAsideService, Resolved, Source, Timeouts};
pub use coalescer::{Coalescer, InFlight, Registration};
