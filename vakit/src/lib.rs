#![deny(clippy::all)]

pub mod domain;
pub mod error;
pub mod key;
pub mod planes;
pub mod ports;

pub use domain::{FailureReason, LookupRequest, LookupResult, Record};
pub use error::ProxyError;
pub use key::CacheKey;
