pub mod admin_ops;
pub mod cache;
pub mod cache_ops;

pub use admin_ops::invalidate_entry;
pub use cache::health::{health_check, up};
pub use cache_ops::{Endpoint, list_cities, list_countries, list_regions, list_time_table};
