// Cache module.
// In-memory TTL cache for API responses plus the filesystem helpers behind it.

pub mod memory;
pub mod paths;
pub mod store;

pub use memory::{ApiCache, CacheEntry, DEFAULT_TTL};
