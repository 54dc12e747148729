//! Cache Module
//!
//! In-memory caches with lazy TTL expiration:
//! - [`TtlCache`] for facility responses, evicting the least recently accessed key
//! - [`ResponseCache`] for fallback LLM replies, strict LRU over hashed message keys

mod entry;
mod response;
mod stats;
mod ttl;


// Re-export public types
pub use entry::CacheEntry;
pub use response::{Language, ResponseCache};
pub use stats::CacheStats;
pub use ttl::TtlCache;
