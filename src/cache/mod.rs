//! Cache Module
//!
//! Fixed-capacity response cache keyed by request URL, with per-slot
//! reader/writer exclusion and least-recently-used eviction.

mod clock;
mod slot;
mod stats;
mod store;


// Re-export public types
pub use clock::RecencyClock;
pub use slot::{CacheSlot, ReadAccess};
pub use stats::CacheStats;
pub use store::{EntrySnapshot, ResponseCache, StoreOutcome};

// == Public Constants ==
/// Default number of cache slots
pub const CACHE_SLOTS: usize = 10;

/// Largest response body that will be cached, in bytes
pub const MAX_OBJECT_SIZE: usize = 100 * 1024;
