//! Local cache of backend lists for offline viewing.
//!
//! `CacheManager` stores instruments, reviews, trades and per-instrument
//! K-lines as timestamped JSON. Entries older than 60 minutes are stale but
//! still readable.

pub mod manager;

pub use manager::{CacheAges, CacheManager, CachedData};
