#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Choosing a cache
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 Which cache should I use?                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌──────────────────┐                                            │
//! │  │ Capacity small?  │──Yes──▶ ┌──────────────────┐               │
//! │  │ (tens of items)  │         │ LockFreeLruCache │               │
//! │  └────────┬─────────┘         └──────────────────┘               │
//! │          No                                                      │
//! │           ▼                                                      │
//! │  ┌──────────────────┐                                            │
//! │  │ Heavy contention?│──Yes──▶ ┌──────────────────┐               │
//! │  │                  │         │   ShardedCache   │               │
//! │  └────────┬─────────┘         └──────────────────┘               │
//! │          No                                                      │
//! │           ▼                                                      │
//! │  ┌──────────────────────┐                                        │
//! │  │ SynchronizedLruCache │                                        │
//! │  └──────────────────────┘                                        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Performance Characteristics
//!
//! | Cache | Hit | Miss | Concurrent misses, same key |
//! |-------|-----|------|-----------------------------|
//! | [`LockFreeLruCache`] | O(capacity), lock-free | O(capacity) + factory | Factory runs once; others wait on a condvar |
//! | [`SynchronizedLruCache`] | O(1) under mutex | O(1) + factory under mutex | Factory runs once; others wait on the mutex |
//! | [`ShardedCache`] | Inner cache | Inner cache | Guarantee holds per shard |
//!
//! ## Pluggable shards
//!
//! ```rust
//! use readthrough_cache::config::ShardedCacheConfig;
//! use readthrough_cache::{ShardedCache, SynchronizedFactory, SynchronizedLruCache};
//!
//! let config = ShardedCacheConfig::try_new(8, 1024).unwrap();
//! let cache: ShardedCache<u32, u64, SynchronizedLruCache<u32, u64>> =
//!     ShardedCache::init(config, SynchronizedFactory, |k| Ok(u64::from(*k) << 1));
//!
//! assert_eq!(cache.get(&21), Ok(42));
//! assert_eq!(cache.capacity(), 8 * 1024);
//! ```
//!
//! ## Modules
//!
//! - [`lock_free`]: CAS-refreshed slot array with a locked fill protocol
//! - [`synchronized`]: hash index + recency list under one mutex
//! - [`sharded`]: hash-routed wrapper over independent caches
//! - [`list`]: fixed-capacity, index-addressed circular list
//! - [`config`]: configuration structures for every cache
//! - [`metrics`]: per-cache counters and reporting

#[cfg(test)]
extern crate scoped_threadpool;

/// Key/value pair stored by every cache.
pub mod entry;

/// Error types returned by list operations and config validation.
pub mod error;

/// Fixed-capacity circular list used as the recency order.
///
/// Nodes live in a preallocated pool and are addressed by handle, so adding
/// and removing never allocates.
pub mod list;

/// Cache configuration structures.
pub mod config;

/// Cache metrics system.
///
/// Atomic counters kept by every cache plus the `CacheMetrics` reporting
/// trait.
pub mod metrics;

/// Traits shared by all caches: lookup surface and shard construction.
pub mod traits;

/// Lock-free LRU cache.
pub mod lock_free;

/// Mutex-guarded LRU cache.
pub mod synchronized;

/// Hash-routed cache over independent shards.
pub mod sharded;

// Re-export cache types
pub use lock_free::{LockFreeFactory, LockFreeLruCache};
pub use sharded::ShardedCache;
pub use synchronized::{SynchronizedFactory, SynchronizedLruCache};

pub use entry::CacheEntry;
pub use error::{CapacityExceeded, ConfigError};
pub use list::{NodeHandle, RecencyList};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use traits::{CacheFactory, ReadThroughCache, ValueFactory};
