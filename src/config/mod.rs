//! Cache Configuration Module
//!
//! This module provides configuration structures for every cache in the crate.
//! Each cache type has its own dedicated configuration struct with public fields.
//!
//! # Design Philosophy
//!
//! Configuration structs have all public fields for simple instantiation:
//!
//! - **Simple**: Just create the struct with all fields set
//! - **Type safety**: Capacities are `NonZeroUsize`, so a zero-sized cache cannot be built
//! - **Fallible helpers**: `try_new` validates plain integers coming from user input
//!
//! Capacity is always a number of entries; there is no size-based accounting.
//!
//! # Configs
//!
//! | Config | Cache | Description |
//! |--------|-------|-------------|
//! | `LockFreeCacheConfig` | [`LockFreeLruCache`](crate::LockFreeLruCache) | Scan-based, CAS-refreshed slots |
//! | `SynchronizedCacheConfig` | [`SynchronizedLruCache`](crate::SynchronizedLruCache) | Hash index + recency list under one mutex |
//! | `ShardedCacheConfig` | [`ShardedCache`](crate::ShardedCache) | N independent shards of either kind |
//!
//! # Examples
//!
//! ```
//! use readthrough_cache::config::{LockFreeCacheConfig, ShardedCacheConfig};
//! use readthrough_cache::LockFreeLruCache;
//! use core::num::NonZeroUsize;
//!
//! // Small lock-free cache in front of a slow computation
//! let config = LockFreeCacheConfig {
//!     capacity: NonZeroUsize::new(16).unwrap(),
//! };
//! let cache: LockFreeLruCache<u64, u64> = LockFreeLruCache::init(config, |k| Ok(k * 2));
//! assert_eq!(cache.get(&21), Ok(42));
//!
//! // 8 shards of 16 entries each
//! let sharded = ShardedCacheConfig::try_new(8, 16).unwrap();
//! assert_eq!(sharded.total_capacity(), 128);
//! ```

pub mod lock_free;
pub mod sharded;
pub mod synchronized;

pub use lock_free::LockFreeCacheConfig;
pub use sharded::{default_shard_count, ShardedCacheConfig};
pub use synchronized::SynchronizedCacheConfig;
