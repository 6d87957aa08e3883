//! Sharded Read-Through Cache
//!
//! Splits the key space across N independent caches of the same kind. Each
//! key always lands on the same shard, so every shard keeps its own
//! at-most-once fill guarantee and its own LRU order; contention is bounded
//! by the traffic a single shard sees.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       ShardedCache                        │
//! │                                                           │
//! │   hash_one(key) % N  ──▶  shard selection                 │
//! │                                                           │
//! │  ┌─────────────┐ ┌─────────────┐       ┌─────────────┐    │
//! │  │   Shard 0   │ │   Shard 1   │  ...  │  Shard N-1  │    │
//! │  │ (lock-free  │ │             │       │             │    │
//! │  │  or sync.)  │ │             │       │             │    │
//! │  └─────────────┘ └─────────────┘       └─────────────┘    │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Trade-offs
//!
//! - Eviction is per shard. A shard may evict while another still has room,
//!   so a skewed hash can evict earlier than a single cache of the same total
//!   capacity would.
//! - The shards are built by a [`CacheFactory`], which picks the concurrency
//!   strategy: [`LockFreeFactory`](crate::LockFreeFactory) for small hot
//!   shards, [`SynchronizedFactory`](crate::SynchronizedFactory) for large ones.
//!
//! # Example
//!
//! ```
//! use readthrough_cache::config::ShardedCacheConfig;
//! use readthrough_cache::{LockFreeFactory, LockFreeLruCache, ShardedCache};
//!
//! let config = ShardedCacheConfig::try_new(4, 8).unwrap();
//! let cache: ShardedCache<u64, u64, LockFreeLruCache<u64, u64>> =
//!     ShardedCache::init(config, LockFreeFactory, |k| Ok(k + 1));
//!
//! assert_eq!(cache.get(&41), Ok(42));
//! assert_eq!(cache.capacity(), 32);
//! assert_eq!(cache.shard_count(), 4);
//! ```

use crate::config::ShardedCacheConfig;
use crate::entry::CacheEntry;
use crate::metrics::{CacheMetrics, MetricsSnapshot};
use crate::traits::{CacheFactory, ReadThroughCache, ValueFactory};
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;

/// A cache that routes every key to one of several inner caches.
///
/// # Type Parameters
///
/// - `K`: Key type. Must implement `Hash` for routing.
/// - `V`: Value type.
/// - `C`: Inner cache type, produced by a [`CacheFactory`].
/// - `S`: Hash builder used for routing. Defaults to `DefaultHashBuilder`.
pub struct ShardedCache<K, V, C, S = DefaultHashBuilder> {
    shards: Box<[C]>,
    hash_builder: S,
    _marker: PhantomData<fn(&K) -> V>,
}

impl<K, V, C> ShardedCache<K, V, C, DefaultHashBuilder>
where
    K: Hash,
    C: ReadThroughCache<K, V>,
{
    /// Creates a sharded cache whose shards are built by `builder` and share
    /// `factory`.
    pub fn init<B, F>(config: ShardedCacheConfig, builder: B, factory: F) -> Self
    where
        B: CacheFactory<K, V, C::Error, Cache = C>,
        F: Fn(&K) -> Result<V, C::Error> + Send + Sync + 'static,
    {
        Self::with_value_factory(config, builder, Arc::new(factory))
    }

    /// Creates a sharded cache from an existing value factory.
    pub fn with_value_factory<B>(
        config: ShardedCacheConfig,
        builder: B,
        factory: ValueFactory<K, V, C::Error>,
    ) -> Self
    where
        B: CacheFactory<K, V, C::Error, Cache = C>,
    {
        Self::init_with_hasher(config, builder, factory, DefaultHashBuilder::default())
    }
}

impl<K, V, C, S> ShardedCache<K, V, C, S>
where
    K: Hash,
    C: ReadThroughCache<K, V>,
    S: BuildHasher,
{
    /// Creates a sharded cache that routes keys with `hash_builder`.
    pub fn init_with_hasher<B>(
        config: ShardedCacheConfig,
        builder: B,
        factory: ValueFactory<K, V, C::Error>,
        hash_builder: S,
    ) -> Self
    where
        B: CacheFactory<K, V, C::Error, Cache = C>,
    {
        let shards = (0..config.shards.get())
            .map(|_| builder.build(config.shard_capacity, Arc::clone(&factory)))
            .collect();
        Self {
            shards,
            hash_builder,
            _marker: PhantomData,
        }
    }

    /// Returns the index of the shard responsible for `key`.
    #[inline]
    pub fn shard_index(&self, key: &K) -> usize {
        (self.hash_builder.hash_one(key) as usize) % self.shards.len()
    }

    /// Returns the shard at `index`, if any.
    pub fn shard(&self, index: usize) -> Option<&C> {
        self.shards.get(index)
    }

    /// Returns the number of shards.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns the value for `key` from its shard, computing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the value factory's error unchanged.
    pub fn get(&self, key: &K) -> Result<V, C::Error> {
        self.shards[self.shard_index(key)].get(key)
    }

    /// Returns the resident entries of every shard, in shard order.
    pub fn entries(&self) -> Vec<CacheEntry<K, V>> {
        self.shards.iter().flat_map(|shard| shard.entries()).collect()
    }

    /// Returns the combined capacity of all shards.
    pub fn capacity(&self) -> usize {
        self.shards.iter().map(|shard| shard.capacity()).sum()
    }

    /// Returns the number of resident entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    /// Returns `true` if no shard holds an entry.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.is_empty())
    }

    /// Returns the sum of every shard's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shards.iter().map(|shard| shard.metrics()).sum()
    }
}

impl<K, V, C, S> ReadThroughCache<K, V> for ShardedCache<K, V, C, S>
where
    K: Hash,
    C: ReadThroughCache<K, V>,
    S: BuildHasher,
{
    type Error = C::Error;

    fn get(&self, key: &K) -> Result<V, C::Error> {
        ShardedCache::get(self, key)
    }

    fn entries(&self) -> Vec<CacheEntry<K, V>> {
        ShardedCache::entries(self)
    }

    fn capacity(&self) -> usize {
        ShardedCache::capacity(self)
    }

    fn len(&self) -> usize {
        ShardedCache::len(self)
    }

    fn metrics(&self) -> MetricsSnapshot {
        ShardedCache::metrics(self)
    }
}

impl<K, V, C, S> CacheMetrics for ShardedCache<K, V, C, S>
where
    K: Hash,
    C: ReadThroughCache<K, V>,
    S: BuildHasher,
{
    fn metrics(&self) -> BTreeMap<String, f64> {
        ShardedCache::metrics(self).to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "ShardedLRU"
    }
}

impl<K, V, C, S> fmt::Debug for ShardedCache<K, V, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCache")
            .field("shards", &self.shards.len())
            .finish()
    }
}
