//! Capability traits shared by every cache strategy.
//!
//! - [`ReadThroughCache`]: the lookup + introspection surface callers use.
//! - [`CacheFactory`]: builds a cache from a capacity and a value factory, so
//!   the [`ShardedCache`](crate::ShardedCache) can construct its shards with
//!   either concurrency strategy.
//! - [`ValueFactory`]: the shared, fallible function that computes missing
//!   values.
//!
//! ```
//! use readthrough_cache::{
//!     CacheFactory, LockFreeFactory, ReadThroughCache, SynchronizedFactory, ValueFactory,
//! };
//! use core::convert::Infallible;
//! use core::num::NonZeroUsize;
//! use std::sync::Arc;
//!
//! fn warm<C: ReadThroughCache<u32, u32>>(cache: &C) -> Result<u32, C::Error> {
//!     (0..4).map(|k| cache.get(&k)).sum()
//! }
//!
//! let square: ValueFactory<u32, u32, Infallible> = Arc::new(|k: &u32| Ok(k * k));
//! let cap = NonZeroUsize::new(4).unwrap();
//!
//! let lock_free = LockFreeFactory.build(cap, Arc::clone(&square));
//! let synchronized = SynchronizedFactory.build(cap, square);
//! assert_eq!(warm(&lock_free), Ok(14));
//! assert_eq!(warm(&synchronized), Ok(14));
//! ```

use crate::entry::CacheEntry;
use crate::metrics::MetricsSnapshot;
use core::num::NonZeroUsize;
use std::sync::Arc;

/// Computes the value for a key that is not resident.
///
/// May be arbitrarily slow. It must not call back into the cache that owns it.
/// Errors are returned unchanged to the caller whose lookup triggered the fill.
pub type ValueFactory<K, V, E> = Arc<dyn Fn(&K) -> Result<V, E> + Send + Sync>;

/// A cache that computes missing values itself.
pub trait ReadThroughCache<K, V> {
    /// Error produced by the value factory.
    type Error;

    /// Returns the value for `key`, computing and storing it on a miss.
    ///
    /// Never returns a placeholder. Concurrent misses on the same key invoke
    /// the value factory at most once per cache instance.
    ///
    /// # Errors
    ///
    /// Returns the value factory's error if the computation fails. Nothing is
    /// cached in that case.
    fn get(&self, key: &K) -> Result<V, Self::Error>;

    /// Returns a copy of the currently resident entries.
    ///
    /// Not an atomic snapshot: entries filled or evicted concurrently may or
    /// may not be observed.
    fn entries(&self) -> Vec<CacheEntry<K, V>>;

    /// Maximum number of resident entries.
    fn capacity(&self) -> usize;

    /// Number of resident entries.
    fn len(&self) -> usize;

    /// Returns `true` if no entry is resident.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters of the cache.
    fn metrics(&self) -> MetricsSnapshot;
}

/// Constructs caches of one strategy from `(capacity, value_factory)`.
pub trait CacheFactory<K, V, E> {
    /// The cache type produced.
    type Cache: ReadThroughCache<K, V, Error = E>;

    /// Builds a new, empty cache.
    fn build(&self, capacity: NonZeroUsize, factory: ValueFactory<K, V, E>) -> Self::Cache;
}

impl<K, V, E, F> CacheFactory<K, V, E> for &F
where
    F: CacheFactory<K, V, E> + ?Sized,
{
    type Cache = F::Cache;

    fn build(&self, capacity: NonZeroUsize, factory: ValueFactory<K, V, E>) -> Self::Cache {
        (**self).build(capacity, factory)
    }
}
