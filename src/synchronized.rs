//! Synchronized LRU Cache Implementation
//!
//! A read-through LRU cache where every operation runs under one mutex. The
//! key index is a hash map from key to a [`NodeHandle`] in a fixed-capacity
//! [`RecencyList`]; the list head is always the least recently used entry.
//!
//! ```text
//!   index: HashMap<K, NodeHandle>
//!     ┌─────┬─────┬─────┐
//!     │ k1  │ k2  │ k3  │
//!     └──┬──┴──┬──┴──┬──┘
//!        ▼     ▼     ▼
//!   head ──► [k2] ◄──► [k3] ◄──► [k1] ──► (wraps to head)
//!            LRU                 MRU
//! ```
//!
//! # Operations
//!
//! - **Hit**: unlink the node and append it again, which makes it the most
//!   recently used. The node's slot is reused, so no allocation happens.
//! - **Miss**: call the value factory while holding the lock. If the list is
//!   full, pop the head, drop its key from the index, and reuse the entry
//!   for the new key.
//!
//! The factory runs before anything is evicted, so a failed computation
//! leaves the cache exactly as it was. Holding the lock during the call
//! also means concurrent misses on the same key invoke the factory once.
//!
//! # When to use
//!
//! Large capacities where the lock-free cache's linear scan is too slow,
//! and workloads where misses are cheap relative to lock contention.

use crate::config::SynchronizedCacheConfig;
use crate::entry::CacheEntry;
use crate::list::{NodeHandle, RecencyList};
use crate::metrics::{CacheMetrics, MetricsSnapshot, ReadThroughMetrics};
use crate::traits::{CacheFactory, ReadThroughCache, ValueFactory};
use core::convert::Infallible;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::num::NonZeroUsize;
use log::{debug, error};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

struct Inner<K, V, S> {
    list: RecencyList<CacheEntry<K, V>>,
    index: HashMap<K, NodeHandle, S>,
}

impl<K: Hash + Eq + Clone, V: Clone, S: BuildHasher> Inner<K, V, S> {
    /// Moves the entry behind `handle` to the most recently used position.
    fn promote(&mut self, key: &K, handle: NodeHandle) -> Option<V> {
        let entry = self.list.remove(handle)?;
        let value = entry.value.clone();
        match self.list.add(entry) {
            Ok(moved) => {
                if let Some(slot) = self.index.get_mut(key) {
                    *slot = moved;
                }
            }
            Err(err) => {
                error!("recency list rejected a promoted entry: {err}");
                debug_assert!(false, "{err}");
                self.index.remove(key);
            }
        }
        Some(value)
    }

    /// Stores a freshly computed value, evicting the head if the list is full.
    /// Returns `true` if an entry was evicted.
    fn insert(&mut self, key: K, value: V) -> bool {
        let (entry, evicted) = if self.list.is_full() {
            match self.list.pop_head() {
                Some(mut entry) => {
                    self.index.remove(&entry.key);
                    entry.replace(key.clone(), value);
                    (entry, true)
                }
                None => (CacheEntry::new(key.clone(), value), false),
            }
        } else {
            (CacheEntry::new(key.clone(), value), false)
        };

        match self.list.add(entry) {
            Ok(handle) => {
                self.index.insert(key, handle);
            }
            Err(err) => {
                error!("recency list rejected a new entry: {err}");
                debug_assert!(false, "{err}");
            }
        }
        evicted
    }
}

/// A read-through LRU cache guarded by a single mutex.
///
/// # Type Parameters
///
/// - `K`: Key type. Must implement `Hash + Eq + Clone`.
/// - `V`: Value type. Cloned out on every hit.
/// - `E`: Error type of the value factory. Defaults to [`Infallible`].
/// - `S`: Hash builder for the key index. Defaults to `DefaultHashBuilder`.
pub struct SynchronizedLruCache<K, V, E = Infallible, S = DefaultHashBuilder> {
    inner: Mutex<Inner<K, V, S>>,
    capacity: NonZeroUsize,
    factory: ValueFactory<K, V, E>,
    metrics: ReadThroughMetrics,
}

impl<K, V, E> SynchronizedLruCache<K, V, E, DefaultHashBuilder>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a cache holding up to `capacity` entries.
    pub fn new<F>(capacity: NonZeroUsize, factory: F) -> Self
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        Self::init(SynchronizedCacheConfig::new(capacity), factory)
    }

    /// Creates a cache from a configuration.
    pub fn init<F>(config: SynchronizedCacheConfig, factory: F) -> Self
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        Self::with_value_factory(config, Arc::new(factory))
    }

    /// Creates a cache sharing an existing value factory.
    pub fn with_value_factory(
        config: SynchronizedCacheConfig,
        factory: ValueFactory<K, V, E>,
    ) -> Self {
        Self::with_hasher(config, factory, DefaultHashBuilder::default())
    }
}

impl<K, V, E, S> SynchronizedLruCache<K, V, E, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Creates a cache whose key index uses `hash_builder`.
    pub fn with_hasher(
        config: SynchronizedCacheConfig,
        factory: ValueFactory<K, V, E>,
        hash_builder: S,
    ) -> Self {
        let capacity = config.capacity;
        Self {
            inner: Mutex::new(Inner {
                list: RecencyList::new(capacity),
                index: HashMap::with_capacity_and_hasher(capacity.get(), hash_builder),
            }),
            capacity,
            factory,
            metrics: ReadThroughMetrics::new(),
        }
    }

    /// Returns the maximum number of entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.lock().list.len()
    }

    /// Returns `true` if no entry is resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value for `key`, computing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the value factory's error unchanged; the cache is not modified.
    pub fn get(&self, key: &K) -> Result<V, E> {
        let mut inner = self.inner.lock();

        let resident = inner.index.get(key).copied();
        if let Some(handle) = resident {
            if let Some(value) = inner.promote(key, handle) {
                self.metrics.record_hit();
                return Ok(value);
            }
        }

        self.metrics.record_miss();
        let value = match (self.factory)(key) {
            Ok(value) => value,
            Err(err) => {
                self.metrics.record_fill_failure();
                debug!("value factory failed, cache left unchanged");
                return Err(err);
            }
        };

        if inner.insert(key.clone(), value.clone()) {
            self.metrics.record_eviction();
            debug!("evicted least recently used entry");
        }
        Ok(value)
    }

    /// Returns clones of the resident entries, least recently used first.
    pub fn entries(&self) -> Vec<CacheEntry<K, V>> {
        self.inner.lock().list.iter().cloned().collect()
    }

    /// Returns a snapshot of the cache's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<K, V, E, S> ReadThroughCache<K, V> for SynchronizedLruCache<K, V, E, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    type Error = E;

    fn get(&self, key: &K) -> Result<V, E> {
        SynchronizedLruCache::get(self, key)
    }

    fn entries(&self) -> Vec<CacheEntry<K, V>> {
        SynchronizedLruCache::entries(self)
    }

    fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn len(&self) -> usize {
        SynchronizedLruCache::len(self)
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<K, V, E, S> CacheMetrics for SynchronizedLruCache<K, V, E, S> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.snapshot().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "SynchronizedLRU"
    }
}

impl<K, V, E, S> fmt::Debug for SynchronizedLruCache<K, V, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronizedLruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.inner.lock().list.len())
            .finish()
    }
}

/// Builds [`SynchronizedLruCache`] shards.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynchronizedFactory;

impl<K, V, E> CacheFactory<K, V, E> for SynchronizedFactory
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Cache = SynchronizedLruCache<K, V, E>;

    fn build(&self, capacity: NonZeroUsize, factory: ValueFactory<K, V, E>) -> Self::Cache {
        SynchronizedLruCache::with_value_factory(SynchronizedCacheConfig::new(capacity), factory)
    }
}
