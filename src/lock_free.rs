//! Lock-Free LRU Cache Implementation
//!
//! A read-through cache built for small capacities, many concurrent readers
//! and slow value computation. Hits never block: a lookup scans a fixed
//! array of slots and refreshes the matching slot's timestamp with a
//! compare-and-swap. Only a miss takes the cache's mutex, and only long
//! enough to pick a slot; the value itself is computed outside the lock.
//!
//! # How It Works
//!
//! ```text
//!   slot:   0            1               2            3
//!        ┌──────────┐ ┌──────────────┐ ┌──────────┐ ┌──────────┐
//!  state │Normal k,v│ │Updating k'   │ │Normal k,v│ │  Empty   │  ArcSwap
//!        ├──────────┤ ├──────────────┤ ├──────────┤ ├──────────┤
//!  tick  │   17     │ │  UPDATING    │ │    9     │ │ UPDATING │  AtomicU64
//!        └──────────┘ └──────────────┘ └──────────┘ └──────────┘
//!                                           ▲
//!                        next eviction candidate (min tick)
//! ```
//!
//! Every access draws a fresh value from a per-cache logical clock. The
//! entry with the smallest tick is the least recently used one; ties go to
//! the lowest slot index.
//!
//! ## Lookup
//!
//! 1. Scan slots in order. For a `Normal` slot holding the key, CAS its tick
//!    from the value read to a fresh one, retrying if another thread touched
//!    it in between, and return the value. A slot that is `Updating` for the
//!    key counts as a miss.
//! 2. On a miss, run the fill protocol.
//!
//! ## Fill
//!
//! Under the mutex the slots are scanned again. A `Normal` match is promoted
//! and returned (another filler just finished). An `Updating` match means
//! another thread is computing the value: wait on the condition variable and
//! start over. Otherwise the first `Empty` slot, or else the `Normal` slot
//! with the smallest tick, is marked `Updating(key)` and the mutex released.
//! The value factory runs unlocked; the result is written back under the
//! mutex and every waiter is woken.
//!
//! If the factory fails (or panics) the claimed slot goes back to `Empty`
//! and waiters are still woken, so they retry instead of hanging.
//!
//! # Performance Characteristics
//!
//! | Operation | Cost |
//! |-----------|------|
//! | Hit | O(capacity) scan + one CAS, no lock, no allocation |
//! | Miss | O(capacity) scan under the mutex + unlocked factory call |
//! | Entries | O(capacity) |
//!
//! # Example
//!
//! ```
//! use readthrough_cache::LockFreeLruCache;
//! use core::num::NonZeroUsize;
//!
//! let cache: LockFreeLruCache<u64, u64> =
//!     LockFreeLruCache::new(NonZeroUsize::new(2).unwrap(), |k| Ok(k * k));
//!
//! assert_eq!(cache.get(&0), Ok(0));
//! assert_eq!(cache.get(&1), Ok(1));
//! assert_eq!(cache.get(&2), Ok(4)); // evicts 0
//!
//! let mut values: Vec<_> = cache.entries().into_iter().map(|e| e.value).collect();
//! values.sort();
//! assert_eq!(values, vec![1, 4]);
//! ```

use crate::config::LockFreeCacheConfig;
use crate::entry::CacheEntry;
use crate::metrics::{CacheMetrics, MetricsSnapshot, ReadThroughMetrics};
use crate::traits::{CacheFactory, ReadThroughCache, ValueFactory};
use arc_swap::ArcSwap;
use core::convert::Infallible;
use core::fmt;
use core::num::NonZeroUsize;
use log::{debug, trace};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tick value of a slot that readers must skip.
const UPDATING: u64 = u64::MAX;

enum SlotState<K, V> {
    Empty,
    /// The key is claimed and its value is being computed.
    Updating(K),
    Normal(K, V),
}

struct Slot<K, V> {
    state: ArcSwap<SlotState<K, V>>,
    /// Last access tick, or `UPDATING` while the slot is empty or being filled.
    tick: AtomicU64,
}

impl<K, V> Slot<K, V> {
    fn empty() -> Self {
        Slot {
            state: ArcSwap::from_pointee(SlotState::Empty),
            tick: AtomicU64::new(UPDATING),
        }
    }
}

enum Claim<V> {
    /// The key became resident while we were getting the lock.
    Resident(V),
    /// Another thread is filling this key.
    InFlight,
    /// Every slot is being filled by another thread.
    Saturated,
    Placed { index: usize, evicted: bool },
}

/// A read-through LRU cache whose hits are lock-free.
///
/// # Type Parameters
///
/// - `K`: Key type. Compared with `Eq`; cloned into the slot on a fill.
/// - `V`: Value type. Cloned out of the slot on every hit; wrap large values
///   in `Arc`.
/// - `E`: Error type of the value factory. Defaults to [`Infallible`].
///
/// # Thread Safety
///
/// `LockFreeLruCache` is `Send + Sync` when `K` and `V` are, and is meant to be
/// shared through an `Arc`.
pub struct LockFreeLruCache<K, V, E = Infallible> {
    slots: Box<[Slot<K, V>]>,
    clock: AtomicU64,
    fill_lock: Mutex<()>,
    filled: Condvar,
    factory: ValueFactory<K, V, E>,
    metrics: ReadThroughMetrics,
}

impl<K, V, E> LockFreeLruCache<K, V, E>
where
    K: Eq + Clone,
    V: Clone,
{
    /// Creates a cache with `capacity` slots that computes misses with `factory`.
    pub fn new<F>(capacity: NonZeroUsize, factory: F) -> Self
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        Self::init(LockFreeCacheConfig::new(capacity), factory)
    }

    /// Creates a cache from a configuration.
    pub fn init<F>(config: LockFreeCacheConfig, factory: F) -> Self
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        Self::with_value_factory(config, Arc::new(factory))
    }

    /// Creates a cache sharing an existing value factory.
    pub fn with_value_factory(config: LockFreeCacheConfig, factory: ValueFactory<K, V, E>) -> Self {
        let slots = (0..config.capacity.get()).map(|_| Slot::empty()).collect();
        Self {
            slots,
            clock: AtomicU64::new(0),
            fill_lock: Mutex::new(()),
            filled: Condvar::new(),
            factory,
            metrics: ReadThroughMetrics::new(),
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of slots holding a computed value.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(**slot.state.load(), SlotState::Normal(..)))
            .count()
    }

    /// Returns `true` if no slot holds a computed value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value for `key`, computing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the value factory's error unchanged. The slot claimed for the
    /// failed fill is released and nothing is cached.
    pub fn get(&self, key: &K) -> Result<V, E> {
        for slot in self.slots.iter() {
            if let Some(value) = self.refresh(slot, key) {
                self.metrics.record_hit();
                return Ok(value);
            }
        }
        self.fill(key)
    }

    /// Returns clones of the resident entries in slot order.
    pub fn entries(&self) -> Vec<CacheEntry<K, V>> {
        self.slots
            .iter()
            .filter_map(|slot| match &**slot.state.load() {
                SlotState::Normal(key, value) => Some(CacheEntry::new(key.clone(), value.clone())),
                SlotState::Empty | SlotState::Updating(_) => None,
            })
            .collect()
    }

    /// Returns a snapshot of the cache's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    #[inline]
    fn next_tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Refreshes the tick of `slot` if it holds `key` and returns its value.
    fn refresh(&self, slot: &Slot<K, V>, key: &K) -> Option<V> {
        loop {
            let tick = slot.tick.load(Ordering::SeqCst);
            if tick == UPDATING {
                return None;
            }
            let state = slot.state.load();
            let value = match &**state {
                SlotState::Normal(k, v) if k == key => v,
                _ => return None,
            };
            // Claims and refills always move the tick away from `tick`, and
            // ticks are never reused, so a successful CAS proves `state` is
            // still the slot's content.
            if slot
                .tick
                .compare_exchange(tick, self.next_tick(), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Some(value.clone());
            }
        }
    }

    fn fill(&self, key: &K) -> Result<V, E> {
        let mut guard = self.fill_lock.lock();
        let (index, evicted) = loop {
            match self.claim(key) {
                Claim::Resident(value) => {
                    self.metrics.record_hit();
                    return Ok(value);
                }
                Claim::Placed { index, evicted } => break (index, evicted),
                Claim::InFlight | Claim::Saturated => {
                    self.metrics.record_fill_wait();
                    trace!("waiting for an in-flight fill");
                    self.filled.wait(&mut guard);
                }
            }
        };
        drop(guard);

        self.metrics.record_miss();
        if evicted {
            self.metrics.record_eviction();
            debug!("evicted least recently used entry from slot {index}");
        }
        trace!("claimed slot {index}, computing value");

        let reservation = Reservation {
            cache: self,
            index,
            completed: false,
        };
        match (self.factory)(key) {
            Ok(value) => {
                reservation.complete(key.clone(), value.clone());
                Ok(value)
            }
            Err(err) => {
                debug!("value factory failed, releasing slot {index}");
                drop(reservation);
                Err(err)
            }
        }
    }

    /// Decides where `key` goes. Must be called with `fill_lock` held.
    fn claim(&self, key: &K) -> Claim<V> {
        let mut first_empty = None;
        let mut oldest: Option<(usize, u64)> = None;

        for (index, slot) in self.slots.iter().enumerate() {
            let state = slot.state.load();
            match &**state {
                SlotState::Empty => {
                    if first_empty.is_none() {
                        first_empty = Some(index);
                    }
                }
                SlotState::Updating(k) => {
                    if k == key {
                        return Claim::InFlight;
                    }
                }
                SlotState::Normal(k, v) => {
                    if k == key {
                        slot.tick.store(self.next_tick(), Ordering::SeqCst);
                        return Claim::Resident(v.clone());
                    }
                    let tick = slot.tick.load(Ordering::SeqCst);
                    if oldest.map_or(true, |(_, oldest_tick)| tick < oldest_tick) {
                        oldest = Some((index, tick));
                    }
                }
            }
        }

        let (index, evicted) = match (first_empty, oldest) {
            (Some(index), _) => (index, false),
            (None, Some((index, _))) => (index, true),
            (None, None) => return Claim::Saturated,
        };

        let slot = &self.slots[index];
        slot.tick.store(UPDATING, Ordering::SeqCst);
        slot.state.store(Arc::new(SlotState::Updating(key.clone())));
        Claim::Placed { index, evicted }
    }
}

/// A claimed slot. Dropping it without `complete` returns the slot to
/// `Empty` and wakes waiters, which covers both factory errors and panics.
struct Reservation<'a, K, V, E> {
    cache: &'a LockFreeLruCache<K, V, E>,
    index: usize,
    completed: bool,
}

impl<K, V, E> Reservation<'_, K, V, E> {
    fn complete(mut self, key: K, value: V) {
        let _guard = self.cache.fill_lock.lock();
        let slot = &self.cache.slots[self.index];
        slot.state.store(Arc::new(SlotState::Normal(key, value)));
        slot.tick
            .store(self.cache.clock.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
        self.completed = true;
        self.cache.filled.notify_all();
    }
}

impl<K, V, E> Drop for Reservation<'_, K, V, E> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        self.cache.metrics.record_fill_failure();
        let _guard = self.cache.fill_lock.lock();
        let slot = &self.cache.slots[self.index];
        slot.tick.store(UPDATING, Ordering::SeqCst);
        slot.state.store(Arc::new(SlotState::Empty));
        self.cache.filled.notify_all();
    }
}

impl<K, V, E> ReadThroughCache<K, V> for LockFreeLruCache<K, V, E>
where
    K: Eq + Clone,
    V: Clone,
{
    type Error = E;

    fn get(&self, key: &K) -> Result<V, E> {
        LockFreeLruCache::get(self, key)
    }

    fn entries(&self) -> Vec<CacheEntry<K, V>> {
        LockFreeLruCache::entries(self)
    }

    fn capacity(&self) -> usize {
        LockFreeLruCache::capacity(self)
    }

    fn len(&self) -> usize {
        LockFreeLruCache::len(self)
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<K, V, E> CacheMetrics for LockFreeLruCache<K, V, E> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.snapshot().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "LockFreeLRU"
    }
}

impl<K, V, E> fmt::Debug for LockFreeLruCache<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeLruCache")
            .field("capacity", &self.slots.len())
            .field("clock", &self.clock.load(Ordering::Relaxed))
            .finish()
    }
}

/// Builds [`LockFreeLruCache`] shards.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockFreeFactory;

impl<K, V, E> CacheFactory<K, V, E> for LockFreeFactory
where
    K: Eq + Clone,
    V: Clone,
{
    type Cache = LockFreeLruCache<K, V, E>;

    fn build(&self, capacity: NonZeroUsize, factory: ValueFactory<K, V, E>) -> Self::Cache {
        LockFreeLruCache::with_value_factory(LockFreeCacheConfig::new(capacity), factory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoped_threadpool::Pool;
    use std::collections::HashSet;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::thread;
    use std::time::Duration;

    fn square_cache(cap: usize) -> LockFreeLruCache<u64, u64> {
        LockFreeLruCache::new(NonZeroUsize::new(cap).unwrap(), |k| Ok(k * k))
    }

    fn resident_keys<E>(cache: &LockFreeLruCache<u64, u64, E>) -> HashSet<u64> {
        cache.entries().into_iter().map(|e| e.key).collect()
    }

    fn wait_for(condition: impl Fn() -> bool) {
        while !condition() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_sequential_fill_evicts_oldest() {
        let cache = square_cache(2);
        assert_eq!(cache.get(&0), Ok(0));
        assert_eq!(cache.get(&1), Ok(1));
        assert_eq!(cache.get(&2), Ok(4));

        assert_eq!(resident_keys(&cache), HashSet::from([1, 2]));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_hit_refreshes_recency() {
        let cache = square_cache(3);
        for k in 0..3 {
            cache.get(&k).unwrap();
        }
        cache.get(&0).unwrap();
        cache.get(&3).unwrap();

        assert_eq!(resident_keys(&cache), HashSet::from([0, 2, 3]));
    }

    #[test]
    fn test_metrics_count_hits_misses_evictions() {
        let cache = square_cache(1);
        cache.get(&1).unwrap();
        cache.get(&1).unwrap();
        cache.get(&2).unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.requests, 3);
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 2);
        assert_eq!(metrics.evictions, 1);
        assert_eq!(cache.algorithm_name(), "LockFreeLRU");
    }

    #[test]
    fn test_factory_error_releases_slot() {
        let cache: LockFreeLruCache<u64, u64, String> =
            LockFreeLruCache::new(NonZeroUsize::new(2).unwrap(), |k| {
                if *k == 13 {
                    Err(format!("unlucky {k}"))
                } else {
                    Ok(*k)
                }
            });

        assert_eq!(cache.get(&1), Ok(1));
        assert_eq!(cache.get(&13), Err("unlucky 13".to_string()));
        assert_eq!(resident_keys(&cache), HashSet::from([1]));
        assert_eq!(cache.metrics().fill_failures, 1);

        // The released slot is reused before anything is evicted.
        assert_eq!(cache.get(&2), Ok(2));
        assert_eq!(resident_keys(&cache), HashSet::from([1, 2]));
        assert_eq!(cache.metrics().evictions, 0);
    }

    #[test]
    fn test_factory_panic_releases_slot() {
        let cache: LockFreeLruCache<u64, u64> =
            LockFreeLruCache::new(NonZeroUsize::new(1).unwrap(), |k| {
                assert_ne!(*k, 7, "refusing to compute 7");
                Ok(*k)
            });

        let result = panic::catch_unwind(AssertUnwindSafe(|| cache.get(&7)));
        assert!(result.is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.metrics().fill_failures, 1);
        assert_eq!(cache.get(&8), Ok(8));
        assert_eq!(cache.metrics().fill_failures, 1);
    }

    #[test]
    fn test_concurrent_misses_fill_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache: LockFreeLruCache<u64, u64> =
            LockFreeLruCache::new(NonZeroUsize::new(4).unwrap(), move |k| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                Ok(k + 100)
            });

        let mut pool = Pool::new(8);
        pool.scoped(|scope| {
            for _ in 0..8 {
                scope.execute(|| {
                    assert_eq!(cache.get(&5), Ok(105));
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.metrics().misses, 1);
    }

    #[test]
    fn test_waiter_observes_winner_value() {
        let release = Arc::new(AtomicBool::new(false));
        let gate = Arc::clone(&release);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache: Arc<LockFreeLruCache<u64, u64>> = Arc::new(LockFreeLruCache::new(
            NonZeroUsize::new(2).unwrap(),
            move |k| {
                counter.fetch_add(1, Ordering::SeqCst);
                while !gate.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
                Ok(k * 10)
            },
        ));

        let filler = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&3))
        };
        wait_for(|| calls.load(Ordering::SeqCst) == 1);

        let waiter = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&3))
        };
        wait_for(|| cache.metrics().fill_waits >= 1);
        release.store(true, Ordering::SeqCst);

        assert_eq!(filler.join().unwrap(), Ok(30));
        assert_eq!(waiter.join().unwrap(), Ok(30));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_waiter_woken_to_resident_counts_hit() {
        let release = Arc::new(AtomicBool::new(false));
        let gate = Arc::clone(&release);
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let cache: Arc<LockFreeLruCache<u64, u64>> = Arc::new(LockFreeLruCache::new(
            NonZeroUsize::new(1).unwrap(),
            move |k| {
                counter.fetch_add(1, Ordering::SeqCst);
                while !gate.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
                Ok(k + 1)
            },
        ));

        let filler = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&6))
        };
        wait_for(|| started.load(Ordering::SeqCst) == 1);

        let waiter = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&6))
        };
        wait_for(|| cache.metrics().fill_waits >= 1);
        assert_eq!(cache.metrics().hits, 0);
        release.store(true, Ordering::SeqCst);

        assert_eq!(filler.join().unwrap(), Ok(7));
        assert_eq!(waiter.join().unwrap(), Ok(7));

        // the waiter finds the filled slot during the locked re-scan
        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.requests, 2);
    }

    #[test]
    fn test_filler_waits_when_every_slot_is_updating() {
        let release = Arc::new(AtomicBool::new(false));
        let gate = Arc::clone(&release);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache: Arc<LockFreeLruCache<u64, u64>> = Arc::new(LockFreeLruCache::new(
            NonZeroUsize::new(1).unwrap(),
            move |k| {
                counter.fetch_add(1, Ordering::SeqCst);
                if *k == 1 {
                    while !gate.load(Ordering::SeqCst) {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                Ok(k * 10)
            },
        ));

        let first = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&1))
        };
        wait_for(|| calls.load(Ordering::SeqCst) == 1);

        let second = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&2))
        };
        wait_for(|| cache.metrics().fill_waits >= 1);
        // the only slot is still claimed for key 1
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
        release.store(true, Ordering::SeqCst);

        assert_eq!(first.join().unwrap(), Ok(10));
        assert_eq!(second.join().unwrap(), Ok(20));
        assert_eq!(resident_keys(&cache), HashSet::from([2]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn test_waiter_retries_after_failure() {
        let release = Arc::new(AtomicBool::new(false));
        let gate = Arc::clone(&release);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache: Arc<LockFreeLruCache<u64, u64, &'static str>> = Arc::new(
            LockFreeLruCache::new(NonZeroUsize::new(1).unwrap(), move |k| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    while !gate.load(Ordering::SeqCst) {
                        thread::sleep(Duration::from_millis(1));
                    }
                    return Err("first attempt failed");
                }
                Ok(*k)
            }),
        );

        let filler = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&9))
        };
        wait_for(|| calls.load(Ordering::SeqCst) == 1);

        let waiter = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&9))
        };
        wait_for(|| cache.metrics().fill_waits >= 1);
        release.store(true, Ordering::SeqCst);

        assert_eq!(filler.join().unwrap(), Err("first attempt failed"));
        assert_eq!(waiter.join().unwrap(), Ok(9));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(resident_keys(&cache), HashSet::from([9]));
    }

    #[test]
    fn test_factory_builds_empty_cache() {
        let square: ValueFactory<u64, u64, Infallible> = Arc::new(|k: &u64| Ok(k * k));
        let cache = LockFreeFactory.build(NonZeroUsize::new(3).unwrap(), square);
        assert_eq!(cache.capacity(), 3);
        assert!(cache.is_empty());
        assert_eq!(cache.get(&4), Ok(16));
    }
}
