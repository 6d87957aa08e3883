//! Cache Metrics System
//!
//! Every cache keeps a [`ReadThroughMetrics`] block of atomic counters that
//! can be bumped from any thread without taking the cache's lock. Reading
//! them produces a plain [`MetricsSnapshot`], which sharded caches sum across
//! their shards.
//!
//! # Why BTreeMap for reporting?
//!
//! [`CacheMetrics::metrics`] returns a `BTreeMap` so that metric names always
//! come out in the same order, which keeps benchmark output and test
//! assertions reproducible.
//!
//! # Counter definitions
//!
//! - `requests`: calls to `get`
//! - `hits`: requests served from a resident entry
//! - `misses`: requests that invoked the value factory
//! - `fill_failures`: factory invocations that returned an error, or that
//!   panicked inside the lock-free cache
//! - `evictions`: resident entries displaced to make room for another key
//! - `fill_waits`: times a filler blocked because the same key was already
//!   being computed by another thread (lock-free cache only)

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters shared by all callers of one cache instance.
#[derive(Debug, Default)]
pub struct ReadThroughMetrics {
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    fill_failures: AtomicU64,
    evictions: AtomicU64,
    fill_waits: AtomicU64,
}

impl ReadThroughMetrics {
    /// Creates a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a lookup served from a resident entry.
    #[inline]
    pub fn record_hit(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a lookup that had to invoke the value factory.
    #[inline]
    pub fn record_miss(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a value factory failure.
    #[inline]
    pub fn record_fill_failure(&self) {
        self.fill_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an entry displaced by a different key.
    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one wait for another thread's in-flight fill.
    #[inline]
    pub fn record_fill_wait(&self) {
        self.fill_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter into a [`MetricsSnapshot`].
    ///
    /// Counters are read one by one, so a snapshot taken under concurrent
    /// load may be off by the operations that raced with it.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fill_failures: self.fill_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            fill_waits: self.fill_waits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a cache's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total number of lookups
    pub requests: u64,
    /// Lookups served from a resident entry
    pub hits: u64,
    /// Lookups that invoked the value factory
    pub misses: u64,
    /// Value factory invocations that failed
    pub fill_failures: u64,
    /// Entries displaced to make room for a different key
    pub evictions: u64,
    /// Waits on another thread's in-flight fill
    pub fill_waits: u64,
}

impl MetricsSnapshot {
    /// Hit rate between 0.0 and 1.0, or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Miss rate between 0.0 and 1.0, or 0.0 if no requests have been made.
    pub fn miss_rate(&self) -> f64 {
        if self.requests > 0 {
            self.misses as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Converts the snapshot to a BTreeMap for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("cache_hits".to_string(), self.hits as f64);
        metrics.insert("cache_misses".to_string(), self.misses as f64);
        metrics.insert("fill_failures".to_string(), self.fill_failures as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("fill_waits".to_string(), self.fill_waits as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());

        metrics
    }
}

impl Add for MetricsSnapshot {
    type Output = MetricsSnapshot;

    fn add(mut self, rhs: MetricsSnapshot) -> MetricsSnapshot {
        self += rhs;
        self
    }
}

impl AddAssign for MetricsSnapshot {
    fn add_assign(&mut self, rhs: MetricsSnapshot) {
        self.requests += rhs.requests;
        self.hits += rhs.hits;
        self.misses += rhs.misses;
        self.fill_failures += rhs.fill_failures;
        self.evictions += rhs.evictions;
        self.fill_waits += rhs.fill_waits;
    }
}

impl std::iter::Sum for MetricsSnapshot {
    fn sum<I: Iterator<Item = MetricsSnapshot>>(iter: I) -> Self {
        iter.fold(MetricsSnapshot::default(), Add::add)
    }
}

/// Trait that all caches implement for metrics reporting
///
/// Provides a uniform interface for retrieving metrics from any cache
/// implementation, so benchmark drivers can compare strategies side by side.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Algorithm name for identification (e.g. "LockFreeLRU")
    fn algorithm_name(&self) -> &'static str;
}
