//! Cache Entry Type
//!
//! [`CacheEntry`] is the key/value record shared by every cache in this crate.
//! The synchronized cache stores entries directly in its recency list and
//! rewrites them in place when a slot is recycled for a different key; every
//! cache hands out cloned entries from `entries()` for inspection.
//!
//! # Examples
//!
//! ```
//! use readthrough_cache::CacheEntry;
//!
//! let entry = CacheEntry::new("user:123", 42);
//! assert_eq!(entry.key, "user:123");
//! assert_eq!(entry.value, 42);
//!
//! let (key, value) = entry.into_pair();
//! assert_eq!((key, value), ("user:123", 42));
//! ```

use core::fmt;

/// A mutable key/value pair.
///
/// Owned by exactly one slot or list node while resident. Snapshots returned
/// by `entries()` are independent clones.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheEntry<K, V> {
    /// The cached key
    pub key: K,

    /// The value computed for `key` by the value factory
    pub value: V,
}

impl<K, V> CacheEntry<K, V> {
    /// Creates a new entry.
    #[inline]
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// Overwrites both fields, reusing the entry for a different key.
    #[inline]
    pub fn replace(&mut self, key: K, value: V) {
        self.key = key;
        self.value = value;
    }

    /// Consumes the entry and returns `(key, value)`.
    #[inline]
    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for CacheEntry<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CacheEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}
