//! Configuration for the lock-free LRU cache.
//!
//! # Sizing Guidelines
//!
//! Every lookup scans the whole slot array, so the lock-free cache is meant
//! for small capacities (tens of entries) in front of expensive values, with
//! many threads reading concurrently. For larger working sets use the
//! synchronized cache, or shard several small lock-free caches.
//!
//! # Examples
//!
//! ```
//! use readthrough_cache::config::LockFreeCacheConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = LockFreeCacheConfig::new(NonZeroUsize::new(32).unwrap());
//! assert_eq!(config.capacity.get(), 32);
//!
//! assert!(LockFreeCacheConfig::try_new(0).is_err());
//! ```

use crate::error::ConfigError;
use core::fmt;
use core::num::NonZeroUsize;

/// Configuration for a [`LockFreeLruCache`](crate::LockFreeLruCache).
///
/// # Fields
///
/// - `capacity`: Number of slots. Fixed for the lifetime of the cache.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LockFreeCacheConfig {
    /// Maximum number of resident entries (the slot array length)
    pub capacity: NonZeroUsize,
}

impl LockFreeCacheConfig {
    /// Creates a configuration with the given capacity.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { capacity }
    }

    /// Creates a configuration from a plain integer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or_else(|| ConfigError::new("capacity must be > 0"))
    }
}

impl fmt::Debug for LockFreeCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeCacheConfig")
            .field("capacity", &self.capacity)
            .finish()
    }
}
