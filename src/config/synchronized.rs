//! Configuration for the synchronized LRU cache.
//!
//! # Examples
//!
//! ```
//! use readthrough_cache::config::SynchronizedCacheConfig;
//! use readthrough_cache::SynchronizedLruCache;
//! use core::num::NonZeroUsize;
//!
//! let config = SynchronizedCacheConfig {
//!     capacity: NonZeroUsize::new(10_000).unwrap(),
//! };
//! let cache: SynchronizedLruCache<String, usize> =
//!     SynchronizedLruCache::init(config, |k: &String| Ok(k.len()));
//! assert_eq!(cache.get(&"hello".to_string()), Ok(5));
//! ```

use crate::error::ConfigError;
use core::fmt;
use core::num::NonZeroUsize;

/// Configuration for a [`SynchronizedLruCache`](crate::SynchronizedLruCache).
///
/// # Fields
///
/// - `capacity`: Number of entries. The recency list pool and the key index
///   are both sized to it up front.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SynchronizedCacheConfig {
    /// Maximum number of resident entries
    pub capacity: NonZeroUsize,
}

impl SynchronizedCacheConfig {
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

impl fmt::Debug for SynchronizedCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronizedCacheConfig")
            .field("capacity", &self.capacity)
            .finish()
    }
}
