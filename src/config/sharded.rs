//! Configuration for the sharded cache.
//!
//! A sharded cache is configured per shard: every shard gets exactly
//! `shard_capacity` entries, and the total is `shards * shard_capacity`.
//!
//! # Examples
//!
//! ```
//! use readthrough_cache::config::ShardedCacheConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = ShardedCacheConfig::new(
//!     NonZeroUsize::new(4).unwrap(),
//!     NonZeroUsize::new(8).unwrap(),
//! );
//! assert_eq!(config.total_capacity(), 32);
//!
//! // Shard count derived from the machine's parallelism
//! let config = ShardedCacheConfig::with_default_shards(NonZeroUsize::new(8).unwrap());
//! assert!(config.shards.get() >= 4);
//! ```

use crate::error::ConfigError;
use core::fmt;
use core::num::NonZeroUsize;

/// Returns the default number of shards based on available parallelism.
///
/// Clamped to `[4, 64]`; falls back to 16 when parallelism is unknown.
pub fn default_shard_count() -> NonZeroUsize {
    let shards = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(16)
        .clamp(4, 64);
    NonZeroUsize::new(shards).unwrap_or(NonZeroUsize::MIN)
}

/// Configuration for a [`ShardedCache`](crate::ShardedCache).
///
/// # Fields
///
/// - `shards`: Number of independent inner caches
/// - `shard_capacity`: Capacity handed to each inner cache
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ShardedCacheConfig {
    /// Number of shards the key space is split into
    pub shards: NonZeroUsize,
    /// Capacity of every shard
    pub shard_capacity: NonZeroUsize,
}

impl ShardedCacheConfig {
    /// Creates a configuration with the given shard count and per-shard capacity.
    #[must_use]
    pub fn new(shards: NonZeroUsize, shard_capacity: NonZeroUsize) -> Self {
        Self {
            shards,
            shard_capacity,
        }
    }

    /// Creates a configuration using [`default_shard_count`] shards.
    #[must_use]
    pub fn with_default_shards(shard_capacity: NonZeroUsize) -> Self {
        Self::new(default_shard_count(), shard_capacity)
    }

    /// Creates a configuration from plain integers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either value is zero.
    pub fn try_new(shards: usize, shard_capacity: usize) -> Result<Self, ConfigError> {
        let shards =
            NonZeroUsize::new(shards).ok_or_else(|| ConfigError::new("shards must be > 0"))?;
        let shard_capacity = NonZeroUsize::new(shard_capacity)
            .ok_or_else(|| ConfigError::new("shard capacity must be > 0"))?;
        Ok(Self::new(shards, shard_capacity))
    }

    /// Returns `shards * shard_capacity`, saturating on overflow.
    #[inline]
    pub fn total_capacity(&self) -> usize {
        self.shards.get().saturating_mul(self.shard_capacity.get())
    }
}

impl fmt::Debug for ShardedCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCacheConfig")
            .field("shards", &self.shards)
            .field("shard_capacity", &self.shard_capacity)
            .finish()
    }
}
