//! Error types for the read-through caches.
//!
//! ## Key Components
//!
//! - [`CapacityExceeded`]: Returned by [`RecencyList`](crate::list::RecencyList)
//!   when an element is added to a full list. The caches always remove before
//!   re-adding, so seeing this from a cache is a bug.
//! - [`ConfigError`]: Returned when configuration parameters are invalid
//!   (e.g. zero capacity, zero shards).
//!
//! Errors raised by a value factory are never wrapped: every cache returns the
//! factory's own error type unchanged.

use std::fmt;

// ---------------------------------------------------------------------------
// CapacityExceeded
// ---------------------------------------------------------------------------

/// Error returned when adding to a [`RecencyList`](crate::list::RecencyList)
/// that already holds `capacity` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded {
    capacity: usize,
}

impl CapacityExceeded {
    /// Creates a new `CapacityExceeded` for a list of the given capacity.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Returns the capacity of the list that rejected the element.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Display for CapacityExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trying to add more than {} elements to a fixed-capacity list",
            self.capacity
        )
    }
}

impl std::error::Error for CapacityExceeded {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by the `try_new` constructors in [`config`](crate::config).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use readthrough_cache::config::ShardedCacheConfig;
///
/// let err = ShardedCacheConfig::try_new(0, 16).unwrap_err();
/// assert!(err.to_string().contains("shards"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}
