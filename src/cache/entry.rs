//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A cached value plus the timestamps used for expiration and recency.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the value was last written
    pub inserted_at: Instant,
    /// When the value was last read or written
    pub last_accessed_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped at `now`.
    pub fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
            last_accessed_at: now,
        }
    }

    // == Age ==
    /// Time elapsed since the value was written.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }

    // == Is Expired ==
    /// Checks whether the entry has outlived `ttl`.
    ///
    /// Boundary condition: an entry is expired only once its age is strictly
    /// greater than `ttl`. At exactly `ttl` it is still live.
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        self.age(now) > ttl
    }

    // == Time To Live ==
    /// Remaining lifetime, or `Duration::ZERO` once expired.
    pub fn ttl_remaining(&self, ttl: Duration, now: Instant) -> Duration {
        ttl.saturating_sub(self.age(now))
    }

    // == Overwrite ==
    /// Replaces the value and restarts its lifetime.
    pub fn overwrite(&mut self, value: V, now: Instant) {
        self.value = value;
        self.inserted_at = now;
        self.last_accessed_at = now;
    }

    // == Touch ==
    /// Records a read at `now`. Does not extend the lifetime.
    pub fn touch(&mut self, now: Instant) {
        self.last_accessed_at = now;
    }
}
