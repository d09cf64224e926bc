//! Cache Store Module
//!
//! Main cache engine combining a hash index with an arena-backed recency
//! list and a single TTL shared by every entry.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, RecencyList, SystemClock};
use crate::error::{CacheError, Result};

// == Node ==
/// Payload of one recency-list slot. The key is kept alongside the entry so
/// an eviction from the list can drop the matching index entry.
#[derive(Debug)]
struct Node<K, V> {
    key: K,
    entry: CacheEntry<V>,
}

// == TTL LRU Cache ==
/// Capacity-bounded cache with LRU eviction and TTL expiration.
///
/// Every key in `index` maps to exactly one occupied slot in `order`, and
/// every occupied slot is indexed by its key. The cache does no locking of
/// its own; wrap it in [`SharedCache`](crate::cache::SharedCache) to share it.
#[derive(Debug)]
pub struct TtlLruCache<K, V, C = SystemClock> {
    /// Key to recency-list slot
    index: HashMap<K, usize>,
    /// Entries ordered from most to least recently used
    order: RecencyList<Node<K, V>>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Lifetime of every entry, measured from its last write
    ttl: Duration,
    clock: C,
}

impl<K, V> TtlLruCache<K, V, SystemClock>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates a new cache with the given capacity and TTL.
    ///
    /// Fails with [`CacheError::InvalidCapacity`] when `capacity` is zero.
    /// `ttl` keeps its full precision, so sub-second lifetimes are honoured.
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        Self::with_clock(capacity, ttl, SystemClock)
    }
}

impl<K, V, C> TtlLruCache<K, V, C>
where
    K: Hash + Eq + Clone,
    V: Clone,
    C: Clock,
{
    /// Creates a new cache driven by a custom clock.
    pub fn with_clock(capacity: usize, ttl: Duration, clock: C) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }

        Ok(Self {
            index: HashMap::with_capacity(capacity),
            order: RecencyList::with_capacity(capacity),
            stats: CacheStats::new(),
            capacity,
            ttl,
            clock,
        })
    }

    // == Get ==
    /// Retrieves a copy of the value stored under `key`.
    ///
    /// A hit moves the key to the most recently used position. An expired
    /// entry is removed on the spot and reported as a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();

        let Some(&slot) = self.index.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if self.is_slot_expired(slot, now) {
            self.remove_slot(slot);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!("Removed expired entry on get");
            return None;
        }

        self.order.move_to_front(slot);
        let node = self.order.get_mut(slot)?;
        node.entry.touch(now);
        self.stats.record_hit();
        Some(node.entry.value.clone())
    }

    // == Set ==
    /// Stores `value` under `key` as the most recently used entry.
    ///
    /// Overwriting an existing key replaces its value and restarts its TTL.
    /// Inserting a new key into a full cache first evicts the least recently
    /// used entry, whether or not that entry has expired.
    pub fn set(&mut self, key: K, value: V) {
        let now = self.clock.now();

        if let Some(&slot) = self.index.get(&key) {
            if let Some(node) = self.order.get_mut(slot) {
                node.entry.overwrite(value, now);
            }
            self.order.move_to_front(slot);
            return;
        }

        if self.index.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_back() {
                self.index.remove(&evicted.key);
                self.stats.record_eviction();
                debug!(
                    "Evicted least recently used entry at capacity {}",
                    self.capacity
                );
            }
        }

        let slot = self.order.push_front(Node {
            key: key.clone(),
            entry: CacheEntry::new(value, now),
        });
        self.index.insert(key, slot);
        self.stats.set_total_entries(self.index.len());
    }

    // == Has ==
    /// Reports whether `key` holds a live entry.
    ///
    /// Recency order is left untouched. An expired entry is removed, the
    /// same way [`get`](Self::get) would remove it.
    pub fn has<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();

        let Some(&slot) = self.index.get(key) else {
            return false;
        };

        if self.is_slot_expired(slot, now) {
            self.remove_slot(slot);
            self.stats.record_expirations(1);
            debug!("Removed expired entry on has");
            return false;
        }

        true
    }

    // == Delete ==
    /// Removes `key` regardless of its TTL state.
    ///
    /// Returns whether an entry was removed.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.remove(key) {
            Some(slot) => {
                self.order.remove(slot);
                self.stats.set_total_entries(self.index.len());
                true
            }
            None => false,
        }
    }

    // == Clear ==
    /// Drops every entry. Capacity, TTL and lifetime counters are kept.
    pub fn clear(&mut self) {
        self.index.clear();
        self.order.clear();
        self.stats.set_total_entries(0);
    }

    // == Cleanup ==
    /// Removes every entry whose TTL has elapsed.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;

        let expired: Vec<usize> = self
            .order
            .iter()
            .filter(|(_, node)| node.entry.is_expired(ttl, now))
            .map(|(slot, _)| slot)
            .collect();

        for &slot in &expired {
            self.remove_slot(slot);
        }

        self.stats.record_expirations(expired.len());
        if !expired.is_empty() {
            debug!("Swept {} expired entries", expired.len());
        }
        expired.len()
    }

    // == Size ==
    /// Number of entries physically stored.
    ///
    /// Entries that expired but have not been touched or swept yet are still
    /// counted, so this can over-report the number of live entries until the
    /// next access or [`cleanup`](Self::cleanup).
    pub fn size(&self) -> usize {
        self.index.len()
    }

    /// Alias for [`size`](Self::size).
    pub fn len(&self) -> usize {
        self.size()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Accessors ==
    /// Maximum number of entries, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lifetime shared by every entry, fixed at construction.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Inspection ==
    /// Remaining lifetime of a live entry, without touching recency.
    pub fn ttl_remaining<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let slot = *self.index.get(key)?;
        let node = self.order.get(slot)?;

        if node.entry.is_expired(self.ttl, now) {
            None
        } else {
            Some(node.entry.ttl_remaining(self.ttl, now))
        }
    }

    /// Key that the next capacity eviction would remove.
    pub fn peek_lru_key(&self) -> Option<&K> {
        let slot = self.order.back()?;
        self.order.get(slot).map(|node| &node.key)
    }

    /// Stored keys from least to most recently used, expired ones included.
    pub fn keys_lru(&self) -> Vec<K> {
        self.order.iter().map(|(_, node)| node.key.clone()).collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.index.len());
        stats
    }

    /// Zeroes the lifetime counters.
    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::new();
        self.stats.set_total_entries(self.index.len());
    }

    fn is_slot_expired(&self, slot: usize, now: Instant) -> bool {
        self.order
            .get(slot)
            .is_some_and(|node| node.entry.is_expired(self.ttl, now))
    }

    fn remove_slot(&mut self, slot: usize) -> Option<Node<K, V>> {
        let node = self.order.remove(slot)?;
        self.index.remove(&node.key);
        self.stats.set_total_entries(self.index.len());
        Some(node)
    }
}
