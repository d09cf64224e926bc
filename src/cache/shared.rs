//! Shared Cache Module
//!
//! Cloneable handle that serializes every cache operation through one lock.

use std::borrow::Borrow;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::cache::{CacheStats, Clock, SystemClock, TtlLruCache};
use crate::error::Result;

// == Shared Cache ==
/// Thread-safe handle around a single [`TtlLruCache`].
///
/// `get` and `has` take the write lock because both can reorder or remove
/// entries. Only the pure inspection calls use the read lock.
#[derive(Debug)]
pub struct SharedCache<K, V, C = SystemClock> {
    inner: Arc<RwLock<TtlLruCache<K, V, C>>>,
}

impl<K, V, C> Clone for SharedCache<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> SharedCache<K, V, SystemClock>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Builds a new cache and wraps it.
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        Ok(Self::from_cache(TtlLruCache::new(capacity, ttl)?))
    }
}

impl<K, V, C> SharedCache<K, V, C>
where
    K: Hash + Eq + Clone,
    V: Clone,
    C: Clock,
{
    /// Wraps an existing cache.
    pub fn from_cache(cache: TtlLruCache<K, V, C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.write().await.get(key)
    }

    pub async fn set(&self, key: K, value: V) {
        self.inner.write().await.set(key, value);
    }

    pub async fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.write().await.has(key)
    }

    pub async fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.write().await.delete(key)
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Sweeps expired entries and returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        self.inner.write().await.cleanup()
    }

    pub async fn size(&self) -> usize {
        self.inner.read().await.size()
    }

    pub async fn capacity(&self) -> usize {
        self.inner.read().await.capacity()
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }

    // == Cache Aside ==
    /// Returns the cached value for `key`, or computes, caches and returns it.
    ///
    /// `compute` runs without holding the lock, so two concurrent misses on
    /// the same key may both compute; the later write wins. An `Err` from
    /// `compute` is returned as-is and nothing is cached.
    pub async fn get_or_insert_with<F, Fut, E>(
        &self,
        key: K,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        let value = compute().await?;
        self.set(key, value.clone()).await;
        Ok(value)
    }
}
