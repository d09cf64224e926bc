//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache against a simple reference model.

use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::cache::{ManualClock, SharedCache, TtlLruCache};

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_millis(100);

// == Strategies ==
/// Small key space so that sequences revisit keys often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u32 },
    Get { key: String },
    Has { key: String },
    Delete { key: String },
    Advance { millis: u64 },
    Cleanup,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        2 => key_strategy().prop_map(|key| CacheOp::Has { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        2 => (0u64..60).prop_map(|millis| CacheOp::Advance { millis }),
        1 => Just(CacheOp::Cleanup),
    ]
}

// == Reference Model ==
/// Naive model: a deque in LRU -> MRU order plus write times in millis.
#[derive(Debug, Default)]
struct Model {
    order: VecDeque<String>,
    values: HashMap<String, (u32, u64)>,
    now: u64,
    capacity: usize,
    ttl: u64,
}

impl Model {
    fn new(capacity: usize, ttl: u64) -> Self {
        Self {
            capacity,
            ttl,
            ..Self::default()
        }
    }

    fn expired(&self, key: &str) -> bool {
        self.values
            .get(key)
            .is_some_and(|&(_, written)| self.now - written > self.ttl)
    }

    fn remove(&mut self, key: &str) -> bool {
        self.order.retain(|k| k != key);
        self.values.remove(key).is_some()
    }

    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
    }

    fn set(&mut self, key: &str, value: u32) {
        if !self.values.contains_key(key) && self.values.len() >= self.capacity {
            if let Some(victim) = self.order.pop_front() {
                self.values.remove(&victim);
            }
        }
        self.values.insert(key.to_string(), (value, self.now));
        self.touch(key);
    }

    fn get(&mut self, key: &str) -> Option<u32> {
        if self.expired(key) {
            self.remove(key);
            return None;
        }
        let value = self.values.get(key).map(|&(v, _)| v)?;
        self.touch(key);
        Some(value)
    }

    fn has(&mut self, key: &str) -> bool {
        if self.expired(key) {
            self.remove(key);
            return false;
        }
        self.values.contains_key(key)
    }

    fn cleanup(&mut self) -> usize {
        let expired: Vec<String> = self
            .values
            .keys()
            .filter(|k| self.expired(k))
            .cloned()
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // *For any* sequence of operations, the cache SHALL agree with the
    // reference model on every result and on the final recency order.
    #[test]
    fn prop_matches_reference_model(
        capacity in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let clock = ManualClock::new();
        let mut cache = TtlLruCache::with_clock(capacity, TEST_TTL, clock.clone()).unwrap();
        let mut model = Model::new(capacity, TEST_TTL.as_millis() as u64);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(key.clone(), value);
                    model.set(&key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), model.get(&key), "get({})", key);
                }
                CacheOp::Has { key } => {
                    prop_assert_eq!(cache.has(&key), model.has(&key), "has({})", key);
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key), model.remove(&key), "delete({})", key);
                }
                CacheOp::Advance { millis } => {
                    clock.advance(Duration::from_millis(millis));
                    model.now += millis;
                }
                CacheOp::Cleanup => {
                    prop_assert_eq!(cache.cleanup(), model.cleanup());
                }
            }

            prop_assert_eq!(cache.size(), model.values.len());
            prop_assert_eq!(cache.keys_lru(), model.order.iter().cloned().collect::<Vec<_>>());
        }
    }

    // *For any* sequence of SET operations, the number of entries in the cache
    // SHALL never exceed its capacity.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..50,
        keys in prop::collection::vec("[a-zA-Z0-9_]{1,16}", 1..200)
    ) {
        let mut cache = TtlLruCache::new(capacity, Duration::from_secs(300)).unwrap();

        for (i, key) in keys.into_iter().enumerate() {
            cache.set(key, i);
            prop_assert!(
                cache.size() <= capacity,
                "Cache size {} exceeds capacity {}",
                cache.size(),
                capacity
            );
        }
    }

    // *For any* filled cache, repeated HAS calls SHALL neither change their
    // answer nor protect the probed key from the next eviction.
    #[test]
    fn prop_has_is_idempotent(
        capacity in 2usize..10,
        probes in 1usize..10
    ) {
        let mut cache = TtlLruCache::new(capacity, Duration::from_secs(300)).unwrap();
        for i in 0..capacity {
            cache.set(i, i);
        }
        let before = cache.keys_lru();

        for _ in 0..probes {
            prop_assert!(cache.has(&0usize));
            prop_assert!(!cache.has(&capacity));
        }

        prop_assert_eq!(cache.keys_lru(), before);
        cache.set(capacity, capacity);
        prop_assert!(!cache.has(&0usize), "key 0 stays least recently used");
    }

    // *For any* GET on an existing key, that key SHALL become the most
    // recently used and SHALL NOT be the next eviction candidate.
    #[test]
    fn prop_lru_access_tracking(
        capacity in 3usize..10,
        access_index in 0usize..100
    ) {
        let mut cache = TtlLruCache::new(capacity, Duration::from_secs(300)).unwrap();
        for i in 0..capacity {
            cache.set(i, i * 10);
        }

        let accessed = access_index % capacity;
        prop_assert_eq!(cache.get(&accessed), Some(accessed * 10));

        let expected_evicted: usize = if accessed == 0 { 1 } else { 0 };
        cache.set(capacity, 0);

        prop_assert!(cache.has(&accessed), "accessed key {} was evicted", accessed);
        prop_assert!(
            !cache.has(&expected_evicted),
            "key {} should have been evicted",
            expected_evicted
        );
    }
}

// == Concurrency ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // *For any* set of concurrent operations through the shared handle, the
    // cache SHALL stay within capacity and every hit SHALL return a value
    // that was written under that key.
    #[test]
    fn prop_concurrent_operation_correctness(
        ops in prop::collection::vec(cache_op_strategy(), 10..60)
    ) {
        tokio_test::block_on(async {
            let cache: SharedCache<String, u32> =
                SharedCache::new(4, Duration::from_secs(300)).unwrap();
            let written: HashMap<String, Vec<u32>> = ops.iter().fold(HashMap::new(), |mut acc, op| {
                if let CacheOp::Set { key, value } = op {
                    acc.entry(key.clone()).or_default().push(*value);
                }
                acc
            });

            let mut handles = Vec::new();
            for op in ops {
                let cache = cache.clone();
                handles.push(tokio::spawn(async move {
                    match op {
                        CacheOp::Set { key, value } => {
                            cache.set(key, value).await;
                            None
                        }
                        CacheOp::Get { key } => {
                            let value = cache.get(&key).await;
                            value.map(|v| (key, v))
                        }
                        CacheOp::Has { key } => {
                            cache.has(&key).await;
                            None
                        }
                        CacheOp::Delete { key } => {
                            cache.delete(&key).await;
                            None
                        }
                        CacheOp::Advance { .. } => None,
                        CacheOp::Cleanup => {
                            cache.cleanup().await;
                            None
                        }
                    }
                }));
            }

            for handle in handles {
                let hit = handle.await.expect("Task should not panic");
                if let Some((key, value)) = hit {
                    let values = written.get(&key).cloned().unwrap_or_default();
                    prop_assert!(values.contains(&value), "{} returned unknown value {}", key, value);
                }
            }

            prop_assert!(cache.size().await <= 4);
            Ok(())
        })?;
    }
}
