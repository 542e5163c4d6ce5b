//! Time-bucketed result cache
//!
//! Keys combine the request parameters with the request time truncated to
//! `bucket` so near-simultaneous identical requests coalesce. Eviction is by
//! insertion order, not recency of use.

use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use crate::config::CacheConfig;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
}

#[derive(Debug)]
pub struct ResultCache<V> {
    entries: HashMap<u64, CacheEntry<V>>,
    insertion_order: VecDeque<u64>,
    ttl: Duration,
    bucket_secs: i64,
    capacity: usize,
    stats: CacheStats,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration, bucket: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            ttl,
            bucket_secs: bucket.num_seconds().max(1),
            capacity: capacity.max(1),
            stats: CacheStats::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Duration::seconds(config.ttl_secs as i64),
            Duration::seconds(config.bucket_secs as i64),
            config.capacity,
        )
    }

    pub fn key<K: Hash + ?Sized>(&self, params: &K, at: DateTime<Utc>) -> u64 {
        let mut hasher = DefaultHasher::new();
        params.hash(&mut hasher);
        at.timestamp().div_euclid(self.bucket_secs).hash(&mut hasher);
        hasher.finish()
    }

    /// Hit only when the entry for this bucket is younger than the TTL.
    pub fn get<K: Hash + ?Sized>(&mut self, params: &K, now: DateTime<Utc>) -> Option<V> {
        let key = self.key(params, now);
        let fresh = match self.entries.get(&key) {
            Some(entry) => now - entry.inserted_at < self.ttl,
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if fresh {
            self.stats.hits += 1;
            self.entries.get(&key).map(|e| e.value.clone())
        } else {
            self.remove_key(key);
            self.stats.misses += 1;
            None
        }
    }

    pub fn insert<K: Hash + ?Sized>(&mut self, params: &K, value: V, now: DateTime<Utc>) {
        let key = self.key(params, now);
        if self.entries.contains_key(&key) {
            self.insertion_order.retain(|k| *k != key);
        }
        self.entries.insert(key, CacheEntry { value, inserted_at: now });
        self.insertion_order.push_back(key);

        while self.entries.len() > self.capacity {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    self.stats.evictions += 1;
                }
                None => break,
            }
        }
    }

    /// Drops every entry at or past its TTL.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, e)| now - e.inserted_at >= self.ttl)
            .map(|(k, _)| *k)
            .collect();
        for key in &expired {
            self.remove_key(*key);
        }
        expired.len()
    }

    fn remove_key(&mut self, key: u64) {
        self.entries.remove(&key);
        self.insertion_order.retain(|k| *k != key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { len: self.entries.len(), ..self.stats }
    }
}
