//! Bounded rolling buffer of detected attack patterns

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use crate::{config::DetectorConfig, types::AttackPattern};

#[derive(Debug)]
pub struct PatternBuffer {
    patterns: VecDeque<AttackPattern>,
    max_size: usize,
    max_age: Duration,
}

impl PatternBuffer {
    pub fn new(max_size: usize, max_age_secs: u64) -> Self {
        Self {
            patterns: VecDeque::with_capacity(max_size.min(1024)),
            max_size: max_size.max(1),
            max_age: Duration::seconds(max_age_secs as i64),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.buffer_max_size, config.buffer_max_age_secs)
    }

    /// Inserts unless a pattern with the same type and evidence is already held.
    /// Oldest entries are evicted once the buffer exceeds its size.
    pub fn insert(&mut self, pattern: AttackPattern, now: DateTime<Utc>) -> bool {
        self.evict_expired(now);
        if self.patterns.iter().any(|p| p.same_evidence(&pattern)) {
            return false;
        }
        self.patterns.push_back(pattern);
        while self.patterns.len() > self.max_size {
            self.patterns.pop_front();
        }
        true
    }

    /// Returns how many patterns were newly inserted.
    pub fn extend(&mut self, patterns: impl IntoIterator<Item = AttackPattern>, now: DateTime<Utc>) -> usize {
        let mut inserted = 0;
        for pattern in patterns {
            if self.insert(pattern, now) {
                inserted += 1;
            }
        }
        inserted
    }

    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.patterns.len();
        let cutoff = now - self.max_age;
        self.patterns.retain(|p| p.detected_at > cutoff);
        before - self.patterns.len()
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<AttackPattern> {
        self.patterns.iter().rev().take(limit).cloned().collect()
    }

    pub fn since(&self, cutoff: DateTime<Utc>) -> Vec<AttackPattern> {
        self.patterns
            .iter()
            .filter(|p| p.detected_at >= cutoff)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
