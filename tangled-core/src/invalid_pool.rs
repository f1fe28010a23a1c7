// src/invalid_pool.rs

//! Bounded, age-purged pool of rejected message hashes.
//!
//! Remembering why a message was rejected lets the peer runtime answer
//! "have you seen this" without re-validating it, while the size and
//! age bounds keep a flood of garbage from growing the pool forever.

use crate::types::{Hash, Timestamp};
use std::collections::HashMap;

/// Tracks hashes known to be invalid, along with their last access time
pub struct InvalidPool {
    entries: HashMap<Hash, Timestamp>,
    max_size: usize,
    purge_after: i64,
}

impl InvalidPool {
    /// Creates a pool bounded to `max_size` entries, purging anything
    /// untouched for `purge_after` seconds
    pub fn new(max_size: usize, purge_after: i64) -> Self {
        Self {
            entries: HashMap::new(),
            max_size,
            purge_after,
        }
    }

    /// Records (or refreshes the access time of) a hash as invalid
    pub fn insert(&mut self, hash: Hash) {
        self.entries.insert(hash, crate::types::now());
        self.purge();
    }

    /// Checks whether a hash is in the pool, refreshing its access time
    /// if so
    pub fn contains(&mut self, hash: &str) -> bool {
        let present = self.entries.contains_key(hash);
        if present {
            self.entries.insert(hash.to_string(), crate::types::now());
        }
        self.purge();
        present
    }

    /// Checks whether a hash is in the pool without refreshing its
    /// access time or triggering a purge
    pub fn contains_ref(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    /// Number of entries currently tracked
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge(&mut self) {
        let now = crate::types::now();
        self.entries.retain(|_, t| *t + self.purge_after >= now);

        if self.entries.len() > self.max_size {
            let mut by_age: Vec<(Hash, Timestamp)> =
                self.entries.iter().map(|(h, t)| (h.clone(), *t)).collect();
            by_age.sort_by_key(|(_, t)| *t);

            let overflow = self.entries.len() - self.max_size;
            for (hash, _) in by_age.into_iter().take(overflow) {
                self.entries.remove(&hash);
            }
        }
    }
}
