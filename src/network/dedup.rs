//! Dedup Cache
//!
//! Remembers processed feed message ids. Bounded by wholesale clearing:
//! once it holds more than the threshold the whole set is dropped. Feed TTL expiry
//! keeps old ids from coming back after a clear.

use std::collections::HashSet;

/// Default id threshold before the cache is cleared.
pub const DEFAULT_DEDUP_THRESHOLD: usize = 1000;

/// Set of processed message ids.
#[derive(Debug, Clone)]
pub struct DedupCache {
    seen: HashSet<String>,
    threshold: usize,
    clears: u64,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_THRESHOLD)
    }
}

impl DedupCache {
    /// Create a cache cleared once it exceeds `threshold` ids.
    pub fn new(threshold: usize) -> Self {
        Self {
            seen: HashSet::new(),
            threshold: threshold.max(1),
            clears: 0,
        }
    }

    /// Record `id`. Returns `false` if it was already seen.
    pub fn check_and_insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.seen.len() > self.threshold {
            self.seen.clear();
            self.clears += 1;
        }
        self.seen.insert(id.to_string());
        true
    }

    /// True if `id` is currently remembered.
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Ids currently remembered.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True when nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Times the cache has been cleared.
    pub fn clears(&self) -> u64 {
        self.clears
    }
}
