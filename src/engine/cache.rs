//! Analysis cache: write-once, read-many, LRU-bounded by entry count.
//!
//! Storage is a process-global `DashMap` so reads never block each other; a
//! small mutex-guarded recency queue provides the LRU eviction order without
//! forcing every read through a single lock.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;

use super::types::{AnalysisResult, CacheKey};

pub struct AnalysisCache {
    map: DashMap<CacheKey, AnalysisResult>,
    order: Mutex<VecDeque<CacheKey>>,
    capacity: usize,
}

impl AnalysisCache {
    pub fn new(capacity: usize) -> Self {
        Self { map: DashMap::new(), order: Mutex::new(VecDeque::new()), capacity: capacity.max(1) }
    }

    pub fn get(&self, key: &CacheKey) -> Option<AnalysisResult> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: CacheKey, value: AnalysisResult) {
        // Partial results are transient evidence, not stable ground truth;
        // never cache them, or a later full scan would be shadowed by a
        // stale timeout.
        if value.partial {
            return;
        }
        if self.map.contains_key(&key) {
            self.map.insert(key, value);
            return;
        }
        self.map.insert(key.clone(), value);
        let mut order = self.order.lock().unwrap();
        order.push_back(key);
        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.map.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fen: &str, depth: u32) -> CacheKey {
        CacheKey { normalized_fen: fen.to_string(), depth, multi_pv: 1 }
    }

    fn result(eval_cp: i32) -> AnalysisResult {
        AnalysisResult { eval_cp, partial: false, ..AnalysisResult::empty() }
    }

    #[test]
    fn evicts_oldest_entry_past_capacity() {
        let cache = AnalysisCache::new(2);
        cache.insert(key("a", 2), result(1));
        cache.insert(key("b", 2), result(2));
        cache.insert(key("c", 2), result(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("a", 2)).is_none());
        assert!(cache.get(&key("c", 2)).is_some());
    }

    #[test]
    fn never_caches_partial_results() {
        let cache = AnalysisCache::new(4);
        let mut partial = result(1);
        partial.partial = true;
        cache.insert(key("a", 2), partial);
        assert_eq!(cache.len(), 0);
    }
}
