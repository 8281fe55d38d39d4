//! The three process-wide caches: chunks, indices, query results.
//!
//! Keys are logical `(session, context, ...)` strings, never content
//! pointers; mutation is a key-scoped prefix invalidation. Every entry
//! carries a content-hash sidecar and is dropped on mismatch at lookup
//! time. Admission is LRU over entry count and (for chunks) total
//! estimated bytes. Invalidation is idempotent and safe to call while a
//! session's write lock is held.

use parking_lot::Mutex;
use rlm_chunker::Chunk;
use rlm_ranker::InvertedIndex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Separator for composite keys; cannot occur in validated ids.
const KEY_SEP: char = '\u{1f}';

struct CacheSlot<V> {
    value: V,
    bytes: usize,
    content_hash: String,
}

struct LruState<V> {
    entries: HashMap<String, CacheSlot<V>>,
    order: VecDeque<String>,
    max_entries: usize,
    /// 0 disables the byte bound.
    max_bytes: usize,
    total_bytes: usize,
}

impl<V: Clone> LruState<V> {
    fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
            max_bytes,
            total_bytes: 0,
        }
    }

    fn get(&mut self, key: &str, expected_hash: &str) -> Option<V> {
        let slot = self.entries.get(key)?;
        if slot.content_hash != expected_hash {
            self.remove(key);
            return None;
        }
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
        self.entries.get(key).map(|slot| slot.value.clone())
    }

    fn insert(&mut self, key: String, content_hash: String, bytes: usize, value: V) {
        self.remove(&key);
        self.entries.insert(
            key.clone(),
            CacheSlot {
                value,
                bytes,
                content_hash,
            },
        );
        self.order.push_back(key);
        self.total_bytes += bytes;
        self.evict_to_bounds();
    }

    fn remove(&mut self, key: &str) {
        if let Some(slot) = self.entries.remove(key) {
            self.total_bytes -= slot.bytes;
            self.order.retain(|k| k != key);
        }
    }

    fn evict_to_bounds(&mut self) {
        while self.entries.len() > self.max_entries
            || (self.max_bytes > 0 && self.total_bytes > self.max_bytes)
        {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(slot) = self.entries.remove(&oldest) {
                self.total_bytes -= slot.bytes;
                log::debug!("cache evicted entry {oldest}");
            }
        }
    }

    fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Composite key for a decomposition: `(session, context, strategy+options)`.
pub fn decomposition_key(session_id: &str, context_id: &str, strategy_key: &str) -> String {
    format!("{session_id}{KEY_SEP}{context_id}{KEY_SEP}{strategy_key}")
}

/// Composite key for a memoized query response.
pub fn query_key(session_id: &str, context_id: &str, kind: &str, options_key: &str) -> String {
    format!("{session_id}{KEY_SEP}{context_id}{KEY_SEP}{kind}{KEY_SEP}{options_key}")
}

/// Invalidation prefix for everything under `(session, context)`.
pub fn context_prefix(session_id: &str, context_id: &str) -> String {
    format!("{session_id}{KEY_SEP}{context_id}{KEY_SEP}")
}

/// Invalidation prefix for everything under a session.
pub fn session_prefix(session_id: &str) -> String {
    format!("{session_id}{KEY_SEP}")
}

pub struct ChunkCache {
    state: Mutex<LruState<Arc<Vec<Chunk>>>>,
}

impl ChunkCache {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            state: Mutex::new(LruState::new(max_entries, max_bytes)),
        }
    }

    pub fn get(&self, key: &str, content_hash: &str) -> Option<Arc<Vec<Chunk>>> {
        self.state.lock().get(key, content_hash)
    }

    pub fn insert(&self, key: String, content_hash: String, chunks: Arc<Vec<Chunk>>) {
        let bytes: usize = chunks
            .iter()
            .map(|c| crate::memory::estimate_string(&c.content) + 64)
            .sum();
        self.state.lock().insert(key, content_hash, bytes, chunks);
    }

    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.state.lock().invalidate_prefix(prefix)
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.state.lock().total_bytes
    }
}

pub struct IndexCache {
    state: Mutex<LruState<Arc<InvertedIndex>>>,
}

impl IndexCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(LruState::new(max_entries, 0)),
        }
    }

    pub fn get(&self, key: &str, content_hash: &str) -> Option<Arc<InvertedIndex>> {
        self.state.lock().get(key, content_hash)
    }

    pub fn insert(&self, key: String, content_hash: String, index: Arc<InvertedIndex>) {
        let bytes = index.estimated_bytes();
        self.state.lock().insert(key, content_hash, bytes, index);
    }

    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.state.lock().invalidate_prefix(prefix)
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.state.lock().total_bytes
    }
}

pub struct QueryCache {
    state: Mutex<LruState<Arc<serde_json::Value>>>,
}

impl QueryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(LruState::new(max_entries, 0)),
        }
    }

    pub fn get(&self, key: &str, content_hash: &str) -> Option<Arc<serde_json::Value>> {
        self.state.lock().get(key, content_hash)
    }

    pub fn insert(&self, key: String, content_hash: String, payload: Arc<serde_json::Value>) {
        let bytes = crate::memory::estimate_value(&payload);
        self.state.lock().insert(key, content_hash, bytes, payload);
    }

    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.state.lock().invalidate_prefix(prefix)
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lru_evicts_oldest_on_capacity() {
        let cache = QueryCache::new(2);
        cache.insert("a".into(), "h".into(), Arc::new(json!(1)));
        cache.insert("b".into(), "h".into(), Arc::new(json!(2)));
        cache.insert("c".into(), "h".into(), Arc::new(json!(3)));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", "h").is_none());
        assert!(cache.get("c", "h").is_some());
    }

    #[test]
    fn get_refreshes_recency() {
        let cache = QueryCache::new(2);
        cache.insert("a".into(), "h".into(), Arc::new(json!(1)));
        cache.insert("b".into(), "h".into(), Arc::new(json!(2)));
        cache.get("a", "h");
        cache.insert("c".into(), "h".into(), Arc::new(json!(3)));
        assert!(cache.get("a", "h").is_some());
        assert!(cache.get("b", "h").is_none());
    }

    #[test]
    fn stale_hash_drops_entry() {
        let cache = QueryCache::new(8);
        cache.insert("k".into(), "hash-1".into(), Arc::new(json!(1)));
        assert!(cache.get("k", "hash-2").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn prefix_invalidation_is_scoped_and_idempotent() {
        let cache = QueryCache::new(8);
        let k1 = query_key("s1", "ctx", "search", "o1");
        let k2 = query_key("s1", "ctx", "rank", "o2");
        let k3 = query_key("s1", "other", "search", "o1");
        let k4 = query_key("s2", "ctx", "search", "o1");
        for k in [&k1, &k2, &k3, &k4] {
            cache.insert(k.clone(), "h".into(), Arc::new(json!(1)));
        }
        let prefix = context_prefix("s1", "ctx");
        assert_eq!(cache.invalidate_prefix(&prefix), 2);
        assert_eq!(cache.invalidate_prefix(&prefix), 0);
        assert!(cache.get(&k3, "h").is_some());
        assert!(cache.get(&k4, "h").is_some());
    }

    #[test]
    fn context_prefix_does_not_match_id_extensions() {
        let cache = QueryCache::new(8);
        let short = query_key("s1", "ctx", "search", "o");
        let long = query_key("s1", "ctx2", "search", "o");
        cache.insert(short.clone(), "h".into(), Arc::new(json!(1)));
        cache.insert(long.clone(), "h".into(), Arc::new(json!(2)));
        assert_eq!(cache.invalidate_prefix(&context_prefix("s1", "ctx")), 1);
        assert!(cache.get(&long, "h").is_some());
    }

    #[test]
    fn index_cache_accounts_bytes() {
        let cache = IndexCache::new(8);
        assert_eq!(cache.total_bytes(), 0);
        let index = Arc::new(InvertedIndex::build(
            ["the cat sat", "dogs bark"],
            rlm_ranker::TokenizerMode::Auto,
        ));
        cache.insert("k".into(), "h".into(), index.clone());
        assert_eq!(cache.total_bytes(), index.estimated_bytes());
        cache.invalidate_prefix("k");
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn chunk_cache_respects_byte_bound() {
        let cache = ChunkCache::new(100, 400);
        let big_chunk = |content: &str| {
            Arc::new(vec![Chunk {
                index: 0,
                start_offset: 0,
                end_offset: content.len(),
                content: content.to_string(),
                metadata: None,
            }])
        };
        cache.insert("a".into(), "h".into(), big_chunk(&"x".repeat(100)));
        cache.insert("b".into(), "h".into(), big_chunk(&"y".repeat(100)));
        // Each entry is ~2*100+40+64 bytes; the bound fits only one.
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b", "h").is_some());
    }
}
