use std::time::Duration;

/// Admission and eviction bounds for the registry and its caches.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    /// Global session-count cap; the LRU non-default session is evicted
    /// when a create would exceed it.
    pub max_sessions: usize,
    /// Idle TTL for non-default sessions.
    pub session_ttl: Duration,
    /// Per-context content cap, in bytes of UTF-8.
    pub max_context_bytes: usize,
    /// Per-session estimated-memory cap (contexts + variables).
    pub max_session_bytes: usize,
    pub max_contexts: usize,
    pub max_variables: usize,
    /// Per-variable estimated-size cap.
    pub max_variable_bytes: usize,
    /// Chunk-count ceiling per decomposition.
    pub max_chunks: usize,
    /// Execution-history ring depth.
    pub max_history: usize,
    pub chunk_cache_entries: usize,
    pub chunk_cache_bytes: usize,
    pub index_cache_entries: usize,
    pub query_cache_entries: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            session_ttl: Duration::from_secs(60 * 60),
            max_context_bytes: 100 * 1024 * 1024,
            max_session_bytes: 256 * 1024 * 1024,
            max_contexts: 50,
            max_variables: 100,
            max_variable_bytes: 1024 * 1024,
            max_chunks: 10_000,
            max_history: 100,
            chunk_cache_entries: 128,
            chunk_cache_bytes: 64 * 1024 * 1024,
            index_cache_entries: 64,
            query_cache_entries: 256,
        }
    }
}
