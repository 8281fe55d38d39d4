//! The process-wide session registry.
//!
//! Owns all sessions and the three caches, enforces quotas, and coordinates
//! invalidation. Each session is its own serialization domain behind a
//! read/write lock; the registry's table lock is held only for lookups and
//! lifecycle changes, never across content mutation.
//!
//! Mutation ordering (invariant): before new content becomes observable,
//! the prior content is snapshotted (when a sink is attached), then chunk,
//! index, and query caches are invalidated for the `(session, context)`
//! prefix, and only then is the new context published.

use crate::cache::{context_prefix, session_prefix, ChunkCache, IndexCache, QueryCache};
use crate::context::{Context, ContextMetadata};
use crate::decomposition::DecompositionRecord;
use crate::ids::{validate_context_id, validate_variable_name};
use crate::limits::SessionLimits;
use crate::memory;
use crate::session::Session;
use parking_lot::RwLock;
use rlm_chunker::Strategy;
use rlm_protocol::{ErrorCode, Result, RlmError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// The distinguished session for clients that do not manage sessions.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Sentinel context id that disables the decomposition-record ownership
/// check on lookup.
pub const MAIN_CONTEXT_SENTINEL: &str = "main";

/// Pre-mutation snapshot consumer (file-backed storage, when enabled).
pub trait SnapshotSink: Send + Sync {
    fn snapshot(
        &self,
        session_id: &str,
        context_id: &str,
        content: &str,
        metadata: &ContextMetadata,
        created_at: SystemTime,
    );
}

/// Append direction for [`SessionRegistry::append_context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    Append,
    Prepend,
}

/// Aggregate snapshot for metrics gauges.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub session_count: usize,
    pub total_memory_bytes: usize,
    pub chunk_cache_entries: usize,
    pub chunk_cache_bytes: usize,
    pub index_cache_entries: usize,
    pub index_cache_bytes: usize,
    pub query_cache_entries: usize,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<RwLock<Session>>>>,
    limits: SessionLimits,
    pub chunk_cache: ChunkCache,
    pub index_cache: IndexCache,
    pub query_cache: QueryCache,
    snapshot_sink: Option<Arc<dyn SnapshotSink>>,
    session_counter: AtomicU64,
    decompose_counter: AtomicU64,
    evictions: AtomicU64,
}

impl SessionRegistry {
    pub fn new(limits: SessionLimits, snapshot_sink: Option<Arc<dyn SnapshotSink>>) -> Self {
        let registry = Self {
            sessions: RwLock::new(HashMap::new()),
            chunk_cache: ChunkCache::new(limits.chunk_cache_entries, limits.chunk_cache_bytes),
            index_cache: IndexCache::new(limits.index_cache_entries),
            query_cache: QueryCache::new(limits.query_cache_entries),
            limits,
            snapshot_sink,
            session_counter: AtomicU64::new(1),
            decompose_counter: AtomicU64::new(1),
            evictions: AtomicU64::new(0),
        };
        registry
            .sessions
            .write()
            .insert(DEFAULT_SESSION_ID.to_string(), new_session(DEFAULT_SESSION_ID));
        registry
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    // -- session lifecycle -------------------------------------------------

    /// Create a fresh session. When the cap is reached the least-recently
    /// active non-default session is evicted first.
    pub fn create_session(&self) -> Result<String> {
        let id = format!(
            "sess-{:06}",
            self.session_counter.fetch_add(1, Ordering::Relaxed)
        );
        self.admit_session(id.clone())?;
        Ok(id)
    }

    fn admit_session(&self, id: String) -> Result<()> {
        loop {
            {
                let mut sessions = self.sessions.write();
                if sessions.len() < self.limits.max_sessions {
                    sessions.insert(id.clone(), new_session(&id));
                    return Ok(());
                }
            }
            let Some(victim) = self.least_recently_active() else {
                return Err(RlmError::new(
                    ErrorCode::SessionMaxReached,
                    format!("session cap of {} reached", self.limits.max_sessions),
                ));
            };
            log::debug!("session cap reached; evicting {victim}");
            self.destroy_session(&victim)?;
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn least_recently_active(&self) -> Option<String> {
        let sessions = self.sessions.read();
        sessions
            .iter()
            .filter(|(id, _)| id.as_str() != DEFAULT_SESSION_ID)
            .min_by_key(|(_, session)| session.read().last_activity)
            .map(|(id, _)| id.clone())
    }

    /// Strict lookup; touches last-activity.
    pub fn session(&self, id: &str) -> Result<Arc<RwLock<Session>>> {
        let handle = self
            .sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RlmError::session_not_found(id))?;
        handle.write().touch();
        Ok(handle)
    }

    /// Resolve the caller's session: `None` means the default session;
    /// an unknown explicit id is created on demand (subject to the cap).
    pub fn session_or_create(&self, id: Option<&str>) -> Result<Arc<RwLock<Session>>> {
        let id = id.unwrap_or(DEFAULT_SESSION_ID);
        if let Some(handle) = self.sessions.read().get(id).cloned() {
            handle.write().touch();
            return Ok(handle);
        }
        self.admit_session(id.to_string())?;
        self.session(id)
    }

    /// Clear a session's state in place, invalidating its cache entries.
    pub fn clear_session(&self, id: &str) -> Result<()> {
        let handle = self.session(id)?;
        {
            let mut session = handle.write();
            self.invalidate_session_caches(id);
            session.clear();
        }
        Ok(())
    }

    /// Remove a session entirely. Destroying the default session clears it
    /// instead; `default` always exists.
    pub fn destroy_session(&self, id: &str) -> Result<()> {
        if id == DEFAULT_SESSION_ID {
            return self.clear_session(id);
        }
        let removed = self.sessions.write().remove(id);
        if removed.is_none() {
            return Err(RlmError::session_not_found(id));
        }
        self.invalidate_session_caches(id);
        Ok(())
    }

    /// Evict non-default sessions idle beyond the TTL. Returns the evicted
    /// ids; invoked by the background scavenger.
    pub fn scavenge(&self) -> Vec<String> {
        let now = SystemTime::now();
        let expired: Vec<String> = {
            let sessions = self.sessions.read();
            sessions
                .iter()
                .filter(|(id, _)| id.as_str() != DEFAULT_SESSION_ID)
                .filter(|(_, session)| {
                    now.duration_since(session.read().last_activity)
                        .map(|idle| idle >= self.limits.session_ttl)
                        .unwrap_or(false)
                })
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in &expired {
            log::debug!("scavenger evicting idle session {id}");
            if self.destroy_session(id).is_ok() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        expired
    }

    pub fn evictions_total(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    // -- context mutation --------------------------------------------------

    /// Create or replace a named context.
    pub fn load_context(
        &self,
        session_id: Option<&str>,
        context_id: &str,
        text: String,
    ) -> Result<ContextMetadata> {
        validate_context_id(context_id)?;
        self.check_context_size(&text)?;

        let handle = self.session_or_create(session_id)?;
        let mut session = handle.write();
        let session_key = session.id.clone();

        let replacing = session.context(context_id).is_some();
        if !replacing && session.context_count() >= self.limits.max_contexts {
            return Err(RlmError::new(
                ErrorCode::VariableLimitExceeded,
                format!("context cap of {} reached", self.limits.max_contexts),
            ));
        }

        let incoming = match session.context(context_id) {
            Some(prior) => prior.replaced(text),
            None => Context::new(text),
        };
        self.check_memory_projection(&session, context_id, incoming.estimated_bytes())?;

        self.pre_mutation(&session_key, context_id, session.context(context_id));
        let metadata = incoming.metadata;
        session.insert_context(context_id.to_string(), incoming);
        session.touch();
        Ok(metadata)
    }

    /// Append or prepend to a context. On any admission failure the prior
    /// context is left intact.
    pub fn append_context(
        &self,
        session_id: Option<&str>,
        context_id: &str,
        text: &str,
        mode: AppendMode,
        create_if_missing: bool,
    ) -> Result<ContextMetadata> {
        validate_context_id(context_id)?;
        let handle = self.session_or_create(session_id)?;
        let mut session = handle.write();
        let session_key = session.id.clone();

        let Some(existing) = session.context(context_id) else {
            if !create_if_missing {
                return Err(RlmError::context_not_found(context_id));
            }
            drop(session);
            drop(handle);
            return self.load_context(session_id, context_id, text.to_string());
        };

        let mut combined =
            String::with_capacity(existing.content.len().saturating_add(text.len()));
        match mode {
            AppendMode::Append => {
                combined.push_str(&existing.content);
                combined.push_str(text);
            }
            AppendMode::Prepend => {
                combined.push_str(text);
                combined.push_str(&existing.content);
            }
        }
        self.check_context_size(&combined)?;
        let incoming = existing.replaced(combined);
        self.check_memory_projection(&session, context_id, incoming.estimated_bytes())?;

        self.pre_mutation(&session_key, context_id, session.context(context_id));
        let metadata = incoming.metadata;
        session.insert_context(context_id.to_string(), incoming);
        session.touch();
        Ok(metadata)
    }

    /// Drop a context from live memory, returning it so the caller can
    /// persist it. Downstream caches are invalidated first.
    pub fn unload_context(&self, session_id: Option<&str>, context_id: &str) -> Result<Context> {
        validate_context_id(context_id)?;
        let handle = self.session_or_create(session_id)?;
        let mut session = handle.write();
        let session_key = session.id.clone();
        if session.context(context_id).is_none() {
            return Err(RlmError::context_not_found(context_id));
        }
        self.invalidate_context_caches(&session_key, context_id);
        let removed = session
            .remove_context(context_id)
            .expect("presence checked above");
        session.touch();
        Ok(removed)
    }

    fn check_context_size(&self, text: &str) -> Result<()> {
        if text.len() > self.limits.max_context_bytes {
            return Err(RlmError::new(
                ErrorCode::ContextTooLarge,
                format!(
                    "content of {} bytes exceeds the {}-byte cap",
                    text.len(),
                    self.limits.max_context_bytes
                ),
            ));
        }
        Ok(())
    }

    fn check_memory_projection(
        &self,
        session: &Session,
        context_id: &str,
        incoming_bytes: usize,
    ) -> Result<()> {
        let current_context = session
            .context(context_id)
            .map(Context::estimated_bytes)
            .unwrap_or(0);
        let projected = session.memory_bytes() - current_context + incoming_bytes;
        if projected > self.limits.max_session_bytes {
            return Err(RlmError::new(
                ErrorCode::SessionMemoryExceeded,
                format!(
                    "projected session memory {projected} exceeds the {}-byte cap",
                    self.limits.max_session_bytes
                ),
            ));
        }
        Ok(())
    }

    /// Invariant steps (a)-(d): snapshot prior content, then invalidate all
    /// three caches for the `(session, context)` prefix.
    fn pre_mutation(&self, session_id: &str, context_id: &str, prior: Option<&Context>) {
        if let (Some(sink), Some(context)) = (self.snapshot_sink.as_ref(), prior) {
            sink.snapshot(
                session_id,
                context_id,
                &context.content,
                &context.metadata,
                context.created_at,
            );
        }
        self.invalidate_context_caches(session_id, context_id);
    }

    fn invalidate_context_caches(&self, session_id: &str, context_id: &str) {
        let prefix = context_prefix(session_id, context_id);
        let chunks = self.chunk_cache.invalidate_prefix(&prefix);
        let indices = self.index_cache.invalidate_prefix(&prefix);
        let queries = self.query_cache.invalidate_prefix(&prefix);
        if chunks + indices + queries > 0 {
            log::debug!(
                "invalidated {chunks} chunk, {indices} index, {queries} query entries for {session_id}/{context_id}"
            );
        }
    }

    fn invalidate_session_caches(&self, session_id: &str) {
        let prefix = session_prefix(session_id);
        self.chunk_cache.invalidate_prefix(&prefix);
        self.index_cache.invalidate_prefix(&prefix);
        self.query_cache.invalidate_prefix(&prefix);
    }

    // -- variables ---------------------------------------------------------

    pub fn set_variable(
        &self,
        session_id: Option<&str>,
        name: &str,
        value: serde_json::Value,
    ) -> Result<()> {
        validate_variable_name(name)?;
        let estimate = memory::estimate_value(&value);
        if estimate > self.limits.max_variable_bytes {
            return Err(RlmError::new(
                ErrorCode::MemoryLimitExceeded,
                format!(
                    "variable of {} bytes exceeds the {}-byte cap",
                    estimate, self.limits.max_variable_bytes
                ),
            ));
        }

        let handle = self.session_or_create(session_id)?;
        let mut session = handle.write();
        let replacing = session.variable(name).is_some();
        if !replacing && session.variable_count() >= self.limits.max_variables {
            return Err(RlmError::new(
                ErrorCode::VariableLimitExceeded,
                format!("variable cap of {} reached", self.limits.max_variables),
            ));
        }
        let prior_bytes = session
            .variable(name)
            .map(memory::estimate_value)
            .unwrap_or(0);
        let projected = session.memory_bytes() - prior_bytes + estimate;
        if projected > self.limits.max_session_bytes {
            return Err(RlmError::new(
                ErrorCode::SessionMemoryExceeded,
                format!(
                    "projected session memory {projected} exceeds the {}-byte cap",
                    self.limits.max_session_bytes
                ),
            ));
        }
        session.set_variable(name.to_string(), value);
        session.touch();
        Ok(())
    }

    pub fn get_variable(
        &self,
        session_id: Option<&str>,
        name: &str,
    ) -> Result<Option<serde_json::Value>> {
        let handle = self.session_or_create(session_id)?;
        let session = handle.read();
        Ok(session.variable(name).cloned())
    }

    // -- decomposition records ---------------------------------------------

    /// Mint and store a record for a completed decomposition.
    pub fn record_decomposition(
        &self,
        session: &mut Session,
        context_id: &str,
        strategy: &Strategy,
    ) -> DecompositionRecord {
        let record = DecompositionRecord {
            id: format!(
                "dec-{:06}",
                self.decompose_counter.fetch_add(1, Ordering::Relaxed)
            ),
            context_id: context_id.to_string(),
            strategy: strategy.name().to_string(),
            options: strategy.options_json(),
            created_at: rlm_protocol::unix_ms_now(),
        };
        session.record_decomposition(record.clone());
        record
    }

    /// Resolve a prior decomposition.
    ///
    /// With `decompose_id`, the recorded context is authoritative: a caller
    /// context that disagrees fails unless it is the `main` sentinel. With
    /// `use_last`, the context's own last record wins; a missing context
    /// falls back to the session's most recent record.
    pub fn resolve_decomposition(
        &self,
        session: &Session,
        caller_context: Option<&str>,
        decompose_id: Option<&str>,
    ) -> Result<DecompositionRecord> {
        if let Some(id) = decompose_id {
            let record = session.decomposition(id).ok_or_else(|| {
                RlmError::invalid_input(format!("unknown decompose_id '{id}'"))
                    .with_details(serde_json::json!({ "decompose_id": id }))
            })?;
            if let Some(ctx) = caller_context {
                if ctx != MAIN_CONTEXT_SENTINEL && ctx != record.context_id {
                    return Err(RlmError::invalid_input(format!(
                        "decompose_id '{id}' belongs to context '{}', not '{ctx}'",
                        record.context_id
                    )));
                }
            }
            return Ok(record.clone());
        }

        if let Some(ctx) = caller_context {
            if session.context(ctx).is_some() {
                return session
                    .last_decomposition_for(ctx)
                    .cloned()
                    .ok_or_else(|| {
                        RlmError::invalid_input(format!(
                            "no decomposition recorded for context '{ctx}'"
                        ))
                    });
            }
        }
        session
            .last_decomposition()
            .cloned()
            .ok_or_else(|| RlmError::invalid_input("no prior decomposition in session"))
    }

    // -- aggregate stats ---------------------------------------------------

    pub fn stats(&self) -> RegistryStats {
        let sessions = self.sessions.read();
        let total_memory_bytes = sessions
            .values()
            .map(|handle| handle.read().memory_bytes())
            .sum();
        RegistryStats {
            session_count: sessions.len(),
            total_memory_bytes,
            chunk_cache_entries: self.chunk_cache.len(),
            chunk_cache_bytes: self.chunk_cache.total_bytes(),
            index_cache_entries: self.index_cache.len(),
            index_cache_bytes: self.index_cache.total_bytes(),
            query_cache_entries: self.query_cache.len(),
        }
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

fn new_session(id: &str) -> Arc<RwLock<Session>> {
    Arc::new(RwLock::new(Session::new(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::decomposition_key;
    use serde_json::json;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(SessionLimits::default(), None)
    }

    fn small_limits() -> SessionLimits {
        SessionLimits {
            max_sessions: 3,
            max_contexts: 2,
            max_variables: 2,
            max_session_bytes: 10_000,
            max_context_bytes: 1_000,
            max_variable_bytes: 500,
            ..Default::default()
        }
    }

    #[test]
    fn default_session_always_exists() {
        let registry = registry();
        assert!(registry.session(DEFAULT_SESSION_ID).is_ok());
        registry.destroy_session(DEFAULT_SESSION_ID).expect("clears");
        assert!(registry.session(DEFAULT_SESSION_ID).is_ok());
    }

    #[test]
    fn load_and_read_back() {
        let registry = registry();
        let metadata = registry
            .load_context(None, "doc", "hello world".into())
            .expect("load succeeds");
        assert_eq!(metadata.length, 11);
        let handle = registry.session(DEFAULT_SESSION_ID).expect("session");
        let session = handle.read();
        assert_eq!(&*session.context("doc").expect("context").content, "hello world");
    }

    #[test]
    fn load_rejects_invalid_ids_and_oversize() {
        let registry = SessionRegistry::new(small_limits(), None);
        let err = registry
            .load_context(None, "bad id", "x".into())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidContextId);

        let err = registry
            .load_context(None, "doc", "x".repeat(2_000))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ContextTooLarge);
    }

    #[test]
    fn context_count_cap_is_enforced() {
        let registry = SessionRegistry::new(small_limits(), None);
        registry.load_context(None, "a", "1".into()).expect("a");
        registry.load_context(None, "b", "2".into()).expect("b");
        let err = registry.load_context(None, "c", "3".into()).unwrap_err();
        assert_eq!(err.code, ErrorCode::VariableLimitExceeded);
        // Replacing an existing context is still allowed.
        registry.load_context(None, "a", "1x".into()).expect("replace");
    }

    #[test]
    fn memory_projection_leaves_prior_context_intact() {
        let limits = SessionLimits {
            max_session_bytes: 300,
            ..small_limits()
        };
        let registry = SessionRegistry::new(limits, None);
        registry.load_context(None, "doc", "x".repeat(100)).expect("fits");
        let err = registry
            .append_context(None, "doc", &"y".repeat(120), AppendMode::Append, false)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionMemoryExceeded);

        let handle = registry.session(DEFAULT_SESSION_ID).expect("session");
        let session = handle.read();
        assert_eq!(session.context("doc").expect("context").content.len(), 100);
    }

    #[test]
    fn append_and_prepend() {
        let registry = registry();
        registry.load_context(None, "doc", "mid".into()).expect("load");
        registry
            .append_context(None, "doc", "-end", AppendMode::Append, false)
            .expect("append");
        registry
            .append_context(None, "doc", "start-", AppendMode::Prepend, false)
            .expect("prepend");
        let handle = registry.session(DEFAULT_SESSION_ID).expect("session");
        assert_eq!(
            &*handle.read().context("doc").expect("context").content,
            "start-mid-end"
        );
    }

    #[test]
    fn append_missing_respects_create_flag() {
        let registry = registry();
        let err = registry
            .append_context(None, "ghost", "x", AppendMode::Append, false)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ContextNotFound);
        registry
            .append_context(None, "ghost", "x", AppendMode::Append, true)
            .expect("created");
    }

    #[test]
    fn mutation_invalidates_context_caches() {
        let registry = registry();
        registry.load_context(None, "c", "hello".into()).expect("load");

        let key = decomposition_key(DEFAULT_SESSION_ID, "c", "fixed_size?size=2&overlap=0");
        let hash = crate::content_hash::content_hash("hello");
        registry
            .chunk_cache
            .insert(key.clone(), hash.clone(), Arc::new(Vec::new()));
        assert!(registry.chunk_cache.get(&key, &hash).is_some());

        registry
            .append_context(None, "c", " world", AppendMode::Append, false)
            .expect("append");
        assert!(registry.chunk_cache.get(&key, &hash).is_none());
    }

    #[test]
    fn unload_returns_context_and_invalidates() {
        let registry = registry();
        registry.load_context(None, "c", "body".into()).expect("load");
        let removed = registry.unload_context(None, "c").expect("unload");
        assert_eq!(&*removed.content, "body");
        let err = registry.unload_context(None, "c").unwrap_err();
        assert_eq!(err.code, ErrorCode::ContextNotFound);
    }

    #[test]
    fn variable_caps() {
        let registry = SessionRegistry::new(small_limits(), None);
        registry.set_variable(None, "a", json!(1)).expect("a");
        registry.set_variable(None, "b", json!(2)).expect("b");
        let err = registry.set_variable(None, "c", json!(3)).unwrap_err();
        assert_eq!(err.code, ErrorCode::VariableLimitExceeded);

        let err = registry
            .set_variable(None, "a", json!("x".repeat(400)))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MemoryLimitExceeded);

        let err = registry.set_variable(None, "__proto__", json!(1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn session_cap_evicts_lru_non_default() {
        let registry = SessionRegistry::new(small_limits(), None);
        let s1 = registry.create_session().expect("s1");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let s2 = registry.create_session().expect("s2");
        // Touch s1 so s2 becomes the LRU.
        registry.session(&s1).expect("touch s1");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let _s3 = registry.create_session().expect("s3");
        assert!(registry.session(&s2).is_err());
        assert!(registry.session(&s1).is_ok());
        assert!(registry.session(DEFAULT_SESSION_ID).is_ok());
        assert_eq!(registry.evictions_total(), 1);
    }

    #[test]
    fn resolve_decomposition_semantics() {
        let registry = registry();
        registry.load_context(None, "a", "text a".into()).expect("a");
        registry.load_context(None, "b", "text b".into()).expect("b");
        let handle = registry.session(DEFAULT_SESSION_ID).expect("session");
        let strategy = Strategy::ByParagraphs;
        let (rec_a, rec_b) = {
            let mut session = handle.write();
            let rec_a = registry.record_decomposition(&mut session, "a", &strategy);
            let rec_b = registry.record_decomposition(&mut session, "b", &strategy);
            (rec_a, rec_b)
        };

        let session = handle.read();
        // Per-context last record.
        let found = registry
            .resolve_decomposition(&session, Some("a"), None)
            .expect("found");
        assert_eq!(found.id, rec_a.id);
        // Missing context falls back to the session-global most recent.
        let found = registry
            .resolve_decomposition(&session, Some("missing-ctx"), None)
            .expect("global fallback")
            .id;
        assert_eq!(found, rec_b.id);
        // Explicit id with mismatched caller context fails...
        let err = registry
            .resolve_decomposition(&session, Some("b"), Some(&rec_a.id))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        // ...unless the caller passed the sentinel.
        assert!(registry
            .resolve_decomposition(&session, Some(MAIN_CONTEXT_SENTINEL), Some(&rec_a.id))
            .is_ok());
    }

    #[test]
    fn clear_session_resets_state_and_caches() {
        let registry = registry();
        registry.load_context(None, "c", "text".into()).expect("load");
        let key = decomposition_key(DEFAULT_SESSION_ID, "c", "by_paragraphs");
        let hash = crate::content_hash::content_hash("text");
        registry
            .query_cache
            .insert(key.clone(), hash.clone(), Arc::new(json!({})));

        registry.clear_session(DEFAULT_SESSION_ID).expect("clear");
        assert!(registry.query_cache.get(&key, &hash).is_none());
        let handle = registry.session(DEFAULT_SESSION_ID).expect("session");
        assert_eq!(handle.read().context_count(), 0);
    }

    #[test]
    fn stats_aggregate() {
        let registry = registry();
        registry.load_context(None, "c", "abcd".into()).expect("load");
        let stats = registry.stats();
        assert_eq!(stats.session_count, 1);
        assert_eq!(stats.total_memory_bytes, 48);
    }
}
