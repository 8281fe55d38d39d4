//! Scavenger and TTL behavior over the registry.

use rlm_session::{SessionLimits, SessionRegistry, DEFAULT_SESSION_ID};
use std::time::{Duration, SystemTime};

fn registry_with_ttl(ttl: Duration) -> SessionRegistry {
    SessionRegistry::new(
        SessionLimits {
            session_ttl: ttl,
            ..Default::default()
        },
        None,
    )
}

#[test]
fn scavenger_evicts_only_idle_non_default_sessions() {
    let registry = registry_with_ttl(Duration::from_secs(3_600));
    let idle = registry.create_session().expect("idle session");
    let active = registry.create_session().expect("active session");

    // Backdate the idle session past the TTL; the default session is
    // backdated too and must survive regardless.
    for id in [&idle, DEFAULT_SESSION_ID] {
        let handle = registry.session(id).expect("session");
        handle.write().last_activity = SystemTime::now() - Duration::from_secs(7_200);
    }

    let evicted = registry.scavenge();
    assert_eq!(evicted, vec![idle.clone()]);
    assert!(registry.session(&idle).is_err());
    assert!(registry.session(&active).is_ok());
    assert!(registry.session(DEFAULT_SESSION_ID).is_ok());
    assert_eq!(registry.evictions_total(), 1);
}

#[test]
fn eviction_drops_cached_entries_for_the_session() {
    let registry = registry_with_ttl(Duration::from_secs(1));
    let session_id = registry.create_session().expect("session");
    registry
        .load_context(Some(&session_id), "doc", "cached content".into())
        .expect("load");

    let key = rlm_session::decomposition_key(&session_id, "doc", "by_paragraphs");
    let hash = rlm_session::content_hash("cached content");
    registry
        .chunk_cache
        .insert(key.clone(), hash.clone(), std::sync::Arc::new(Vec::new()));

    {
        let handle = registry.session(&session_id).expect("session");
        handle.write().last_activity = SystemTime::now() - Duration::from_secs(10);
    }
    registry.scavenge();

    assert!(registry.chunk_cache.get(&key, &hash).is_none());
}

#[test]
fn fresh_sessions_survive_scavenge() {
    let registry = registry_with_ttl(Duration::from_secs(3_600));
    let session = registry.create_session().expect("session");
    assert!(registry.scavenge().is_empty());
    assert!(registry.session(&session).is_ok());
}
