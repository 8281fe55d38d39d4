//! Environment-driven server configuration, snapshotted at startup.

use rlm_engine::EngineLimits;
use rlm_session::SessionLimits;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub base_dir: PathBuf,
    pub snapshots: bool,
    pub max_snapshots: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub limits: SessionLimits,
    pub engine: EngineLimits,
    pub regex_budget: Duration,
    pub scavenge_interval: Duration,
    pub storage: Option<StorageSettings>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            limits: SessionLimits::default(),
            engine: EngineLimits::default(),
            regex_budget: Duration::from_millis(rlm_search::DEFAULT_BUDGET_MS),
            scavenge_interval: Duration::from_secs(60),
            storage: None,
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| {
            let v = v.trim();
            !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
        })
        .unwrap_or(false)
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut limits = defaults.limits;
        limits.max_sessions = env_usize("RLM_MAX_SESSIONS", limits.max_sessions);
        limits.session_ttl = Duration::from_secs(env_u64(
            "RLM_SESSION_TTL_SECS",
            limits.session_ttl.as_secs(),
        ));
        limits.max_context_bytes = env_usize("RLM_MAX_CONTEXT_BYTES", limits.max_context_bytes);
        limits.max_session_bytes = env_usize("RLM_MAX_SESSION_BYTES", limits.max_session_bytes);
        limits.max_contexts = env_usize("RLM_MAX_CONTEXTS", limits.max_contexts);
        limits.max_variables = env_usize("RLM_MAX_VARIABLES", limits.max_variables);
        limits.max_variable_bytes = env_usize("RLM_MAX_VARIABLE_BYTES", limits.max_variable_bytes);
        limits.max_chunks = env_usize("RLM_MAX_CHUNKS", limits.max_chunks);
        limits.chunk_cache_entries =
            env_usize("RLM_CHUNK_CACHE_ENTRIES", limits.chunk_cache_entries);
        limits.chunk_cache_bytes = env_usize("RLM_CHUNK_CACHE_BYTES", limits.chunk_cache_bytes);
        limits.index_cache_entries =
            env_usize("RLM_INDEX_CACHE_ENTRIES", limits.index_cache_entries);
        limits.query_cache_entries =
            env_usize("RLM_QUERY_CACHE_ENTRIES", limits.query_cache_entries);

        let engine = EngineLimits {
            budget: Duration::from_millis(env_u64(
                "RLM_EXEC_BUDGET_MS",
                rlm_engine::DEFAULT_EXEC_BUDGET_MS,
            )),
            output_cap: env_usize("RLM_EXEC_OUTPUT_CAP", rlm_engine::DEFAULT_OUTPUT_CAP),
        };

        let storage = std::env::var("RLM_STORAGE_DIR")
            .ok()
            .map(|dir| dir.trim().to_string())
            .filter(|dir| !dir.is_empty())
            .map(|dir| StorageSettings {
                base_dir: PathBuf::from(dir),
                snapshots: env_flag("RLM_STORAGE_SNAPSHOTS"),
                max_snapshots: env_usize("RLM_STORAGE_MAX_SNAPSHOTS", 10),
            });

        Self {
            limits,
            engine,
            regex_budget: Duration::from_millis(env_u64(
                "RLM_REGEX_BUDGET_MS",
                rlm_search::DEFAULT_BUDGET_MS,
            )),
            scavenge_interval: Duration::from_secs(env_u64("RLM_SCAVENGE_INTERVAL_SECS", 60)),
            storage,
        }
    }
}
