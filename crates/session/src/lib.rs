//! Session and context lifecycle for the RLM server.
//!
//! A process-wide [`SessionRegistry`] owns isolated sessions (contexts,
//! variables, decomposition records, execution history, answer state),
//! enforces admission quotas, evicts idle sessions, and coordinates
//! invalidation across the chunk, index, and query caches whenever a
//! context mutates.

mod cache;
mod content_hash;
mod context;
mod decomposition;
mod history;
mod ids;
mod limits;
mod memory;
mod registry;
mod session;

pub use cache::{
    context_prefix, decomposition_key, query_key, session_prefix, ChunkCache, IndexCache,
    QueryCache,
};
pub use content_hash::content_hash;
pub use context::{Context, ContextMetadata};
pub use decomposition::DecompositionRecord;
pub use history::ExecutionRecord;
pub use ids::{validate_context_id, validate_variable_name, MAX_ID_LEN, RESERVED_VARIABLE_NAMES};
pub use limits::SessionLimits;
pub use memory::{estimate_string, estimate_value};
pub use registry::{
    AppendMode, RegistryStats, SessionRegistry, SnapshotSink, DEFAULT_SESSION_ID,
    MAIN_CONTEXT_SENTINEL,
};
pub use session::{AnswerState, Session};
