//! Tool dispatch for the RLM server.
//!
//! The `#[tool]` methods are thin: parameter shapes live in
//! `tools::schemas`, per-area handlers in the sibling modules. Shared
//! per-process state (registry, caches, engine, metrics, storage) hangs off
//! an `Arc<ServiceState>` cloned into every connection.

mod context;
mod decompose;
mod execute;
mod rank;
mod search;
mod session;

use crate::config::ServerConfig;
use crate::metrics::Metrics;
use crate::storage::FileContextStore;
use crate::tokenizer::TokenizerCache;
use crate::tools::catalog;
use crate::tools::schemas::context::{
    AppendContextRequest, GetContextInfoRequest, LoadContextRequest, ReadContextRequest,
    UnloadContextRequest,
};
use crate::tools::schemas::decompose::{
    DecomposeContextRequest, GetChunksRequest, GetStatisticsRequest, SuggestStrategyRequest,
};
use crate::tools::schemas::execute::ExecuteCodeRequest;
use crate::tools::schemas::metrics::GetMetricsRequest;
use crate::tools::schemas::rank::RankChunksRequest;
use crate::tools::schemas::search::{FindAllRequest, SearchContextRequest};
use crate::tools::schemas::session::{
    ClearSessionRequest, CreateSessionRequest, GetAnswerRequest, GetSessionInfoRequest,
    GetVariableRequest, SetAnswerRequest, SetVariableRequest,
};
use rlm_engine::{EngineLimits, ExpressionEngine};
use rlm_protocol::RlmError;
use rlm_session::{SessionRegistry, SnapshotSink};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub struct ServiceState {
    pub config: ServerConfig,
    pub registry: Arc<SessionRegistry>,
    pub engine: ExpressionEngine,
    pub metrics: Metrics,
    pub tokenizers: TokenizerCache,
    pub storage: Option<Arc<FileContextStore>>,
    trace_counter: AtomicU64,
}

impl ServiceState {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let storage = match &config.storage {
            Some(settings) => Some(Arc::new(
                FileContextStore::new(settings.clone())
                    .map_err(|err| anyhow::anyhow!(err.to_string()))?,
            )),
            None => None,
        };
        let sink: Option<Arc<dyn SnapshotSink>> = storage
            .as_ref()
            .map(|store| store.clone() as Arc<dyn SnapshotSink>);
        let registry = Arc::new(SessionRegistry::new(config.limits.clone(), sink));
        let engine = ExpressionEngine::new(
            registry.clone(),
            EngineLimits {
                budget: config.engine.budget,
                output_cap: config.engine.output_cap,
            },
        );
        Ok(Self {
            config,
            registry,
            engine,
            metrics: Metrics::new(),
            tokenizers: TokenizerCache::default(),
            storage,
            trace_counter: AtomicU64::new(1),
        })
    }

    fn next_trace_id(&self) -> String {
        format!("t-{:06}", self.trace_counter.fetch_add(1, Ordering::Relaxed))
    }
}

/// Serialize a payload into a successful tool result.
pub(crate) fn json_result<T: Serialize>(payload: &T) -> Result<CallToolResult, McpError> {
    let raw = serde_json::to_string(payload)
        .map_err(|err| McpError::internal_error(err.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(raw)]))
}

/// Serialize a typed core error into the transport envelope.
pub(crate) fn error_result(
    state: &ServiceState,
    err: RlmError,
) -> Result<CallToolResult, McpError> {
    Metrics::incr(&state.metrics.counters.tool_calls_failed);
    let envelope = err.to_envelope(Some(state.next_trace_id()));
    let raw = serde_json::to_string(&envelope)
        .map_err(|err| McpError::internal_error(err.to_string(), None))?;
    Ok(CallToolResult::error(vec![Content::text(raw)]))
}

/// Counts the call on construction and records `tool_duration_ms` on drop.
pub(crate) struct ToolTimer<'a> {
    state: &'a ServiceState,
    started: Instant,
}

impl<'a> ToolTimer<'a> {
    pub(crate) fn start(state: &'a ServiceState) -> Self {
        Metrics::incr(&state.metrics.counters.tool_calls_total);
        Self {
            state,
            started: Instant::now(),
        }
    }

    pub(crate) fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1_000.0
    }
}

impl Drop for ToolTimer<'_> {
    fn drop(&mut self) {
        self.state
            .metrics
            .histograms
            .tool_duration_ms
            .record(self.elapsed_ms());
    }
}

/// RLM MCP service: context infrastructure for long-context reasoning
/// agents.
#[derive(Clone)]
pub struct RlmService {
    state: Arc<ServiceState>,
    tool_router: ToolRouter<Self>,
}

impl RlmService {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(ServiceState::new(config)?),
            tool_router: Self::tool_router(),
        })
    }

    pub fn state(&self) -> &Arc<ServiceState> {
        &self.state
    }
}

#[tool_router]
impl RlmService {
    /// Create or replace a named context.
    #[tool(
        description = "Load text into a named context in a session (create or replace). Returns derived metadata (length, lines, words, structure)."
    )]
    pub async fn rlm_load_context(
        &self,
        Parameters(request): Parameters<LoadContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        context::load_context(&self.state, request).await
    }

    /// Append or prepend content.
    #[tool(
        description = "Append or prepend content to an existing context. Invalidates cached decompositions, indices, and query results for that context."
    )]
    pub async fn rlm_append_context(
        &self,
        Parameters(request): Parameters<AppendContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        context::append_context(&self.state, request).await
    }

    /// Drop a context from live memory.
    #[tool(
        description = "Drop a context from live memory. With file-backed storage enabled the content is persisted first."
    )]
    pub async fn rlm_unload_context(
        &self,
        Parameters(request): Parameters<UnloadContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        context::unload_context(&self.state, request).await
    }

    /// Context metadata and optional preview.
    #[tool(description = "Get context metadata (length, lines, words, structure) plus an optional content preview.")]
    pub async fn rlm_get_context_info(
        &self,
        Parameters(request): Parameters<GetContextInfoRequest>,
    ) -> Result<CallToolResult, McpError> {
        context::get_context_info(&self.state, request).await
    }

    /// Ranged read.
    #[tool(
        description = "Read a range of a context by char offsets (start_char/end_char) or 1-indexed lines (start_line/end_line)."
    )]
    pub async fn rlm_read_context(
        &self,
        Parameters(request): Parameters<ReadContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        context::read_context(&self.state, request).await
    }

    /// Decompose into chunks.
    #[tool(
        description = "Decompose a context into chunks under a named strategy. Returns a decompose_id for later rlm_get_chunks / rlm_rank_chunks calls."
    )]
    pub async fn rlm_decompose_context(
        &self,
        Parameters(request): Parameters<DecomposeContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        decompose::decompose_context(&self.state, request).await
    }

    /// Fetch chunk content.
    #[tool(
        description = "Fetch chunk content by indices, resolved through a decompose_id or the last decomposition."
    )]
    pub async fn rlm_get_chunks(
        &self,
        Parameters(request): Parameters<GetChunksRequest>,
    ) -> Result<CallToolResult, McpError> {
        decompose::get_chunks(&self.state, request).await
    }

    /// Regex search.
    #[tool(
        description = "Regex search over a context with line numbers, capture groups, and context windows. Patterns are ReDoS-checked; execution is time-budgeted."
    )]
    pub async fn rlm_search_context(
        &self,
        Parameters(request): Parameters<SearchContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        search::search_context(&self.state, request).await
    }

    /// Substring scan.
    #[tool(description = "Scan a context for a literal substring, returning char offsets and line numbers.")]
    pub async fn rlm_find_all(
        &self,
        Parameters(request): Parameters<FindAllRequest>,
    ) -> Result<CallToolResult, McpError> {
        search::find_all(&self.state, request).await
    }

    /// BM25 ranking.
    #[tool(
        description = "Rank the chunks of a decomposition against a query with BM25 (k1=1.5, b=0.75). Index is built lazily and cached per decomposition."
    )]
    pub async fn rlm_rank_chunks(
        &self,
        Parameters(request): Parameters<RankChunksRequest>,
    ) -> Result<CallToolResult, McpError> {
        rank::rank_chunks(&self.state, request).await
    }

    /// Strategy recommendation.
    #[tool(
        description = "Recommend a decomposition strategy from content heuristics. Signals behind the recommendation are included."
    )]
    pub async fn rlm_suggest_strategy(
        &self,
        Parameters(request): Parameters<SuggestStrategyRequest>,
    ) -> Result<CallToolResult, McpError> {
        decompose::suggest_strategy(&self.state, request).await
    }

    /// Structural statistics.
    #[tool(
        description = "Structural statistics of a context: length, lines, words, paragraphs, sentences, headers, structure tag."
    )]
    pub async fn rlm_get_statistics(
        &self,
        Parameters(request): Parameters<GetStatisticsRequest>,
    ) -> Result<CallToolResult, McpError> {
        decompose::get_statistics(&self.state, request).await
    }

    /// Sandboxed execution.
    #[tool(
        description = "Run a sandboxed snippet against session state (curated helpers, 30s budget, capped output). Script failures come back as success:false, never as tool errors."
    )]
    pub async fn rlm_execute_code(
        &self,
        Parameters(request): Parameters<ExecuteCodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        execute::execute_code(&self.state, request).await
    }

    /// Set a session variable.
    #[tool(description = "Set a session-scoped variable (JSON value).")]
    pub async fn rlm_set_variable(
        &self,
        Parameters(request): Parameters<SetVariableRequest>,
    ) -> Result<CallToolResult, McpError> {
        session::set_variable(&self.state, request).await
    }

    /// Get a session variable.
    #[tool(description = "Get a session-scoped variable.")]
    pub async fn rlm_get_variable(
        &self,
        Parameters(request): Parameters<GetVariableRequest>,
    ) -> Result<CallToolResult, McpError> {
        session::get_variable(&self.state, request).await
    }

    /// Set or append the answer.
    #[tool(description = "Set (or append to) the session's incrementally-built answer and its readiness flag.")]
    pub async fn rlm_set_answer(
        &self,
        Parameters(request): Parameters<SetAnswerRequest>,
    ) -> Result<CallToolResult, McpError> {
        session::set_answer(&self.state, request).await
    }

    /// Read the answer.
    #[tool(description = "Read the session's answer state (content + ready flag).")]
    pub async fn rlm_get_answer(
        &self,
        Parameters(request): Parameters<GetAnswerRequest>,
    ) -> Result<CallToolResult, McpError> {
        session::get_answer(&self.state, request).await
    }

    /// Create a session.
    #[tool(description = "Create an isolated session (own contexts, variables, history, answer state).")]
    pub async fn rlm_create_session(
        &self,
        Parameters(request): Parameters<CreateSessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        session::create_session(&self.state, request).await
    }

    /// Session info.
    #[tool(description = "Session overview: contexts, variable count, decompositions, history depth, memory estimate.")]
    pub async fn rlm_get_session_info(
        &self,
        Parameters(request): Parameters<GetSessionInfoRequest>,
    ) -> Result<CallToolResult, McpError> {
        session::get_session_info(&self.state, request).await
    }

    /// Clear or destroy a session.
    #[tool(description = "Clear a session's state, or destroy it entirely with destroy=true. The default session is only ever cleared.")]
    pub async fn rlm_clear_session(
        &self,
        Parameters(request): Parameters<ClearSessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        session::clear_session(&self.state, request).await
    }

    /// Metrics snapshot.
    #[tool(description = "Snapshot of counters, gauges, and duration histograms (p50/p90/p95/p99).")]
    pub async fn rlm_get_metrics(
        &self,
        Parameters(_request): Parameters<GetMetricsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let snapshot = self.state.metrics.snapshot(&self.state.registry);
        json_result(&snapshot)
    }
}

#[tool_handler]
impl ServerHandler for RlmService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(catalog::tool_instructions()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}
