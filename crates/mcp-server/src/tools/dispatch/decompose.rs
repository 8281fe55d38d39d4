//! Decomposition tools and the shared chunk-production path.

use super::{error_result, json_result, ServiceState, ToolTimer};
use crate::metrics::Metrics;
use crate::tools::schemas::decompose::{
    ChunkSummary, DecomposeContextRequest, DecomposeContextResult, GetChunksRequest,
    GetChunksResult, GetStatisticsRequest, GetStatisticsResult, SuggestStrategyRequest,
};
use rlm_chunker::{Chunk, Strategy};
use rlm_protocol::{Result as RlmResult, RlmError};
use rlm_session::{content_hash, decomposition_key, DecompositionRecord};
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use std::sync::Arc;

/// Chunks for `(session, context, strategy)`, via the chunk cache when the
/// content hash still matches. Blocking; callers run it on a worker thread.
pub(super) fn produce_chunks(
    state: &ServiceState,
    session_id: Option<&str>,
    context_id: &str,
    strategy: &Strategy,
) -> RlmResult<(String, Arc<Vec<Chunk>>, String, bool)> {
    let handle = state.registry.session_or_create(session_id)?;
    let (session_key, content) = {
        let session = handle.read();
        let context = session
            .context(context_id)
            .ok_or_else(|| RlmError::context_not_found(context_id))?;
        (session.id.clone(), context.content.clone())
    };

    let hash = content_hash(&content);
    let key = decomposition_key(&session_key, context_id, &strategy.cache_key());
    if let Some(chunks) = state.registry.chunk_cache.get(&key, &hash) {
        Metrics::incr(&state.metrics.counters.cache_hits);
        return Ok((session_key, chunks, hash, true));
    }
    Metrics::incr(&state.metrics.counters.cache_misses);

    let provider = match strategy {
        Strategy::ByTokens { tokenizer, .. } => Some(state.tokenizers.resolve(tokenizer)?),
        _ => None,
    };
    let chunks = rlm_chunker::decompose(
        &content,
        strategy,
        state.config.limits.max_chunks,
        provider.as_ref().map(|p| p.as_ref() as &dyn rlm_chunker::TokenizerProvider),
    )
    .map_err(RlmError::from)?;
    let chunks = Arc::new(chunks);
    state
        .registry
        .chunk_cache
        .insert(key, hash.clone(), chunks.clone());
    Ok((session_key, chunks, hash, false))
}

/// Rehydrate the strategy recorded on a decomposition.
pub(super) fn strategy_from_record(record: &DecompositionRecord) -> RlmResult<Strategy> {
    Strategy::from_options(&record.strategy, &record.options).map_err(RlmError::from)
}

/// Cross-check caller-supplied strategy/options against the resolved
/// record; a mismatch is an input error rather than a silent ignore.
pub(super) fn check_record_match(
    record: &DecompositionRecord,
    strategy: Option<&str>,
    options: Option<&serde_json::Value>,
) -> RlmResult<()> {
    if let Some(name) = strategy {
        if name != record.strategy {
            return Err(RlmError::invalid_input(format!(
                "decomposition '{}' used strategy '{}', not '{name}'",
                record.id, record.strategy
            )));
        }
    }
    if let Some(options) = options {
        let requested = Strategy::from_options(&record.strategy, options)
            .map_err(RlmError::from)?
            .cache_key();
        let recorded = strategy_from_record(record)?.cache_key();
        if requested != recorded {
            return Err(RlmError::invalid_input(format!(
                "options do not match decomposition '{}'",
                record.id
            )));
        }
    }
    Ok(())
}

pub(super) async fn decompose_context(
    state: &Arc<ServiceState>,
    request: DecomposeContextRequest,
) -> Result<CallToolResult, McpError> {
    let timer = ToolTimer::start(state);

    let options = request.options.unwrap_or_else(|| serde_json::json!({}));
    let strategy = match Strategy::from_options(&request.strategy, &options) {
        Ok(strategy) => strategy,
        Err(err) => return error_result(state, RlmError::from(err)),
    };

    let worker_state = state.clone();
    let session_id = request.session_id.clone();
    let context_id = request.context_id.clone();
    let worker_strategy = strategy.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let (_, chunks, _, cached) = produce_chunks(
            &worker_state,
            session_id.as_deref(),
            &context_id,
            &worker_strategy,
        )?;
        let handle = worker_state.registry.session_or_create(session_id.as_deref())?;
        let record = {
            let mut session = handle.write();
            worker_state
                .registry
                .record_decomposition(&mut session, &context_id, &worker_strategy)
        };
        Ok::<_, RlmError>((record, chunks, cached))
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    match outcome {
        Ok((record, chunks, cached)) => {
            state
                .metrics
                .histograms
                .decompose_duration_ms
                .record(timer.elapsed_ms());
            let include_content = request.include_content.unwrap_or(false);
            let summaries: Vec<ChunkSummary> = chunks
                .iter()
                .map(|chunk| ChunkSummary {
                    index: chunk.index,
                    start_offset: chunk.start_offset,
                    end_offset: chunk.end_offset,
                    content: include_content.then(|| chunk.content.clone()),
                    metadata: chunk.metadata.clone(),
                })
                .collect();
            json_result(&DecomposeContextResult {
                decompose_id: record.id,
                context_id: request.context_id,
                strategy: request.strategy,
                chunk_count: chunks.len(),
                chunks: summaries,
                cached,
            })
        }
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn get_chunks(
    state: &Arc<ServiceState>,
    request: GetChunksRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);

    let worker_state = state.clone();
    let session_id = request.session_id.clone();
    let caller_context = request.context_id.clone();
    let decompose_id = request.decompose_id.clone();
    let strategy_check = request.strategy.clone();
    let options_check = request.options.clone();
    let indices = request.indices.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let handle = worker_state
            .registry
            .session_or_create(session_id.as_deref())?;
        let record = {
            let session = handle.read();
            worker_state.registry.resolve_decomposition(
                &session,
                caller_context.as_deref(),
                decompose_id.as_deref(),
            )?
        };
        check_record_match(&record, strategy_check.as_deref(), options_check.as_ref())?;
        let strategy = strategy_from_record(&record)?;
        let (_, chunks, _, _) = produce_chunks(
            &worker_state,
            session_id.as_deref(),
            &record.context_id,
            &strategy,
        )?;

        let selected: Vec<Chunk> = match indices {
            Some(indices) => {
                let mut out = Vec::with_capacity(indices.len());
                for index in indices {
                    let chunk = chunks.get(index).ok_or_else(|| {
                        RlmError::out_of_range(format!(
                            "chunk index {index} is out of range (0..{})",
                            chunks.len()
                        ))
                    })?;
                    out.push(chunk.clone());
                }
                out
            }
            None => chunks.iter().cloned().collect(),
        };
        Ok::<_, RlmError>((record, chunks.len(), selected))
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    match outcome {
        Ok((record, total, selected)) => json_result(&GetChunksResult {
            decompose_id: record.id,
            context_id: record.context_id,
            total_chunks: total,
            chunks: selected,
        }),
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn suggest_strategy(
    state: &Arc<ServiceState>,
    request: SuggestStrategyRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);

    let worker_state = state.clone();
    let session_id = request.session_id.clone();
    let context_id = request.context_id.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let handle = worker_state
            .registry
            .session_or_create(session_id.as_deref())?;
        let content = {
            let session = handle.read();
            session
                .context(&context_id)
                .ok_or_else(|| RlmError::context_not_found(&context_id))?
                .content
                .clone()
        };
        Ok::<_, RlmError>(rlm_chunker::suggest_strategy(&content))
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    match outcome {
        Ok(suggestion) => json_result(&suggestion),
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn get_statistics(
    state: &Arc<ServiceState>,
    request: GetStatisticsRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);

    let worker_state = state.clone();
    let session_id = request.session_id.clone();
    let context_id = request.context_id.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let handle = worker_state
            .registry
            .session_or_create(session_id.as_deref())?;
        let content = {
            let session = handle.read();
            session
                .context(&context_id)
                .ok_or_else(|| RlmError::context_not_found(&context_id))?
                .content
                .clone()
        };
        Ok::<_, RlmError>(rlm_chunker::compute_statistics(&content))
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    match outcome {
        Ok(statistics) => json_result(&GetStatisticsResult {
            context_id: request.context_id,
            statistics,
        }),
        Err(err) => error_result(state, err),
    }
}
