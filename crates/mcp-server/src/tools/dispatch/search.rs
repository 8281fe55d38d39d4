//! Regex search and substring scan over a context, memoized in the query
//! cache keyed by `(session, context, kind, options, content-hash)`.

use super::{error_result, json_result, ServiceState, ToolTimer};
use crate::metrics::Metrics;
use crate::tools::schemas::search::{
    FindAllRequest, FindAllResult, SearchContextRequest, SearchContextResult,
};
use rlm_protocol::RlmError;
use rlm_session::{content_hash, query_key};
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use std::sync::Arc;

/// Pull a cached payload and re-mark it as a cache hit.
fn cached_payload(value: &serde_json::Value) -> serde_json::Value {
    let mut hit = value.clone();
    if let Some(object) = hit.as_object_mut() {
        object.insert("cached".to_string(), serde_json::Value::Bool(true));
    }
    hit
}

pub(super) async fn search_context(
    state: &Arc<ServiceState>,
    request: SearchContextRequest,
) -> Result<CallToolResult, McpError> {
    let timer = ToolTimer::start(state);

    let worker_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let handle = worker_state
            .registry
            .session_or_create(request.session_id.as_deref())?;
        let (session_key, content) = {
            let session = handle.read();
            let context = session
                .context(&request.context_id)
                .ok_or_else(|| RlmError::context_not_found(&request.context_id))?;
            (session.id.clone(), context.content.clone())
        };

        let options = rlm_search::RegexSearchOptions {
            case_insensitive: request.case_insensitive.unwrap_or(false),
            max_matches: request
                .max_matches
                .unwrap_or(rlm_search::DEFAULT_MAX_MATCHES),
            budget: worker_state.config.regex_budget,
            context_window: request
                .context_window
                .unwrap_or(rlm_search::DEFAULT_CONTEXT_WINDOW),
            compact: request.compact.unwrap_or(false),
        };

        let hash = content_hash(&content);
        let options_digest = format!(
            "{}|ci={}|max={}|win={}|compact={}",
            request.pattern,
            options.case_insensitive,
            options.max_matches,
            options.context_window,
            options.compact
        );
        let key = query_key(&session_key, &request.context_id, "search", &options_digest);
        if let Some(payload) = worker_state.registry.query_cache.get(&key, &hash) {
            Metrics::incr(&worker_state.metrics.counters.cache_hits);
            return Ok(cached_payload(&payload));
        }
        Metrics::incr(&worker_state.metrics.counters.cache_misses);

        let outcome = rlm_search::regex_search(&content, &request.pattern, &options)
            .map_err(RlmError::from)?;
        let total = outcome.matches.len();
        let result = SearchContextResult {
            context_id: request.context_id.clone(),
            pattern: request.pattern.clone(),
            total_matches: total,
            truncated: outcome.truncated,
            matches: outcome.matches,
            warnings: outcome.warnings,
            cached: false,
        };
        let payload = serde_json::to_value(&result)
            .map_err(|err| RlmError::internal(err.to_string()))?;
        worker_state
            .registry
            .query_cache
            .insert(key, hash, Arc::new(payload.clone()));
        Ok::<_, RlmError>(payload)
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    match outcome {
        Ok(payload) => {
            Metrics::incr(&state.metrics.counters.searches);
            state
                .metrics
                .histograms
                .search_duration_ms
                .record(timer.elapsed_ms());
            json_result(&payload)
        }
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn find_all(
    state: &Arc<ServiceState>,
    request: FindAllRequest,
) -> Result<CallToolResult, McpError> {
    let timer = ToolTimer::start(state);

    let worker_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let handle = worker_state
            .registry
            .session_or_create(request.session_id.as_deref())?;
        let (session_key, content) = {
            let session = handle.read();
            let context = session
                .context(&request.context_id)
                .ok_or_else(|| RlmError::context_not_found(&request.context_id))?;
            (session.id.clone(), context.content.clone())
        };

        let options = rlm_search::FindAllOptions {
            case_sensitive: request.case_sensitive.unwrap_or(true),
            max_matches: request
                .max_matches
                .unwrap_or(rlm_search::DEFAULT_MAX_MATCHES),
        };

        let hash = content_hash(&content);
        let options_digest = format!(
            "{}|cs={}|max={}",
            request.query, options.case_sensitive, options.max_matches
        );
        let key = query_key(&session_key, &request.context_id, "find_all", &options_digest);
        if let Some(payload) = worker_state.registry.query_cache.get(&key, &hash) {
            Metrics::incr(&worker_state.metrics.counters.cache_hits);
            return Ok(cached_payload(&payload));
        }
        Metrics::incr(&worker_state.metrics.counters.cache_misses);

        let outcome = rlm_search::find_all(&content, &request.query, &options);
        let result = FindAllResult {
            context_id: request.context_id.clone(),
            query: request.query.clone(),
            total_matches: outcome.matches.len(),
            truncated: outcome.truncated,
            matches: outcome.matches,
            cached: false,
        };
        let payload = serde_json::to_value(&result)
            .map_err(|err| RlmError::internal(err.to_string()))?;
        worker_state
            .registry
            .query_cache
            .insert(key, hash, Arc::new(payload.clone()));
        Ok::<_, RlmError>(payload)
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    match outcome {
        Ok(payload) => {
            Metrics::incr(&state.metrics.counters.searches);
            state
                .metrics
                .histograms
                .search_duration_ms
                .record(timer.elapsed_ms());
            json_result(&payload)
        }
        Err(err) => error_result(state, err),
    }
}
