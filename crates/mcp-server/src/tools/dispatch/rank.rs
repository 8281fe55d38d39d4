//! BM25 ranking over a decomposition, with lazy index construction and a
//! memoized ranked response.

use super::decompose::{produce_chunks, strategy_from_record};
use super::{error_result, json_result, ServiceState, ToolTimer};
use crate::metrics::Metrics;
use crate::tools::schemas::rank::{RankChunksRequest, RankChunksResult, RankedChunk};
use rlm_protocol::{char_len, char_slice, RlmError};
use rlm_ranker::{InvertedIndex, TokenizerMode};
use rlm_session::{content_hash, decomposition_key, query_key};
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use std::sync::Arc;

const DEFAULT_TOP_K: usize = 10;
const DEFAULT_PREVIEW_CHARS: usize = 160;

fn parse_tokenizer(raw: Option<&str>) -> Result<TokenizerMode, RlmError> {
    match raw {
        None | Some("auto") => Ok(TokenizerMode::Auto),
        Some("unicode") => Ok(TokenizerMode::Unicode),
        Some("cjk_bigram") => Ok(TokenizerMode::CjkBigram),
        Some(other) => Err(RlmError::invalid_input(format!(
            "tokenizer must be auto | unicode | cjk_bigram, got '{other}'"
        ))),
    }
}

pub(super) async fn rank_chunks(
    state: &Arc<ServiceState>,
    request: RankChunksRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);

    let mode = match parse_tokenizer(request.tokenizer.as_deref()) {
        Ok(mode) => mode,
        Err(err) => return error_result(state, err),
    };

    let worker_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let handle = worker_state
            .registry
            .session_or_create(request.session_id.as_deref())?;
        let (session_key, record) = {
            let session = handle.read();
            let record = worker_state.registry.resolve_decomposition(
                &session,
                request.context_id.as_deref(),
                request.decompose_id.as_deref(),
            )?;
            (session.id.clone(), record)
        };
        let strategy = strategy_from_record(&record)?;

        let content = {
            let session = handle.read();
            session
                .context(&record.context_id)
                .ok_or_else(|| RlmError::context_not_found(&record.context_id))?
                .content
                .clone()
        };
        let hash = content_hash(&content);

        let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);
        let preview_chars = request.preview_chars.unwrap_or(DEFAULT_PREVIEW_CHARS);
        let options_digest = format!(
            "{}|q={}|k={}|min={}|tok={}",
            strategy.cache_key(),
            request.query,
            top_k,
            request
                .min_score
                .map(|v| v.to_string())
                .unwrap_or_default(),
            mode.as_str(),
        );
        let cache_key = query_key(&session_key, &record.context_id, "rank", &options_digest);
        if let Some(payload) = worker_state.registry.query_cache.get(&cache_key, &hash) {
            Metrics::incr(&worker_state.metrics.counters.cache_hits);
            let mut hit = (*payload).clone();
            if let Some(object) = hit.as_object_mut() {
                object.insert("cached".to_string(), serde_json::Value::Bool(true));
            }
            return Ok(hit);
        }
        Metrics::incr(&worker_state.metrics.counters.cache_misses);

        let (_, chunks, _, _) = produce_chunks(
            &worker_state,
            request.session_id.as_deref(),
            &record.context_id,
            &strategy,
        )?;

        let index_key = decomposition_key(
            &session_key,
            &record.context_id,
            &format!("{}#index#{}", strategy.cache_key(), mode.as_str()),
        );
        let index = match worker_state.registry.index_cache.get(&index_key, &hash) {
            Some(index) => {
                Metrics::incr(&worker_state.metrics.counters.index_hits);
                index
            }
            None => {
                Metrics::incr(&worker_state.metrics.counters.index_builds);
                let built = Arc::new(InvertedIndex::build(
                    chunks.iter().map(|c| c.content.as_str()),
                    mode,
                ));
                worker_state
                    .registry
                    .index_cache
                    .insert(index_key, hash.clone(), built.clone());
                built
            }
        };

        let scored = rlm_ranker::rank(&index, &request.query, top_k, request.min_score);
        let results: Vec<RankedChunk> = scored
            .iter()
            .filter_map(|doc| chunks.get(doc.doc_id as usize).map(|chunk| (doc, chunk)))
            .map(|(doc, chunk)| RankedChunk {
                index: chunk.index,
                score: doc.score,
                start_offset: chunk.start_offset,
                end_offset: chunk.end_offset,
                preview: if char_len(&chunk.content) > preview_chars {
                    char_slice(&chunk.content, 0, preview_chars).to_string()
                } else {
                    chunk.content.clone()
                },
            })
            .collect();

        let result = RankChunksResult {
            decompose_id: record.id.clone(),
            context_id: record.context_id.clone(),
            query: request.query.clone(),
            total_chunks: chunks.len(),
            results,
            cached: false,
        };
        let payload = serde_json::to_value(&result)
            .map_err(|err| RlmError::internal(err.to_string()))?;
        worker_state
            .registry
            .query_cache
            .insert(cache_key, hash, Arc::new(payload.clone()));
        Ok::<_, RlmError>(payload)
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    match outcome {
        Ok(payload) => json_result(&payload),
        Err(err) => error_result(state, err),
    }
}
