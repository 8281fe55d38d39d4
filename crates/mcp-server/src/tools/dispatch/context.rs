//! Context lifecycle tools: load, append, unload, info, ranged read.

use super::{error_result, json_result, ServiceState, ToolTimer};
use crate::metrics::Metrics;
use crate::tools::schemas::context::{
    AppendContextRequest, AppendContextResult, GetContextInfoRequest, GetContextInfoResult,
    LoadContextRequest, LoadContextResult, ReadContextRequest, ReadContextResult,
    UnloadContextRequest, UnloadContextResult,
};
use rlm_protocol::{char_len, char_slice, LineIndex, RlmError};
use rlm_session::{AppendMode, DEFAULT_SESSION_ID};
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use std::sync::Arc;

fn resolved_session_id(session_id: &Option<String>) -> String {
    session_id
        .clone()
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}

pub(super) async fn load_context(
    state: &Arc<ServiceState>,
    request: LoadContextRequest,
) -> Result<CallToolResult, McpError> {
    let timer = ToolTimer::start(state);
    let session_key = resolved_session_id(&request.session_id);

    let (content, from_storage) = match request.content {
        Some(content) => (content, false),
        None if request.from_storage.unwrap_or(false) => {
            let Some(store) = state.storage.as_ref() else {
                return error_result(
                    state,
                    RlmError::invalid_input("from_storage requires file-backed storage"),
                );
            };
            match store.load(&session_key, &request.context_id) {
                Ok(Some(stored)) => (stored.content, true),
                Ok(None) => {
                    return error_result(
                        state,
                        RlmError::context_not_found(&request.context_id),
                    )
                }
                Err(err) => return error_result(state, err),
            }
        }
        None => return error_result(state, RlmError::missing_field("content")),
    };

    let worker_state = state.clone();
    let context_id = request.context_id.clone();
    let session_id = request.session_id.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let persist_copy = worker_state.storage.as_ref().map(|_| content.clone());
        let metadata =
            worker_state
                .registry
                .load_context(session_id.as_deref(), &context_id, content)?;
        if let (Some(store), Some(body)) = (worker_state.storage.as_ref(), persist_copy) {
            let session_key = session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID);
            if let Err(err) = store.save(
                session_key,
                &context_id,
                &body,
                &metadata,
                std::time::SystemTime::now(),
            ) {
                log::warn!("persisting {session_key}/{context_id} failed: {err}");
            }
        }
        Ok::<_, RlmError>(metadata)
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    match outcome {
        Ok(metadata) => {
            Metrics::incr(&state.metrics.counters.contexts_loaded);
            state
                .metrics
                .histograms
                .load_context_duration_ms
                .record(timer.elapsed_ms());
            json_result(&LoadContextResult {
                context_id: request.context_id,
                metadata,
                loaded_from_storage: from_storage,
            })
        }
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn append_context(
    state: &Arc<ServiceState>,
    request: AppendContextRequest,
) -> Result<CallToolResult, McpError> {
    let timer = ToolTimer::start(state);

    let mode = match request.mode.as_deref() {
        None | Some("append") => AppendMode::Append,
        Some("prepend") => AppendMode::Prepend,
        Some(other) => {
            return error_result(
                state,
                RlmError::invalid_input(format!("mode must be 'append' or 'prepend', got '{other}'")),
            )
        }
    };

    let worker_state = state.clone();
    let session_id = request.session_id.clone();
    let context_id = request.context_id.clone();
    let content = request.content;
    let create_if_missing = request.create_if_missing.unwrap_or(false);
    let outcome = tokio::task::spawn_blocking(move || {
        worker_state.registry.append_context(
            session_id.as_deref(),
            &context_id,
            &content,
            mode,
            create_if_missing,
        )
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    match outcome {
        Ok(metadata) => {
            Metrics::incr(&state.metrics.counters.contexts_appended);
            state
                .metrics
                .histograms
                .append_context_duration_ms
                .record(timer.elapsed_ms());
            json_result(&AppendContextResult {
                context_id: request.context_id,
                metadata,
            })
        }
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn unload_context(
    state: &Arc<ServiceState>,
    request: UnloadContextRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);
    let session_key = resolved_session_id(&request.session_id);

    match state
        .registry
        .unload_context(request.session_id.as_deref(), &request.context_id)
    {
        Ok(removed) => {
            let mut persisted = false;
            if let Some(store) = state.storage.as_ref() {
                match store.save(
                    &session_key,
                    &request.context_id,
                    &removed.content,
                    &removed.metadata,
                    removed.created_at,
                ) {
                    Ok(()) => persisted = true,
                    Err(err) => log::warn!(
                        "persisting {session_key}/{} on unload failed: {err}",
                        request.context_id
                    ),
                }
            }
            Metrics::incr(&state.metrics.counters.contexts_unloaded);
            json_result(&UnloadContextResult {
                context_id: request.context_id,
                persisted,
            })
        }
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn get_context_info(
    state: &Arc<ServiceState>,
    request: GetContextInfoRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);

    let handle = match state.registry.session_or_create(request.session_id.as_deref()) {
        Ok(handle) => handle,
        Err(err) => return error_result(state, err),
    };
    let session = handle.read();
    let Some(context) = session.context(&request.context_id) else {
        drop(session);
        return error_result(state, RlmError::context_not_found(&request.context_id));
    };

    let preview_chars = request.preview_chars.unwrap_or(0);
    let preview = if preview_chars > 0 {
        Some(char_slice(&context.content, 0, preview_chars).to_string())
    } else {
        None
    };
    let payload = GetContextInfoResult {
        context_id: request.context_id.clone(),
        metadata: context.metadata,
        created_at: rlm_protocol::unix_ms(context.created_at),
        preview,
    };
    drop(session);
    json_result(&payload)
}

pub(super) async fn read_context(
    state: &Arc<ServiceState>,
    request: ReadContextRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);

    let by_chars = request.start_char.is_some() || request.end_char.is_some();
    let by_lines = request.start_line.is_some() || request.end_line.is_some();
    if by_chars && by_lines {
        return error_result(
            state,
            RlmError::invalid_input("specify a char range or a line range, not both"),
        );
    }

    let handle = match state.registry.session_or_create(request.session_id.as_deref()) {
        Ok(handle) => handle,
        Err(err) => return error_result(state, err),
    };
    let content = {
        let session = handle.read();
        let Some(context) = session.context(&request.context_id) else {
            return error_result(state, RlmError::context_not_found(&request.context_id));
        };
        context.content.clone()
    };

    let len = char_len(&content);
    let (start, end, line_range) = if by_lines {
        let index = LineIndex::new(&content);
        let line_count = index.line_count();
        let start_line = request.start_line.unwrap_or(1);
        let end_line = request.end_line.unwrap_or(line_count).min(line_count);
        if start_line == 0 || end_line < start_line {
            return error_result(
                state,
                RlmError::out_of_range(format!(
                    "line range {start_line}..{end_line} is invalid (1..{line_count})"
                )),
            );
        }
        if start_line > line_count {
            return error_result(
                state,
                RlmError::out_of_range(format!(
                    "start_line {start_line} is past the last line {line_count}"
                )),
            );
        }
        let start = index.line_start(start_line - 1).unwrap_or(0);
        let end = index.line_end(end_line - 1).unwrap_or(len);
        (start, end, Some((start_line, end_line)))
    } else {
        let start = request.start_char.unwrap_or(0).min(len);
        let end = request.end_char.unwrap_or(len).min(len);
        if end < start {
            return error_result(
                state,
                RlmError::out_of_range(format!("char range {start}..{end} is inverted")),
            );
        }
        (start, end, None)
    };

    json_result(&ReadContextResult {
        context_id: request.context_id,
        content: char_slice(&content, start, end).to_string(),
        start_offset: start,
        end_offset: end,
        start_line: line_range.map(|(s, _)| s),
        end_line: line_range.map(|(_, e)| e),
    })
}
