//! Session lifecycle, variables, and answer-state tools.

use super::{error_result, json_result, ServiceState, ToolTimer};
use crate::metrics::Metrics;
use crate::tools::schemas::session::{
    ClearSessionRequest, ClearSessionResult, ContextSummary, CreateSessionRequest,
    CreateSessionResult, GetAnswerRequest, GetSessionInfoRequest, GetSessionInfoResult,
    GetVariableRequest, GetVariableResult, SetAnswerRequest, SetVariableRequest,
    SetVariableResult,
};
use rlm_session::{estimate_value, DEFAULT_SESSION_ID};
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use std::sync::Arc;

pub(super) async fn set_variable(
    state: &Arc<ServiceState>,
    request: SetVariableRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);
    let estimated_bytes = estimate_value(&request.value);
    match state
        .registry
        .set_variable(request.session_id.as_deref(), &request.name, request.value)
    {
        Ok(()) => json_result(&SetVariableResult {
            name: request.name,
            estimated_bytes,
        }),
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn get_variable(
    state: &Arc<ServiceState>,
    request: GetVariableRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);
    match state
        .registry
        .get_variable(request.session_id.as_deref(), &request.name)
    {
        Ok(value) => json_result(&GetVariableResult {
            name: request.name,
            found: value.is_some(),
            value,
        }),
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn set_answer(
    state: &Arc<ServiceState>,
    request: SetAnswerRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);
    let handle = match state.registry.session_or_create(request.session_id.as_deref()) {
        Ok(handle) => handle,
        Err(err) => return error_result(state, err),
    };
    let answer = {
        let mut session = handle.write();
        if request.append.unwrap_or(false) {
            session.answer.content.push_str(&request.content);
        } else {
            session.answer.content = request.content;
        }
        if let Some(ready) = request.ready {
            session.answer.ready = ready;
        }
        session.answer.clone()
    };
    json_result(&answer)
}

pub(super) async fn get_answer(
    state: &Arc<ServiceState>,
    request: GetAnswerRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);
    let handle = match state.registry.session_or_create(request.session_id.as_deref()) {
        Ok(handle) => handle,
        Err(err) => return error_result(state, err),
    };
    let answer = handle.read().answer.clone();
    json_result(&answer)
}

pub(super) async fn create_session(
    state: &Arc<ServiceState>,
    _request: CreateSessionRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);
    match state.registry.create_session() {
        Ok(session_id) => {
            Metrics::incr(&state.metrics.counters.sessions_created);
            json_result(&CreateSessionResult { session_id })
        }
        Err(err) => error_result(state, err),
    }
}

pub(super) async fn get_session_info(
    state: &Arc<ServiceState>,
    request: GetSessionInfoRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);
    // Explicit unknown ids are an error; the bare call reads the default
    // session.
    let session_key = request.session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID);
    let handle = match state.registry.session(session_key) {
        Ok(handle) => handle,
        Err(err) => return error_result(state, err),
    };

    let session = handle.read();
    let mut contexts: Vec<ContextSummary> = session
        .contexts()
        .map(|(id, context)| ContextSummary {
            context_id: id.clone(),
            length: context.metadata.length,
            structure: context.metadata.structure,
        })
        .collect();
    contexts.sort_by(|a, b| a.context_id.cmp(&b.context_id));

    let payload = GetSessionInfoResult {
        session_id: session.id.clone(),
        created_at: rlm_protocol::unix_ms(session.created_at),
        last_activity: rlm_protocol::unix_ms(session.last_activity),
        context_count: session.context_count(),
        contexts,
        variable_count: session.variable_count(),
        decomposition_count: session.decomposition_count(),
        history_len: session.history_len(),
        memory_bytes: session.memory_bytes(),
        answer_ready: session.answer.ready,
    };
    drop(session);
    json_result(&payload)
}

pub(super) async fn clear_session(
    state: &Arc<ServiceState>,
    request: ClearSessionRequest,
) -> Result<CallToolResult, McpError> {
    let _timer = ToolTimer::start(state);
    let session_key = request
        .session_id
        .clone()
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
    let destroy = request.destroy.unwrap_or(false);

    let outcome = if destroy {
        state.registry.destroy_session(&session_key)
    } else {
        state.registry.clear_session(&session_key)
    };
    match outcome {
        Ok(()) => json_result(&ClearSessionResult {
            destroyed: destroy && session_key != DEFAULT_SESSION_ID,
            session_id: session_key,
        }),
        Err(err) => error_result(state, err),
    }
}
