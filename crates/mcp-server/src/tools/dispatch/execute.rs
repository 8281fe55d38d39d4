//! Sandboxed code execution. Script failures are part of the payload
//! (`success:false`), never tool-level errors.

use super::{error_result, json_result, ServiceState, ToolTimer};
use crate::metrics::Metrics;
use crate::tools::schemas::execute::{ExecuteCodeRequest, ExecuteCodeResult};
use rlm_session::DEFAULT_SESSION_ID;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use std::sync::Arc;

pub(super) async fn execute_code(
    state: &Arc<ServiceState>,
    request: ExecuteCodeRequest,
) -> Result<CallToolResult, McpError> {
    let timer = ToolTimer::start(state);

    // Resolve (and possibly create) the session up front so the sandbox
    // always runs against a live session.
    if let Err(err) = state.registry.session_or_create(request.session_id.as_deref()) {
        return error_result(state, err);
    }
    let session_key = request
        .session_id
        .clone()
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    let worker_state = state.clone();
    let code = request.code;
    let outcome = tokio::task::spawn_blocking(move || {
        worker_state.engine.execute(&session_key, &code)
    })
    .await
    .map_err(|err| McpError::internal_error(err.to_string(), None))?;

    Metrics::incr(&state.metrics.counters.code_executions);
    if !outcome.record.success {
        Metrics::incr(&state.metrics.counters.code_failures);
    }
    state
        .metrics
        .histograms
        .code_execution_duration_ms
        .record(timer.elapsed_ms());

    let history_len = state
        .registry
        .session(
            request
                .session_id
                .as_deref()
                .unwrap_or(DEFAULT_SESSION_ID),
        )
        .map(|handle| handle.read().history_len())
        .unwrap_or(0);

    json_result(&ExecuteCodeResult {
        success: outcome.record.success,
        output: outcome.record.output,
        error: outcome.record.error,
        result: outcome.result,
        duration_ms: outcome.record.duration_ms,
        history_len,
    })
}
