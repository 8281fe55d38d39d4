use serde::Serialize;

/// One sandboxed execution, as recorded on the session's bounded history.
/// Failures are materialized here rather than raised through the RPC
/// surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub timestamp: u64,
}

impl ExecutionRecord {
    pub fn success(output: String, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            duration_ms,
            timestamp: rlm_protocol::unix_ms_now(),
        }
    }

    pub fn failure(output: String, error: String, duration_ms: u64) -> Self {
        Self {
            success: false,
            output,
            error: Some(error),
            duration_ms,
            timestamp: rlm_protocol::unix_ms_now(),
        }
    }
}
