use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExecuteCodeRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    /// Script evaluated in the sandbox. Curated helpers only; 30s budget;
    /// output captured and capped.
    #[schemars(description = "Script to evaluate in the sandbox")]
    pub code: String,
}

/// Sandbox failures land here with `success:false`; the tool call itself
/// succeeds.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCodeResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub duration_ms: u64,
    pub history_len: usize,
}
