use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SetVariableRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    /// `[A-Za-z_][A-Za-z0-9_]*`, max 100 chars.
    #[schemars(description = "Variable name matching [A-Za-z_][A-Za-z0-9_]*")]
    pub name: String,

    #[schemars(description = "JSON value to store")]
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableResult {
    pub name: String,
    pub estimated_bytes: usize,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetVariableRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Variable name")]
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVariableResult {
    pub name: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SetAnswerRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Answer content (replaces unless append=true)")]
    pub content: String,

    #[schemars(description = "Mark the answer ready (default false)")]
    pub ready: Option<bool>,

    #[schemars(description = "Append to the existing answer instead of replacing")]
    pub append: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetAnswerRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateSessionRequest {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResult {
    pub session_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetSessionInfoRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    pub context_id: String,
    pub length: usize,
    pub structure: rlm_chunker::StructureKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSessionInfoResult {
    pub session_id: String,
    pub created_at: u64,
    pub last_activity: u64,
    pub context_count: usize,
    pub contexts: Vec<ContextSummary>,
    pub variable_count: usize,
    pub decomposition_count: usize,
    pub history_len: usize,
    pub memory_bytes: usize,
    pub answer_ready: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClearSessionRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    /// Destroy the session entirely instead of clearing its state. The
    /// default session is always cleared, never destroyed.
    #[schemars(description = "Destroy the session instead of clearing it (default false)")]
    pub destroy: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearSessionResult {
    pub session_id: String,
    pub destroyed: bool,
}
