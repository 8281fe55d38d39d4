use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchContextRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Context id to search")]
    pub context_id: String,

    /// Regex pattern; validated against ReDoS-prone shapes before compiling.
    #[schemars(description = "Regex pattern (max 500 chars, ReDoS shapes rejected)")]
    pub pattern: String,

    #[schemars(description = "Case-insensitive matching (default false)")]
    pub case_insensitive: Option<bool>,

    #[schemars(description = "Match cap (default 10000)")]
    pub max_matches: Option<usize>,

    /// Chars of surrounding context on each side (default 80).
    #[schemars(description = "Context window chars on each side of a match (default 80)")]
    pub context_window: Option<usize>,

    /// Compact output omits the context windows.
    #[schemars(description = "Compact output: omit before/after windows (default false)")]
    pub compact: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchContextResult {
    pub context_id: String,
    pub pattern: String,
    pub total_matches: usize,
    pub truncated: bool,
    pub matches: Vec<rlm_search::SearchMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    pub cached: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FindAllRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Context id to scan")]
    pub context_id: String,

    /// Literal substring to scan for.
    #[schemars(description = "Literal substring to scan for")]
    pub query: String,

    #[schemars(description = "Case-sensitive scan (default true)")]
    pub case_sensitive: Option<bool>,

    #[schemars(description = "Match cap (default 10000)")]
    pub max_matches: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindAllResult {
    pub context_id: String,
    pub query: String,
    pub total_matches: usize,
    pub truncated: bool,
    pub matches: Vec<rlm_search::SubstringMatch>,
    pub cached: bool,
}
