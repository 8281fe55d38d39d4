use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LoadContextRequest {
    /// Target session; omitted means the default session.
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    /// Context id, `[A-Za-z0-9_-]{1,100}`.
    #[schemars(description = "Context id matching [A-Za-z0-9_-]{1,100}")]
    pub context_id: String,

    /// Full text content. May be omitted with `from_storage: true`.
    #[schemars(description = "Text content to load (omit with from_storage=true)")]
    pub content: Option<String>,

    /// Restore the persisted copy instead of passing content inline.
    #[schemars(description = "Restore content from file-backed storage (requires storage enabled)")]
    pub from_storage: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadContextResult {
    pub context_id: String,
    pub metadata: rlm_session::ContextMetadata,
    pub loaded_from_storage: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AppendContextRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Context id")]
    pub context_id: String,

    #[schemars(description = "Content to add")]
    pub content: String,

    /// `append` (default) or `prepend`.
    #[schemars(description = "'append' (default) or 'prepend'")]
    pub mode: Option<String>,

    /// Create the context when missing instead of failing.
    #[schemars(description = "Create the context when missing (default false)")]
    pub create_if_missing: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendContextResult {
    pub context_id: String,
    pub metadata: rlm_session::ContextMetadata,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UnloadContextRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Context id to drop from live memory")]
    pub context_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnloadContextResult {
    pub context_id: String,
    /// True when the content was persisted to storage before dropping.
    pub persisted: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetContextInfoRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Context id")]
    pub context_id: String,

    /// Chars of content preview to include (default 0).
    #[schemars(description = "Chars of content preview to include (default 0)")]
    pub preview_chars: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetContextInfoResult {
    pub context_id: String,
    pub metadata: rlm_session::ContextMetadata,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReadContextRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Context id")]
    pub context_id: String,

    /// Char-offset range (exclusive end). Mutually exclusive with lines.
    #[schemars(description = "Start char offset (with end_char; exclusive of line range)")]
    pub start_char: Option<usize>,
    #[schemars(description = "End char offset, exclusive")]
    pub end_char: Option<usize>,

    /// 1-indexed inclusive line range. Mutually exclusive with chars.
    #[schemars(description = "Start line, 1-indexed (with end_line; exclusive of char range)")]
    pub start_line: Option<usize>,
    #[schemars(description = "End line, 1-indexed inclusive")]
    pub end_line: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadContextResult {
    pub context_id: String,
    pub content: String,
    pub start_offset: usize,
    pub end_offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
}
