use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DecomposeContextRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Context id to decompose")]
    pub context_id: String,

    /// One of: fixed_size, by_lines, by_paragraphs, by_sections, by_regex,
    /// by_sentences, by_tokens.
    #[schemars(
        description = "Strategy: fixed_size | by_lines | by_paragraphs | by_sections | by_regex | by_sentences | by_tokens"
    )]
    pub strategy: String,

    /// Strategy option bag (camelCase keys, e.g. chunkSize, overlap).
    #[schemars(description = "Strategy options (e.g. {\"chunkSize\": 1000, \"overlap\": 0})")]
    pub options: Option<serde_json::Value>,

    /// Include chunk content in the response (default false: offsets only).
    #[schemars(description = "Include chunk content in the response (default false)")]
    pub include_content: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkSummary {
    pub index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<rlm_chunker::ChunkMetadata>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecomposeContextResult {
    pub decompose_id: String,
    pub context_id: String,
    pub strategy: String,
    pub chunk_count: usize,
    pub chunks: Vec<ChunkSummary>,
    /// True when the chunks came from the decomposition cache.
    pub cached: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetChunksRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    /// Context id; `main` disables the ownership check on decompose_id.
    #[schemars(description = "Context id ('main' skips the decompose_id ownership check)")]
    pub context_id: Option<String>,

    /// Prior decomposition to resolve; omitted means the last decomposition.
    #[schemars(description = "Decomposition id from a prior rlm_decompose_context call")]
    pub decompose_id: Option<String>,

    /// Chunk indices to fetch; omitted means all chunks.
    #[schemars(description = "Chunk indices to fetch (default: all)")]
    pub indices: Option<Vec<usize>>,

    /// Optional strategy cross-check against the resolved record.
    #[schemars(description = "If set with decompose_id, must match the recorded strategy")]
    pub strategy: Option<String>,

    /// Optional options cross-check against the resolved record.
    #[schemars(description = "If set with decompose_id, must match the recorded options")]
    pub options: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetChunksResult {
    pub decompose_id: String,
    pub context_id: String,
    pub total_chunks: usize,
    pub chunks: Vec<rlm_chunker::Chunk>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SuggestStrategyRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Context id to analyze")]
    pub context_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetStatisticsRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    #[schemars(description = "Context id to analyze")]
    pub context_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStatisticsResult {
    pub context_id: String,
    #[serde(flatten)]
    pub statistics: rlm_chunker::TextStatistics,
}
