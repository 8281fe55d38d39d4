use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RankChunksRequest {
    #[schemars(description = "Session id (defaults to the 'default' session)")]
    pub session_id: Option<String>,

    /// Context id; resolves the context's last decomposition when no
    /// decompose_id is given.
    #[schemars(description = "Context id ('main' skips the decompose_id ownership check)")]
    pub context_id: Option<String>,

    #[schemars(description = "Decomposition id from a prior rlm_decompose_context call")]
    pub decompose_id: Option<String>,

    #[schemars(description = "Query text scored with BM25 (k1=1.5, b=0.75)")]
    pub query: String,

    #[schemars(description = "Number of top results to return (default 10)")]
    pub top_k: Option<usize>,

    /// Results scoring below this are dropped (in addition to score <= 0).
    #[schemars(description = "Minimum score threshold")]
    pub min_score: Option<f64>,

    /// Index tokenizer: auto (default), unicode, or cjk_bigram.
    #[schemars(description = "Index tokenizer: auto | unicode | cjk_bigram (default auto)")]
    pub tokenizer: Option<String>,

    /// Chars of chunk preview per result (default 160).
    #[schemars(description = "Chars of chunk preview per result (default 160)")]
    pub preview_chars: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedChunk {
    pub index: usize,
    pub score: f64,
    pub start_offset: usize,
    pub end_offset: usize,
    pub preview: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankChunksResult {
    pub decompose_id: String,
    pub context_id: String,
    pub query: String,
    pub total_chunks: usize,
    pub results: Vec<RankedChunk>,
    pub cached: bool,
}
