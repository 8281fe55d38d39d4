use serde::Serialize;

/// Immutable record of a prior decomposition, letting later tool calls
/// reproduce a split without re-transmitting parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionRecord {
    pub id: String,
    pub context_id: String,
    pub strategy: String,
    pub options: serde_json::Value,
    pub created_at: u64,
}
