use serde::{Deserialize, Serialize};

/// A slice of a context with stable offsets and per-strategy metadata.
///
/// Offsets are character offsets into the **original** text and satisfy
/// `0 <= start_offset <= end_offset <= len`. Within one decomposition,
/// indices run `0..N-1` in generation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChunkMetadata>,
}

impl Chunk {
    /// Length of the covered span in chars.
    pub fn span_len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }
}

/// Strategy-specific chunk metadata. Fields are populated per strategy;
/// absent fields are omitted from the wire form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Chunk kind tag: `paragraph`, `section`, `preamble`, `single`,
    /// `sentence`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// 1-indexed line range (line-based strategies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,

    /// Header level and title (section strategy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Categorization hints such as `section`, `level-2`.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,

    /// Token range (token strategy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_end: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
}

impl ChunkMetadata {
    pub fn kind(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    pub fn lines(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line: Some(start_line),
            end_line: Some(end_line),
            line_count: Some(end_line.saturating_sub(start_line) + 1),
            ..Default::default()
        }
    }

    pub fn section(level: u8, title: impl Into<String>) -> Self {
        Self {
            kind: Some("section".to_string()),
            level: Some(level),
            title: Some(title.into()),
            tags: vec!["section".to_string(), format!("level-{level}")],
            ..Default::default()
        }
    }

    pub fn tokens(token_start: usize, token_end: usize) -> Self {
        Self {
            token_start: Some(token_start),
            token_end: Some(token_end),
            token_count: Some(token_end.saturating_sub(token_start)),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_len_is_saturating() {
        let chunk = Chunk {
            index: 0,
            start_offset: 3,
            end_offset: 7,
            content: "abcd".into(),
            metadata: None,
        };
        assert_eq!(chunk.span_len(), 4);
    }

    #[test]
    fn section_metadata_carries_level_tags() {
        let meta = ChunkMetadata::section(2, "Usage");
        assert_eq!(meta.kind.as_deref(), Some("section"));
        assert_eq!(meta.level, Some(2));
        assert!(meta.tags.iter().any(|t| t == "level-2"));
    }

    #[test]
    fn metadata_serializes_sparsely() {
        let meta = ChunkMetadata::lines(1, 3);
        let value = serde_json::to_value(&meta).expect("serialize");
        assert_eq!(value["startLine"], 1);
        assert_eq!(value["lineCount"], 3);
        assert!(value.get("title").is_none());
        assert!(value.get("tags").is_none());
    }
}
