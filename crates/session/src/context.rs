use rlm_chunker::{detect_structure, StructureKind};
use rlm_protocol::{char_len, LineIndex};
use serde::Serialize;
use std::sync::Arc;
use std::time::SystemTime;

/// Metadata derived once per load/append.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    /// Length in chars.
    pub length: usize,
    pub line_count: usize,
    pub word_count: usize,
    pub structure: StructureKind,
}

impl ContextMetadata {
    pub fn derive(content: &str) -> Self {
        Self {
            length: char_len(content),
            line_count: LineIndex::new(content).line_count(),
            word_count: content.split_whitespace().count(),
            structure: detect_structure(content),
        }
    }
}

/// A named text owned by a session. Content is immutable; append/prepend
/// build a replacement `Context` that preserves the creation timestamp.
#[derive(Debug, Clone)]
pub struct Context {
    pub content: Arc<str>,
    pub metadata: ContextMetadata,
    pub created_at: SystemTime,
}

impl Context {
    pub fn new(content: String) -> Self {
        let metadata = ContextMetadata::derive(&content);
        Self {
            content: content.into(),
            metadata,
            created_at: SystemTime::now(),
        }
    }

    /// Replacement with new content and freshly derived metadata; the
    /// creation timestamp carries over.
    pub fn replaced(&self, content: String) -> Self {
        let metadata = ContextMetadata::derive(&content);
        Self {
            content: content.into(),
            metadata,
            created_at: self.created_at,
        }
    }

    /// Estimated memory for admission accounting.
    pub fn estimated_bytes(&self) -> usize {
        crate::memory::estimate_string(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_derived_from_content() {
        let context = Context::new("# Title\n\nline two".to_string());
        assert_eq!(context.metadata.length, 17);
        assert_eq!(context.metadata.line_count, 3);
        assert_eq!(context.metadata.word_count, 4);
        assert_eq!(context.metadata.structure, StructureKind::Markdown);
    }

    #[test]
    fn replacement_preserves_created_at() {
        let context = Context::new("before".to_string());
        let replaced = context.replaced("before and after".to_string());
        assert_eq!(replaced.created_at, context.created_at);
        assert_eq!(replaced.metadata.word_count, 3);
    }

    #[test]
    fn idempotent_metadata_for_same_content() {
        let a = Context::new("same text".to_string());
        let b = Context::new("same text".to_string());
        assert_eq!(a.metadata, b.metadata);
    }
}
