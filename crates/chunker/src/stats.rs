//! Structural statistics over a text, shared by the statistics tool and the
//! strategy-suggestion heuristics.

use crate::structure::{detect_structure, StructureKind};
use once_cell::sync::Lazy;
use regex::Regex;
use rlm_protocol::{char_len, LineIndex};
use serde::Serialize;

static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("static pattern compiles"));

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+.+$").expect("static pattern compiles"));

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStatistics {
    /// Length in chars.
    pub length: usize,
    pub line_count: usize,
    pub word_count: usize,
    pub paragraph_count: usize,
    pub sentence_count: usize,
    pub header_count: usize,
    pub avg_line_length: f64,
    pub structure: StructureKind,
}

pub fn compute_statistics(text: &str) -> TextStatistics {
    let length = char_len(text);
    let line_count = LineIndex::new(text).line_count();
    let word_count = text.split_whitespace().count();
    let paragraph_count = text
        .split("\n\n")
        .filter(|part| !part.trim().is_empty())
        .count();
    let sentence_count = SENTENCE_RE.find_iter(text).count();
    let header_count = HEADER_RE.find_iter(text).count();
    let avg_line_length = if line_count > 0 {
        length as f64 / line_count as f64
    } else {
        0.0
    };

    TextStatistics {
        length,
        line_count,
        word_count,
        paragraph_count,
        sentence_count,
        header_count,
        avg_line_length,
        structure: detect_structure(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_basic_shapes() {
        let text = "# Title\n\nOne sentence. Two sentences!\n\nAnother paragraph here.";
        let stats = compute_statistics(text);
        assert_eq!(stats.header_count, 1);
        assert_eq!(stats.paragraph_count, 3);
        assert_eq!(stats.sentence_count, 3);
        assert!(stats.word_count >= 9);
        assert_eq!(stats.length, char_len(text));
    }

    #[test]
    fn empty_text_stats() {
        let stats = compute_statistics("");
        assert_eq!(stats.length, 0);
        assert_eq!(stats.word_count, 0);
        assert_eq!(stats.paragraph_count, 0);
        assert_eq!(stats.structure, StructureKind::PlainText);
    }
}
