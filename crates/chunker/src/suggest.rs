//! Heuristic strategy recommendation.
//!
//! Thresholds are tunable constants; every recommendation reports the
//! signals it was computed from so callers can observe the inputs.

use crate::stats::{compute_statistics, TextStatistics};
use crate::structure::StructureKind;
use serde::Serialize;
use serde_json::json;

pub const HEADER_RICH_THRESHOLD: usize = 3;
pub const PARAGRAPH_RICH_THRESHOLD: usize = 10;
pub const LONG_TEXT_THRESHOLD: usize = 50_000;
pub const SENTENCE_RICH_THRESHOLD: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySuggestion {
    pub recommended: String,
    /// Suggested option bag for the recommended strategy.
    pub options: serde_json::Value,
    pub reason: String,
    pub alternatives: Vec<String>,
    /// The observed signals the recommendation was derived from.
    pub signals: serde_json::Value,
}

pub fn suggest_strategy(text: &str) -> StrategySuggestion {
    let stats = compute_statistics(text);
    let (recommended, options, reason, alternatives) = pick(&stats);
    StrategySuggestion {
        recommended: recommended.to_string(),
        options,
        reason: reason.to_string(),
        alternatives: alternatives.into_iter().map(String::from).collect(),
        signals: json!({
            "length": stats.length,
            "lineCount": stats.line_count,
            "paragraphCount": stats.paragraph_count,
            "sentenceCount": stats.sentence_count,
            "headerCount": stats.header_count,
            "structure": stats.structure,
            "thresholds": {
                "headerRich": HEADER_RICH_THRESHOLD,
                "paragraphRich": PARAGRAPH_RICH_THRESHOLD,
                "longText": LONG_TEXT_THRESHOLD,
                "sentenceRich": SENTENCE_RICH_THRESHOLD,
            },
        }),
    }
}

fn pick(
    stats: &TextStatistics,
) -> (
    &'static str,
    serde_json::Value,
    &'static str,
    Vec<&'static str>,
) {
    if stats.structure == StructureKind::Markdown || stats.header_count > HEADER_RICH_THRESHOLD {
        return (
            "by_sections",
            json!({}),
            "markdown headers present",
            vec!["by_paragraphs", "fixed_size"],
        );
    }
    if matches!(stats.structure, StructureKind::Log | StructureKind::Csv) {
        return (
            "by_lines",
            json!({"linesPerChunk": 100}),
            "line-oriented content",
            vec!["fixed_size"],
        );
    }
    if stats.paragraph_count > PARAGRAPH_RICH_THRESHOLD {
        return (
            "by_paragraphs",
            json!({}),
            "paragraph-rich prose",
            vec!["by_sentences", "fixed_size"],
        );
    }
    if stats.length > LONG_TEXT_THRESHOLD {
        return (
            "fixed_size",
            json!({"chunkSize": 2000, "overlap": 200}),
            "long unstructured text",
            vec!["by_tokens", "by_lines"],
        );
    }
    if stats.sentence_count > SENTENCE_RICH_THRESHOLD {
        return (
            "by_sentences",
            json!({}),
            "short sentence-dense text",
            vec!["by_paragraphs"],
        );
    }
    (
        "fixed_size",
        json!({"chunkSize": 1000, "overlap": 0}),
        "no dominant structure",
        vec!["by_lines"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_prefers_sections() {
        let text = "# A\nbody\n## B\nmore\n# C\nend\n# D\nfin\n";
        let suggestion = suggest_strategy(text);
        assert_eq!(suggestion.recommended, "by_sections");
        assert_eq!(suggestion.signals["thresholds"]["headerRich"], 3);
    }

    #[test]
    fn paragraph_rich_prose_prefers_paragraphs() {
        let text = (0..12)
            .map(|i| format!("Paragraph number {i} with words"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let suggestion = suggest_strategy(&text);
        assert_eq!(suggestion.recommended, "by_paragraphs");
    }

    #[test]
    fn long_text_prefers_fixed_size() {
        let text = "word ".repeat(15_000);
        let suggestion = suggest_strategy(&text);
        assert_eq!(suggestion.recommended, "fixed_size");
        assert_eq!(suggestion.options["chunkSize"], 2000);
    }

    #[test]
    fn signals_expose_observed_counts() {
        let suggestion = suggest_strategy("One. Two. Three.");
        assert!(suggestion.signals["sentenceCount"].as_u64().expect("count") >= 3);
    }
}
