//! Content-structure detection.
//!
//! Runs once per load/append and is deterministic for a given input. Rules
//! are ordered with short-circuit semantics: JSON, XML, and CSV are decided
//! first; the line-signal families (markdown, code, log) are then scanned
//! together so that strongly mixed content can be tagged as such.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structure tag derived at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    PlainText,
    Json,
    Csv,
    Code,
    Markdown,
    Xml,
    Log,
    Mixed,
}

impl StructureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureKind::PlainText => "plain_text",
            StructureKind::Json => "json",
            StructureKind::Csv => "csv",
            StructureKind::Code => "code",
            StructureKind::Markdown => "markdown",
            StructureKind::Xml => "xml",
            StructureKind::Log => "log",
            StructureKind::Mixed => "mixed",
        }
    }
}

/// Lines scanned for the signal families.
const SIGNAL_SCAN_LINES: usize = 100;
/// Lines checked for CSV comma regularity.
const CSV_SCAN_LINES: usize = 10;
/// A family needs this many signal lines to count as "strong" when
/// deciding between a single tag and `mixed`.
const STRONG_SIGNAL_LINES: usize = 3;

static LOG_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}").expect("static pattern compiles")
});

static MD_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*[-*+]\s+|\s*\d+\.\s+)").expect("static pattern compiles"));

static CODE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(fn|pub|impl|use|let|const|static|mod|struct|enum|trait|def|class|function|import|export|return|package|var|if|for|while|#include)\b",
    )
    .expect("static pattern compiles")
});

fn looks_like_json(trimmed: &str) -> bool {
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return false;
    }
    serde_json::from_str::<serde::de::IgnoredAny>(trimmed).is_ok()
}

fn looks_like_xml(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    if chars.next() != Some('<') {
        return false;
    }
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '?' || c == '!' || c == '/')
}

fn looks_like_csv(text: &str) -> bool {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(CSV_SCAN_LINES)
        .collect();
    if lines.len() < 2 {
        return false;
    }
    let first_commas = lines[0].matches(',').count();
    first_commas >= 1 && lines.iter().all(|l| l.matches(',').count() == first_commas)
}

fn is_markdown_header(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes)
        && line
            .chars()
            .nth(hashes)
            .map(|c| c == ' ' || c == '\t')
            .unwrap_or(false)
}

pub fn detect_structure(text: &str) -> StructureKind {
    let trimmed = text.trim_start();
    if looks_like_json(text.trim()) {
        return StructureKind::Json;
    }
    if looks_like_xml(trimmed) {
        return StructureKind::Xml;
    }
    if looks_like_csv(text) {
        return StructureKind::Csv;
    }

    let mut markdown = 0usize;
    let mut code = 0usize;
    let mut log = 0usize;
    for line in text.lines().take(SIGNAL_SCAN_LINES) {
        if is_markdown_header(line) || MD_LIST_RE.is_match(line) {
            markdown += 1;
        }
        if CODE_LINE_RE.is_match(line) {
            code += 1;
        }
        if LOG_LINE_RE.is_match(line) {
            log += 1;
        }
    }

    let strong = [markdown, code, log]
        .iter()
        .filter(|&&count| count >= STRONG_SIGNAL_LINES)
        .count();
    if strong >= 2 {
        return StructureKind::Mixed;
    }
    if markdown > 0 {
        return StructureKind::Markdown;
    }
    if code > 0 {
        return StructureKind::Code;
    }
    if log > 0 {
        return StructureKind::Log;
    }
    StructureKind::PlainText
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_json() {
        assert_eq!(detect_structure(r#"{"a": [1, 2]}"#), StructureKind::Json);
        assert_eq!(detect_structure("[1, 2, 3]"), StructureKind::Json);
        // Parse failure falls through.
        assert_ne!(detect_structure("{not json"), StructureKind::Json);
    }

    #[test]
    fn detects_xml() {
        assert_eq!(
            detect_structure("<?xml version=\"1.0\"?><root/>"),
            StructureKind::Xml
        );
        assert_eq!(detect_structure("<html><body/></html>"), StructureKind::Xml);
    }

    #[test]
    fn detects_csv_by_comma_regularity() {
        assert_eq!(
            detect_structure("a,b,c\n1,2,3\n4,5,6"),
            StructureKind::Csv
        );
        assert_ne!(detect_structure("a,b\n1,2,3"), StructureKind::Csv);
    }

    #[test]
    fn detects_markdown() {
        assert_eq!(
            detect_structure("# Title\n\nSome prose here.\n\n- item"),
            StructureKind::Markdown
        );
    }

    #[test]
    fn detects_code() {
        assert_eq!(
            detect_structure("fn main() {\n    let x = 1;\n}"),
            StructureKind::Code
        );
    }

    #[test]
    fn detects_log_lines() {
        let text = "2024-03-01T10:00:00 start\n2024-03-01T10:00:01 ready";
        assert_eq!(detect_structure(text), StructureKind::Log);
    }

    #[test]
    fn heavy_mixture_is_mixed() {
        let mut lines = Vec::new();
        for i in 0..4 {
            lines.push(format!("# Heading {i}"));
            lines.push(format!("let value_{i} = {i};"));
        }
        assert_eq!(detect_structure(&lines.join("\n")), StructureKind::Mixed);
    }

    #[test]
    fn plain_text_is_the_default() {
        assert_eq!(
            detect_structure("Just a plain sentence without markers."),
            StructureKind::PlainText
        );
        assert_eq!(detect_structure(""), StructureKind::PlainText);
    }

    #[test]
    fn detection_is_deterministic() {
        let text = "# A\ncontent";
        assert_eq!(detect_structure(text), detect_structure(text));
    }
}
