//! Budgeted regex execution over a single text.
//!
//! The pattern is admitted through [`crate::redos`] first. Execution carries
//! a wall-clock budget (checked between matches; the underlying engine is
//! linear-time per scan) and a match cap. Match offsets are character
//! offsets; line numbers come from a binary search over the line-start
//! table.

use crate::error::{Result, SearchError};
use crate::redos::compile_safe;
use rlm_protocol::LineIndex;
use serde::Serialize;
use std::time::{Duration, Instant};

pub const DEFAULT_BUDGET_MS: u64 = 1_000;
pub const DEFAULT_MAX_MATCHES: usize = 10_000;
pub const DEFAULT_CONTEXT_WINDOW: usize = 80;

#[derive(Debug, Clone)]
pub struct RegexSearchOptions {
    pub case_insensitive: bool,
    pub max_matches: usize,
    pub budget: Duration,
    /// Chars of surrounding context captured on each side of a match.
    pub context_window: usize,
    /// Compact mode omits the context windows to shrink responses.
    pub compact: bool,
}

impl Default for RegexSearchOptions {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            max_matches: DEFAULT_MAX_MATCHES,
            budget: Duration::from_millis(DEFAULT_BUDGET_MS),
            context_window: DEFAULT_CONTEXT_WINDOW,
            compact: false,
        }
    }
}

/// One regex hit. `offset` is a char offset into the text; `line` is
/// 1-indexed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub offset: usize,
    pub line: usize,
    #[serde(rename = "match")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub groups: Vec<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Result of a regex search, including any pattern-admission warnings.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub matches: Vec<SearchMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    pub truncated: bool,
}

fn tail_chars(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let mut chars: Vec<char> = Vec::with_capacity(n);
    for ch in text.chars().rev().take(n) {
        chars.push(ch);
    }
    chars.iter().rev().collect()
}

fn head_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

pub fn regex_search(text: &str, pattern: &str, opts: &RegexSearchOptions) -> Result<SearchOutcome> {
    let (regex, warnings) = compile_safe(pattern, opts.case_insensitive)?;
    let line_index = LineIndex::new(text);
    let start = Instant::now();
    let budget_ms = opts.budget.as_millis() as u64;

    let mut matches = Vec::new();
    let mut truncated = false;

    // Matches arrive in increasing byte order, so the byte-to-char mapping
    // is a single forward walk.
    let mut chars_seen = 0usize;
    let mut bytes_seen = 0usize;

    for caps in regex.captures_iter(text) {
        if start.elapsed() > opts.budget {
            return Err(SearchError::Timeout { budget_ms });
        }
        if matches.len() >= opts.max_matches {
            truncated = true;
            break;
        }

        let whole = caps.get(0).expect("group 0 always present");
        chars_seen += text[bytes_seen..whole.start()].chars().count();
        bytes_seen = whole.start();
        let offset = chars_seen;

        let groups = if caps.len() > 1 {
            (1..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect()
        } else {
            Vec::new()
        };

        let (before, after) = if opts.compact || opts.context_window == 0 {
            (None, None)
        } else {
            (
                Some(tail_chars(&text[..whole.start()], opts.context_window)),
                Some(head_chars(&text[whole.end()..], opts.context_window)),
            )
        };

        matches.push(SearchMatch {
            offset,
            line: line_index.line_for_offset(offset) + 1,
            text: whole.as_str().to_string(),
            groups,
            before,
            after,
        });
    }

    Ok(SearchOutcome {
        matches,
        warnings,
        truncated,
    })
}
