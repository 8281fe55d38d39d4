//! Literal substring scan. Case-insensitivity is ASCII-level so match
//! offsets always line up with the original text.

use rlm_protocol::LineIndex;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct FindAllOptions {
    pub case_sensitive: bool,
    pub max_matches: usize,
}

impl Default for FindAllOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            max_matches: crate::executor::DEFAULT_MAX_MATCHES,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstringMatch {
    /// Char offset into the text.
    pub offset: usize,
    /// 1-indexed line.
    pub line: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindAllOutcome {
    pub matches: Vec<SubstringMatch>,
    pub truncated: bool,
}

fn byte_hits_case_insensitive(text: &str, needle: &str, cap: usize) -> (Vec<usize>, bool) {
    let hay = text.as_bytes();
    let pat = needle.as_bytes();
    let mut hits = Vec::new();
    if pat.is_empty() || pat.len() > hay.len() {
        return (hits, false);
    }
    let mut i = 0;
    while i + pat.len() <= hay.len() {
        if !text.is_char_boundary(i) {
            i += 1;
            continue;
        }
        if hay[i..i + pat.len()].eq_ignore_ascii_case(pat) {
            if hits.len() >= cap {
                return (hits, true);
            }
            hits.push(i);
            i += pat.len().max(1);
        } else {
            i += 1;
        }
    }
    (hits, false)
}

fn byte_hits_exact(text: &str, needle: &str, cap: usize) -> (Vec<usize>, bool) {
    let mut hits = Vec::new();
    for (idx, _) in text.match_indices(needle) {
        if hits.len() >= cap {
            return (hits, true);
        }
        hits.push(idx);
    }
    (hits, false)
}

pub fn find_all(text: &str, needle: &str, opts: &FindAllOptions) -> FindAllOutcome {
    if needle.is_empty() {
        return FindAllOutcome {
            matches: Vec::new(),
            truncated: false,
        };
    }

    let (byte_hits, truncated) = if opts.case_sensitive {
        byte_hits_exact(text, needle, opts.max_matches)
    } else {
        byte_hits_case_insensitive(text, needle, opts.max_matches)
    };

    let line_index = LineIndex::new(text);
    let mut matches = Vec::with_capacity(byte_hits.len());
    let mut chars_seen = 0usize;
    let mut bytes_seen = 0usize;
    for byte_offset in byte_hits {
        chars_seen += text[bytes_seen..byte_offset].chars().count();
        bytes_seen = byte_offset;
        matches.push(SubstringMatch {
            offset: chars_seen,
            line: line_index.line_for_offset(chars_seen) + 1,
        });
    }

    FindAllOutcome { matches, truncated }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_all_occurrences() {
        let outcome = find_all("abcabcabc", "abc", &FindAllOptions::default());
        let offsets: Vec<usize> = outcome.matches.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
        assert!(!outcome.truncated);
    }

    #[test]
    fn case_insensitive_scan() {
        let opts = FindAllOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let outcome = find_all("Rust rust RUST", "rust", &opts);
        assert_eq!(outcome.matches.len(), 3);
    }

    #[test]
    fn reports_line_numbers() {
        let outcome = find_all("x\ny x\nz", "x", &FindAllOptions::default());
        let lines: Vec<usize> = outcome.matches.iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn empty_needle_matches_nothing() {
        let outcome = find_all("abc", "", &FindAllOptions::default());
        assert!(outcome.matches.is_empty());
    }

    #[test]
    fn respects_match_cap() {
        let text = "a".repeat(100);
        let opts = FindAllOptions {
            max_matches: 5,
            ..Default::default()
        };
        let outcome = find_all(&text, "a", &opts);
        assert_eq!(outcome.matches.len(), 5);
        assert!(outcome.truncated);
    }

    #[test]
    fn offsets_are_char_offsets() {
        let outcome = find_all("ααX", "X", &FindAllOptions::default());
        assert_eq!(outcome.matches[0].offset, 2);
    }
}
