//! Pattern admission: reject ReDoS-prone shapes before compilation.
//!
//! The regex engine underneath is linear-time, but the pattern contract is
//! part of the public surface: shapes that are catastrophic on backtracking
//! engines are rejected uniformly so callers cannot come to depend on them.

use crate::error::{Result, SearchError};
use regex::{Regex, RegexBuilder};

pub const MAX_PATTERN_LEN: usize = 500;
const MAX_ALTERNATIONS: usize = 64;
const WARN_ALTERNATIONS: usize = 16;
const WARN_OPTIONAL_GROUPS: usize = 16;

/// Compiled regex size ceiling; oversized automata are rejected as invalid.
const REGEX_SIZE_LIMIT: usize = 1 << 22;

/// Outcome of pattern validation: the pattern is admissible, with optional
/// advisory warnings (high alternation or optional-group counts).
#[derive(Debug, Default, Clone)]
pub struct PatternReport {
    pub warnings: Vec<String>,
}

#[derive(Default)]
struct GroupFrame {
    has_quantifier: bool,
    branches: Vec<String>,
    current_branch: String,
}

impl GroupFrame {
    fn finish_branch(&mut self) {
        let branch = std::mem::take(&mut self.current_branch);
        self.branches.push(branch);
    }

    fn has_duplicate_branches(&self) -> bool {
        for (i, a) in self.branches.iter().enumerate() {
            if a.is_empty() {
                continue;
            }
            if self.branches[i + 1..].iter().any(|b| b == a) {
                return true;
            }
        }
        false
    }
}

fn is_repetition_quantifier(chars: &[char], pos: usize) -> bool {
    match chars.get(pos) {
        Some('+') | Some('*') => true,
        // Brace repetitions count; `?` alone does not (bounded to 0..=1).
        Some('{') => {
            let rest = &chars[pos + 1..];
            let close = rest.iter().position(|&c| c == '}');
            match close {
                Some(end) => rest[..end]
                    .iter()
                    .all(|&c| c.is_ascii_digit() || c == ','),
                None => false,
            }
        }
        _ => false,
    }
}

/// Validate a pattern against the admission rules: length cap, nested
/// quantifiers, ambiguous alternation under repetition, excessive
/// alternation. Returns advisory warnings for high-but-admissible counts.
pub fn validate_pattern(pattern: &str) -> Result<PatternReport> {
    if pattern.is_empty() {
        return Err(SearchError::invalid("pattern must not be empty"));
    }
    let char_count = pattern.chars().count();
    if char_count > MAX_PATTERN_LEN {
        return Err(SearchError::invalid(format!(
            "pattern length {char_count} exceeds {MAX_PATTERN_LEN} chars"
        )));
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut stack: Vec<GroupFrame> = vec![GroupFrame::default()];
    let mut alternations = 0usize;
    let mut optional_groups = 0usize;
    let mut in_class = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '\\' {
            if let Some(frame) = stack.last_mut() {
                frame.current_branch.push(ch);
                if let Some(&next) = chars.get(i + 1) {
                    frame.current_branch.push(next);
                }
            }
            i += 2;
            continue;
        }

        if in_class {
            if ch == ']' {
                in_class = false;
            }
            if let Some(frame) = stack.last_mut() {
                frame.current_branch.push(ch);
            }
            i += 1;
            continue;
        }

        match ch {
            '[' => {
                in_class = true;
                if let Some(frame) = stack.last_mut() {
                    frame.current_branch.push(ch);
                }
            }
            '(' => {
                // Skip group-kind prefixes like `?:`, `?P<name>`, `?i`.
                stack.push(GroupFrame::default());
            }
            ')' => {
                let mut frame = match stack.pop() {
                    Some(frame) => frame,
                    // Unbalanced; leave the final verdict to the compiler.
                    None => break,
                };
                frame.finish_branch();

                let quantified = is_repetition_quantifier(&chars, i + 1);
                if quantified {
                    if frame.has_quantifier {
                        return Err(SearchError::invalid(
                            "nested quantifier: repetition applied to a group that already repeats",
                        ));
                    }
                    if frame.branches.len() > 1 && frame.has_duplicate_branches() {
                        return Err(SearchError::invalid(
                            "ambiguous alternation under repetition",
                        ));
                    }
                }
                if chars.get(i + 1) == Some(&'?') {
                    optional_groups += 1;
                }

                if let Some(parent) = stack.last_mut() {
                    // A quantified group acts as a quantifier for its parent,
                    // and an inner quantifier survives group closure.
                    if quantified || frame.has_quantifier {
                        parent.has_quantifier = true;
                    }
                    parent.current_branch.push('(');
                    parent.current_branch.push_str(&frame.branches.join("|"));
                    parent.current_branch.push(')');
                }
            }
            '|' => {
                alternations += 1;
                if alternations > MAX_ALTERNATIONS {
                    return Err(SearchError::invalid(format!(
                        "excessive alternation: more than {MAX_ALTERNATIONS} branches"
                    )));
                }
                if let Some(frame) = stack.last_mut() {
                    frame.finish_branch();
                }
            }
            '+' | '*' => {
                if let Some(frame) = stack.last_mut() {
                    frame.has_quantifier = true;
                    frame.current_branch.push(ch);
                }
            }
            '{' => {
                if is_repetition_quantifier(&chars, i) {
                    if let Some(frame) = stack.last_mut() {
                        frame.has_quantifier = true;
                    }
                }
                if let Some(frame) = stack.last_mut() {
                    frame.current_branch.push(ch);
                }
            }
            _ => {
                if let Some(frame) = stack.last_mut() {
                    frame.current_branch.push(ch);
                }
            }
        }
        i += 1;
    }

    let mut report = PatternReport::default();
    if alternations > WARN_ALTERNATIONS {
        report
            .warnings
            .push(format!("high alternation count ({alternations})"));
    }
    if optional_groups > WARN_OPTIONAL_GROUPS {
        report
            .warnings
            .push(format!("high optional-group count ({optional_groups})"));
    }
    Ok(report)
}

/// Validate and compile in one step. Every regex the server executes goes
/// through here, inside and outside the sandbox.
pub fn compile_safe(pattern: &str, case_insensitive: bool) -> Result<(Regex, Vec<String>)> {
    let report = validate_pattern(pattern)?;
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|err| SearchError::invalid(err.to_string()))?;
    Ok((regex, report.warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nested_quantifier() {
        assert!(validate_pattern("(a+)+b").is_err());
        assert!(validate_pattern("(a*)*").is_err());
        assert!(validate_pattern("(x*)+").is_err());
        assert!(validate_pattern("((a+)b)+").is_err());
        assert!(validate_pattern("(a+){2,}").is_err());
    }

    #[test]
    fn rejects_duplicate_alternation_under_repetition() {
        assert!(validate_pattern("(a|a)+").is_err());
        assert!(validate_pattern("(ab|ab)*").is_err());
    }

    #[test]
    fn accepts_ordinary_patterns() {
        assert!(validate_pattern("fn\\s+\\w+").is_ok());
        assert!(validate_pattern("(a|b)+").is_ok());
        assert!(validate_pattern("(abc)+def").is_ok());
        assert!(validate_pattern("^#{1,6}\\s+(.+)$").is_ok());
        assert!(validate_pattern("[a+]+").is_ok());
    }

    #[test]
    fn rejects_over_length() {
        let pattern = "a".repeat(MAX_PATTERN_LEN + 1);
        assert!(validate_pattern(&pattern).is_err());
    }

    #[test]
    fn rejects_excessive_alternation() {
        let pattern = vec!["x"; 70].join("|");
        assert!(validate_pattern(&pattern).is_err());
    }

    #[test]
    fn warns_on_high_alternation() {
        let pattern = vec!["x"; 20].join("|");
        let report = validate_pattern(&pattern).expect("admissible");
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn compile_rejects_malformed() {
        assert!(compile_safe("(unclosed", false).is_err());
    }
}
