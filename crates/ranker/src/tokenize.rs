//! Index-side tokenization.
//!
//! The default tokenizer lowercases maximal runs of Unicode letters and
//! digits. For CJK text an alternate tokenizer produces overlapping
//! character bigrams; `auto` picks bigrams when the text is predominantly
//! CJK.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerMode {
    #[default]
    Auto,
    Unicode,
    CjkBigram,
}

impl TokenizerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenizerMode::Auto => "auto",
            TokenizerMode::Unicode => "unicode",
            TokenizerMode::CjkBigram => "cjk_bigram",
        }
    }
}

/// CJK unified ideographs plus kana and Hangul syllables.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}'
    )
}

/// Sampled CJK-dominance check used by `auto` mode.
pub fn is_predominantly_cjk(text: &str) -> bool {
    const SAMPLE_CHARS: usize = 2_000;
    let mut cjk = 0usize;
    let mut other = 0usize;
    for c in text.chars().take(SAMPLE_CHARS) {
        if c.is_whitespace() {
            continue;
        }
        if is_cjk(c) {
            cjk += 1;
        } else {
            other += 1;
        }
    }
    cjk > 0 && cjk >= other
}

fn unicode_terms(text: &str, out: &mut Vec<String>) {
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
}

fn cjk_bigram_terms(text: &str, out: &mut Vec<String>) {
    let mut run: Vec<char> = Vec::new();
    let mut latin = String::new();

    let mut flush_run = |run: &mut Vec<char>, out: &mut Vec<String>| {
        match run.len() {
            0 => {}
            1 => out.push(run[0].to_string()),
            _ => {
                for pair in run.windows(2) {
                    out.push(pair.iter().collect());
                }
            }
        }
        run.clear();
    };

    for c in text.chars() {
        if is_cjk(c) {
            if !latin.is_empty() {
                out.push(std::mem::take(&mut latin));
            }
            run.push(c);
        } else {
            flush_run(&mut run, out);
            if c.is_alphanumeric() {
                latin.extend(c.to_lowercase());
            } else if !latin.is_empty() {
                out.push(std::mem::take(&mut latin));
            }
        }
    }
    flush_run(&mut run, out);
    if !latin.is_empty() {
        out.push(latin);
    }
}

/// Resolve `auto` against a concrete text sample.
pub fn resolve_mode(mode: TokenizerMode, sample: &str) -> TokenizerMode {
    match mode {
        TokenizerMode::Auto => {
            if is_predominantly_cjk(sample) {
                TokenizerMode::CjkBigram
            } else {
                TokenizerMode::Unicode
            }
        }
        other => other,
    }
}

/// Tokenize with a resolved (non-auto) mode.
pub fn tokenize(text: &str, mode: TokenizerMode) -> Vec<String> {
    let mut out = Vec::new();
    match mode {
        TokenizerMode::CjkBigram => cjk_bigram_terms(text, &mut out),
        _ => unicode_terms(text, &mut out),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_terms_are_lowercased_runs() {
        assert_eq!(
            tokenize("The Cat-sat, on 2 mats!", TokenizerMode::Unicode),
            vec!["the", "cat", "sat", "on", "2", "mats"]
        );
    }

    #[test]
    fn unicode_covers_letter_and_digit_categories() {
        assert_eq!(
            tokenize("Grüße αβγ 42", TokenizerMode::Unicode),
            vec!["grüße", "αβγ", "42"]
        );
    }

    #[test]
    fn cjk_bigrams_overlap() {
        assert_eq!(
            tokenize("中文分词", TokenizerMode::CjkBigram),
            vec!["中文", "文分", "分词"]
        );
    }

    #[test]
    fn cjk_mode_keeps_latin_terms() {
        assert_eq!(
            tokenize("用Rust写", TokenizerMode::CjkBigram),
            vec!["用", "rust", "写"]
        );
    }

    #[test]
    fn auto_resolves_by_dominance() {
        assert_eq!(
            resolve_mode(TokenizerMode::Auto, "中文内容为主"),
            TokenizerMode::CjkBigram
        );
        assert_eq!(
            resolve_mode(TokenizerMode::Auto, "mostly english text"),
            TokenizerMode::Unicode
        );
        assert_eq!(
            resolve_mode(TokenizerMode::Unicode, "中文"),
            TokenizerMode::Unicode
        );
    }
}
