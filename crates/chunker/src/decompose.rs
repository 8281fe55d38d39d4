//! The seven decomposition strategies.
//!
//! All offsets are character offsets into the original text. Contiguous
//! strategies (`fixed_size`, `by_lines`, `by_tokens`) tile `[0, len)`;
//! strategies that drop whitespace (`by_paragraphs`, `by_sentences`,
//! `by_regex`) keep original offsets for the parts they emit. Every
//! strategy shares the emit pipeline and its chunk-count guard.

use crate::error::{ChunkerError, Result};
use crate::strategy::Strategy;
use crate::tokenizer::TokenizerProvider;
use crate::types::{Chunk, ChunkMetadata};
use once_cell::sync::Lazy;
use regex::Regex;
use rlm_protocol::{char_len, LineIndex};
use std::collections::HashMap;

/// Ceiling on chunks produced by a single decomposition.
pub const DEFAULT_MAX_CHUNKS: usize = 10_000;

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.+)$").expect("static pattern compiles"));

static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+\s*").expect("static pattern compiles"));

struct ChunkEmitter {
    chunks: Vec<Chunk>,
    max_chunks: usize,
}

impl ChunkEmitter {
    fn new(max_chunks: usize) -> Self {
        Self {
            chunks: Vec::new(),
            max_chunks,
        }
    }

    fn emit(
        &mut self,
        start_offset: usize,
        end_offset: usize,
        content: String,
        metadata: Option<ChunkMetadata>,
    ) -> Result<()> {
        if self.chunks.len() >= self.max_chunks {
            return Err(ChunkerError::ChunkLimitExceeded {
                limit: self.max_chunks,
            });
        }
        debug_assert!(start_offset <= end_offset);
        self.chunks.push(Chunk {
            index: self.chunks.len(),
            start_offset,
            end_offset,
            content,
            metadata,
        });
        Ok(())
    }

    fn finish(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// Map sorted char positions to byte offsets in one pass. Positions at or
/// past the end of the text map to `text.len()`.
fn resolve_byte_offsets(text: &str, sorted_positions: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(sorted_positions.len());
    let mut cursor = 0;
    for (seen, (byte_idx, _)) in text.char_indices().enumerate() {
        while cursor < sorted_positions.len() && sorted_positions[cursor] == seen {
            out.push(byte_idx);
            cursor += 1;
        }
    }
    while cursor < sorted_positions.len() {
        out.push(text.len());
        cursor += 1;
    }
    out
}

/// Decompose `text` under `strategy`. `tokenizer` is consulted only by the
/// token strategy.
pub fn decompose(
    text: &str,
    strategy: &Strategy,
    max_chunks: usize,
    tokenizer: Option<&dyn TokenizerProvider>,
) -> Result<Vec<Chunk>> {
    let mut emitter = ChunkEmitter::new(max_chunks);
    match strategy {
        Strategy::FixedSize {
            chunk_size,
            overlap,
        } => fixed_size(text, *chunk_size, *overlap, &mut emitter)?,
        Strategy::ByLines {
            lines_per_chunk,
            overlap,
        } => by_lines(text, *lines_per_chunk, *overlap, &mut emitter)?,
        Strategy::ByParagraphs => by_paragraphs(text, &mut emitter)?,
        Strategy::BySections {
            merge_empty_sections,
            min_section_length,
        } => by_sections(text, *merge_empty_sections, *min_section_length, &mut emitter)?,
        Strategy::ByRegex { pattern } => by_regex(text, pattern, &mut emitter)?,
        Strategy::BySentences => by_sentences(text, &mut emitter)?,
        Strategy::ByTokens {
            tokens_per_chunk,
            token_overlap,
            ..
        } => by_tokens(text, *tokens_per_chunk, *token_overlap, tokenizer, &mut emitter)?,
    }
    Ok(emitter.finish())
}

fn fixed_size(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    emitter: &mut ChunkEmitter,
) -> Result<()> {
    let len = char_len(text);
    if len == 0 {
        return Ok(());
    }
    // Step positivity is enforced at option parse time.
    let step = chunk_size - overlap;

    let mut positions = Vec::new();
    let mut start = 0;
    while start < len {
        positions.push(start);
        positions.push((start + chunk_size).min(len));
        start += step;
    }
    positions.sort_unstable();
    positions.dedup();
    let bytes = resolve_byte_offsets(text, &positions);
    let lookup: HashMap<usize, usize> = positions.into_iter().zip(bytes).collect();

    let mut start = 0;
    while start < len {
        let end = (start + chunk_size).min(len);
        let content = text[lookup[&start]..lookup[&end]].to_string();
        emitter.emit(start, end, content, None)?;
        start += step;
    }
    Ok(())
}

fn by_lines(
    text: &str,
    lines_per_chunk: usize,
    overlap: usize,
    emitter: &mut ChunkEmitter,
) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let index = LineIndex::new(text);
    let total = index.line_count();
    let step = lines_per_chunk.saturating_sub(overlap).max(1);

    let mut start_line = 0;
    while start_line < total {
        let end_line = (start_line + lines_per_chunk - 1).min(total - 1);
        let start = index.line_start(start_line).expect("line in range");
        let end = index.line_end(end_line).expect("line in range");
        let byte_start = index.line_byte_start(start_line).expect("line in range");
        let byte_end = index.line_byte_end(end_line).expect("line in range");
        emitter.emit(
            start,
            end,
            text[byte_start..byte_end].to_string(),
            Some(ChunkMetadata::lines(start_line + 1, end_line + 1)),
        )?;
        start_line += step;
    }
    Ok(())
}

/// Emit a part of the original text trimmed of surrounding whitespace,
/// keeping offsets pointed into the original.
fn emit_trimmed(
    emitter: &mut ChunkEmitter,
    text: &str,
    char_start: usize,
    byte_start: usize,
    byte_end: usize,
    metadata: Option<ChunkMetadata>,
) -> Result<()> {
    let raw = &text[byte_start..byte_end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    let lead_bytes = raw.len() - raw.trim_start().len();
    let lead_chars = raw[..lead_bytes].chars().count();
    let start = char_start + lead_chars;
    emitter.emit(start, start + char_len(trimmed), trimmed.to_string(), metadata)
}

fn by_paragraphs(text: &str, emitter: &mut ChunkEmitter) -> Result<()> {
    // Segments are separated by runs of two or more newlines.
    let mut segments: Vec<(usize, usize, usize)> = Vec::new(); // (char_start, byte_start, byte_end)
    let mut seg_start: Option<(usize, usize)> = None;
    let mut newline_run = 0usize;
    let mut run_start_byte = 0usize;

    for (seen, (byte_idx, ch)) in text.char_indices().enumerate() {
        if ch == '\n' {
            if newline_run == 0 {
                run_start_byte = byte_idx;
            }
            newline_run += 1;
        } else {
            if newline_run >= 2 {
                if let Some((cs, bs)) = seg_start.take() {
                    segments.push((cs, bs, run_start_byte));
                }
            }
            if seg_start.is_none() {
                seg_start = Some((seen, byte_idx));
            }
            newline_run = 0;
        }
    }
    if let Some((cs, bs)) = seg_start {
        segments.push((cs, bs, text.len()));
    }

    for (char_start, byte_start, byte_end) in segments {
        emit_trimmed(
            emitter,
            text,
            char_start,
            byte_start,
            byte_end,
            Some(ChunkMetadata::kind("paragraph")),
        )?;
    }
    Ok(())
}

struct SectionPart {
    char_start: usize,
    byte_start: usize,
    byte_end: usize,
    metadata: ChunkMetadata,
}

fn by_sections(
    text: &str,
    merge_empty_sections: bool,
    min_section_length: usize,
    emitter: &mut ChunkEmitter,
) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }

    let headers: Vec<(usize, u8, String)> = HEADER_RE
        .captures_iter(text)
        .map(|caps| {
            let whole = caps.get(0).expect("group 0");
            let level = caps.get(1).expect("hashes").as_str().len() as u8;
            let title = caps.get(2).expect("title").as_str().trim().to_string();
            (whole.start(), level, title)
        })
        .collect();

    if headers.is_empty() {
        emitter.emit(
            0,
            char_len(text),
            text.to_string(),
            Some(ChunkMetadata::kind("single")),
        )?;
        return Ok(());
    }

    // Preamble before the first header.
    if headers[0].0 > 0 {
        let mut meta = ChunkMetadata::kind("preamble");
        meta.tags = vec!["preamble".to_string()];
        emit_trimmed(emitter, text, 0, 0, headers[0].0, Some(meta))?;
    }

    let mut chars_seen = 0usize;
    let mut bytes_seen = 0usize;
    let mut parts: Vec<SectionPart> = Vec::new();
    for (i, (byte_start, level, title)) in headers.iter().enumerate() {
        chars_seen += text[bytes_seen..*byte_start].chars().count();
        bytes_seen = *byte_start;
        let byte_end = headers
            .get(i + 1)
            .map(|(next, _, _)| *next)
            .unwrap_or(text.len());
        parts.push(SectionPart {
            char_start: chars_seen,
            byte_start: *byte_start,
            byte_end,
            metadata: ChunkMetadata::section(*level, title.clone()),
        });
    }

    if merge_empty_sections || min_section_length > 0 {
        parts = merge_sections(text, parts, merge_empty_sections, min_section_length);
    }

    for part in parts {
        let content = text[part.byte_start..part.byte_end].trim_end();
        if content.is_empty() {
            continue;
        }
        emitter.emit(
            part.char_start,
            part.char_start + char_len(content),
            content.to_string(),
            Some(part.metadata),
        )?;
    }
    Ok(())
}

/// Coalesce a section into its predecessor when its body is empty
/// (`merge_empty_sections`) or its content is below `min_section_length`.
fn merge_sections(
    text: &str,
    parts: Vec<SectionPart>,
    merge_empty_sections: bool,
    min_section_length: usize,
) -> Vec<SectionPart> {
    let mut merged: Vec<SectionPart> = Vec::with_capacity(parts.len());
    for part in parts {
        let content = text[part.byte_start..part.byte_end].trim_end();
        let body_empty = content
            .split_once('\n')
            .map(|(_, body)| body.trim().is_empty())
            .unwrap_or(true);
        let too_short = min_section_length > 0 && char_len(content) < min_section_length;
        let absorb = (merge_empty_sections && body_empty) || too_short;

        match merged.last_mut() {
            Some(prev) if absorb => {
                prev.byte_end = part.byte_end;
            }
            _ => merged.push(part),
        }
    }
    merged
}

fn by_regex(text: &str, pattern: &str, emitter: &mut ChunkEmitter) -> Result<()> {
    let (regex, _warnings) = rlm_search::compile_safe(pattern, false)?;

    let mut parts: Vec<(usize, usize)> = Vec::new();
    let mut last = 0usize;
    for sep in regex.find_iter(text) {
        if sep.start() > last {
            parts.push((last, sep.start()));
        }
        last = sep.end();
    }
    if last < text.len() {
        parts.push((last, text.len()));
    }

    let mut chars_seen = 0usize;
    let mut bytes_seen = 0usize;
    for (byte_start, byte_end) in parts {
        chars_seen += text[bytes_seen..byte_start].chars().count();
        bytes_seen = byte_start;
        emit_trimmed(emitter, text, chars_seen, byte_start, byte_end, None)?;
    }
    Ok(())
}

fn by_sentences(text: &str, emitter: &mut ChunkEmitter) -> Result<()> {
    let mut chars_seen = 0usize;
    let mut bytes_seen = 0usize;
    let mut matched = false;
    for m in SENTENCE_RE.find_iter(text) {
        matched = true;
        chars_seen += text[bytes_seen..m.start()].chars().count();
        bytes_seen = m.start();
        emit_trimmed(
            emitter,
            text,
            chars_seen,
            m.start(),
            m.end(),
            Some(ChunkMetadata::kind("sentence")),
        )?;
    }
    if !matched && !text.is_empty() {
        emitter.emit(
            0,
            char_len(text),
            text.to_string(),
            Some(ChunkMetadata::kind("sentence")),
        )?;
    }
    Ok(())
}

fn by_tokens(
    text: &str,
    tokens_per_chunk: usize,
    token_overlap: usize,
    tokenizer: Option<&dyn TokenizerProvider>,
    emitter: &mut ChunkEmitter,
) -> Result<()> {
    let provider = tokenizer.ok_or_else(|| {
        ChunkerError::TokenizerUnavailable("no tokenizer provider configured".to_string())
    })?;
    let tokens = provider.encode(text)?;
    if tokens.is_empty() {
        return Ok(());
    }
    // Step positivity is enforced at option parse time.
    let step = tokens_per_chunk - token_overlap;

    let mut start_token = 0usize;
    while start_token < tokens.len() {
        let end_token = (start_token + tokens_per_chunk).min(tokens.len());
        let content = provider.decode(&tokens[start_token..end_token])?;
        let start_offset = if start_token == 0 {
            0
        } else {
            char_len(&provider.decode(&tokens[..start_token])?)
        };
        let end_offset = start_offset + char_len(&content);
        emitter.emit(
            start_offset,
            end_offset,
            content,
            Some(ChunkMetadata::tokens(start_token, end_token)),
        )?;
        start_token += step;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::TokenizerSelector;
    use serde_json::json;

    fn run(text: &str, name: &str, options: serde_json::Value) -> Vec<Chunk> {
        let strategy = Strategy::from_options(name, &options).expect("strategy parses");
        decompose(text, &strategy, DEFAULT_MAX_CHUNKS, None).expect("decompose succeeds")
    }

    #[test]
    fn fixed_size_offsets_with_overlap() {
        let chunks = run("abcdefghij", "fixed_size", json!({"chunkSize": 4, "overlap": 1}));
        let got: Vec<(usize, usize, &str)> = chunks
            .iter()
            .map(|c| (c.start_offset, c.end_offset, c.content.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![(0, 4, "abcd"), (3, 7, "defg"), (6, 10, "ghij"), (9, 10, "j")]
        );
        assert_eq!(chunks.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn fixed_size_tiles_without_overlap() {
        let text = "aaaabbbbcc";
        let chunks = run(text, "fixed_size", json!({"chunkSize": 4}));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[2].end_offset, 10);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_offset, pair[1].start_offset);
        }
    }

    #[test]
    fn fixed_size_handles_multibyte_boundaries() {
        let chunks = run("αβγδε", "fixed_size", json!({"chunkSize": 2}));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "αβ");
        assert_eq!(chunks[2].content, "ε");
        assert_eq!(chunks[2].start_offset, 4);
        assert_eq!(chunks[2].end_offset, 5);
    }

    #[test]
    fn by_lines_joins_without_trailing_newline() {
        let text = "l1\nl2\nl3\nl4\n";
        let chunks = run(text, "by_lines", json!({"linesPerChunk": 2}));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "l1\nl2");
        assert_eq!(chunks[1].content, "l3\nl4");
        let meta = chunks[1].metadata.as_ref().expect("metadata");
        assert_eq!(meta.start_line, Some(3));
        assert_eq!(meta.end_line, Some(4));
        assert_eq!(meta.line_count, Some(2));
    }

    #[test]
    fn by_lines_overlap_steps_back() {
        let text = "a\nb\nc\nd\ne";
        let chunks = run(text, "by_lines", json!({"linesPerChunk": 3, "overlap": 1}));
        let starts: Vec<usize> = chunks
            .iter()
            .map(|c| c.metadata.as_ref().expect("metadata").start_line.expect("line"))
            .collect();
        assert_eq!(starts, vec![1, 3, 5]);
    }

    #[test]
    fn paragraphs_keep_original_offsets() {
        let text = "  first para\n\n\nsecond para  \n\nthird";
        let chunks = run(text, "by_paragraphs", json!({}));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "first para");
        assert_eq!(chunks[0].start_offset, 2);
        assert_eq!(chunks[0].end_offset, 12);
        assert_eq!(chunks[1].content, "second para");
        assert_eq!(chunks[1].start_offset, 15);
        for chunk in &chunks {
            let meta = chunk.metadata.as_ref().expect("metadata");
            assert_eq!(meta.kind.as_deref(), Some("paragraph"));
        }
    }

    #[test]
    fn sections_split_on_headers() {
        let text = "intro\n# A\na1\n# B\nb1";
        let chunks = run(text, "by_sections", json!({}));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "intro");
        assert_eq!(chunks[1].content, "# A\na1");
        assert_eq!(chunks[2].content, "# B\nb1");
        let a = chunks[1].metadata.as_ref().expect("metadata");
        assert_eq!(a.level, Some(1));
        assert_eq!(a.title.as_deref(), Some("A"));
        assert_eq!(a.kind.as_deref(), Some("section"));
        let b = chunks[2].metadata.as_ref().expect("metadata");
        assert_eq!(b.title.as_deref(), Some("B"));
    }

    #[test]
    fn sections_without_headers_emit_single() {
        let chunks = run("no headers here", "by_sections", json!({}));
        assert_eq!(chunks.len(), 1);
        let meta = chunks[0].metadata.as_ref().expect("metadata");
        assert_eq!(meta.kind.as_deref(), Some("single"));
        assert_eq!(chunks[0].end_offset, 15);
    }

    #[test]
    fn sections_merge_empty_into_previous() {
        let text = "# A\nbody\n# B\n# C\nmore";
        let chunks = run(text, "by_sections", json!({"mergeEmptySections": true}));
        // B has no body and folds into A.
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].content.contains("# B"));
        let meta = chunks[0].metadata.as_ref().expect("metadata");
        assert_eq!(meta.title.as_deref(), Some("A"));
    }

    #[test]
    fn regex_split_preserves_offsets() {
        let text = "one;;two;;three";
        let chunks = run(text, "by_regex", json!({"pattern": ";;"}));
        let got: Vec<(usize, &str)> = chunks
            .iter()
            .map(|c| (c.start_offset, c.content.as_str()))
            .collect();
        assert_eq!(got, vec![(0, "one"), (5, "two"), (10, "three")]);
    }

    #[test]
    fn regex_strategy_rejects_redos_pattern() {
        let strategy = Strategy::from_options("by_regex", &json!({"pattern": "(a+)+b"}))
            .expect("parse succeeds; validation happens at decompose time");
        let err = decompose("aaa", &strategy, DEFAULT_MAX_CHUNKS, None).unwrap_err();
        assert!(matches!(err, ChunkerError::Pattern(_)));
    }

    #[test]
    fn sentences_split_on_terminators() {
        let text = "First one. Second two!  Third three?";
        let chunks = run(text, "by_sentences", json!({}));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "First one.");
        assert_eq!(chunks[1].content, "Second two!");
        assert_eq!(chunks[1].start_offset, 11);
        assert_eq!(chunks[2].content, "Third three?");
    }

    #[test]
    fn sentences_without_terminator_emit_single() {
        let chunks = run("no punctuation here", "by_sentences", json!({}));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "no punctuation here");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        for (name, options) in [
            ("fixed_size", json!({"chunkSize": 4})),
            ("by_lines", json!({})),
            ("by_paragraphs", json!({})),
            ("by_sections", json!({})),
            ("by_sentences", json!({})),
        ] {
            assert!(run("", name, options).is_empty(), "strategy {name}");
        }
    }

    #[test]
    fn chunk_limit_is_enforced() {
        let text = "a".repeat(100);
        let strategy = Strategy::from_options("fixed_size", &json!({"chunkSize": 1}))
            .expect("parse");
        let err = decompose(&text, &strategy, 10, None).unwrap_err();
        assert!(matches!(err, ChunkerError::ChunkLimitExceeded { limit: 10 }));
    }

    /// One token per char; decode is the identity on the covered chars.
    struct CharTokenizer;

    impl TokenizerProvider for CharTokenizer {
        fn encode(&self, text: &str) -> Result<Vec<usize>> {
            Ok(text.chars().map(|c| c as usize).collect())
        }

        fn decode(&self, tokens: &[usize]) -> Result<String> {
            tokens
                .iter()
                .map(|&t| {
                    char::from_u32(t as u32)
                        .ok_or_else(|| ChunkerError::TokenizerFailed("bad token".into()))
                })
                .collect()
        }
    }

    #[test]
    fn by_tokens_reconstructs_char_offsets() {
        let strategy = Strategy::ByTokens {
            tokens_per_chunk: 4,
            token_overlap: 0,
            tokenizer: TokenizerSelector::default(),
        };
        let chunks =
            decompose("abcdefghij", &strategy, DEFAULT_MAX_CHUNKS, Some(&CharTokenizer))
                .expect("decompose succeeds");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "abcd");
        assert_eq!(chunks[1].start_offset, 4);
        assert_eq!(chunks[2].end_offset, 10);
        let meta = chunks[1].metadata.as_ref().expect("metadata");
        assert_eq!(meta.token_start, Some(4));
        assert_eq!(meta.token_end, Some(8));
        assert_eq!(meta.token_count, Some(4));
    }

    #[test]
    fn by_tokens_requires_provider() {
        let strategy = Strategy::ByTokens {
            tokens_per_chunk: 4,
            token_overlap: 0,
            tokenizer: TokenizerSelector::default(),
        };
        let err = decompose("text", &strategy, DEFAULT_MAX_CHUNKS, None).unwrap_err();
        assert!(matches!(err, ChunkerError::TokenizerUnavailable(_)));
    }

    #[test]
    fn contiguous_strategies_cover_everything() {
        let text = "alpha\nbeta\ngamma\ndelta";
        for (name, options) in [
            ("fixed_size", json!({"chunkSize": 7})),
            ("by_lines", json!({"linesPerChunk": 2})),
        ] {
            let chunks = run(text, name, options);
            assert_eq!(chunks[0].start_offset, 0, "strategy {name}");
            for pair in chunks.windows(2) {
                // by_lines gaps only over the newline separator
                assert!(pair[1].start_offset - pair[0].end_offset <= 1, "strategy {name}");
            }
            assert!(chunks.last().expect("chunks").end_offset >= char_len(text) - 1);
        }
    }
}
