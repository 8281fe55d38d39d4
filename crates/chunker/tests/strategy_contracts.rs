//! Cross-strategy contracts: offset bounds, index order, coverage for
//! contiguous strategies, and original-offset fidelity for whitespace-
//! dropping strategies.

use rlm_chunker::{decompose, Strategy, DEFAULT_MAX_CHUNKS};
use rlm_protocol::{char_len, char_slice};
use serde_json::json;

const SAMPLE: &str = "# Heading\n\nFirst paragraph with words. Another sentence!\n\n\
second paragraph here\n\n# Next\nThird one? Yes.\nfinal line without gap";

fn all_strategies() -> Vec<Strategy> {
    vec![
        Strategy::from_options("fixed_size", &json!({"chunkSize": 12, "overlap": 3})).expect("opts"),
        Strategy::from_options("by_lines", &json!({"linesPerChunk": 2})).expect("opts"),
        Strategy::from_options("by_paragraphs", &json!({})).expect("opts"),
        Strategy::from_options("by_sections", &json!({})).expect("opts"),
        Strategy::from_options("by_regex", &json!({"pattern": "\\n\\n"})).expect("opts"),
        Strategy::from_options("by_sentences", &json!({})).expect("opts"),
    ]
}

#[test]
fn offsets_are_bounded_and_indices_sequential() {
    let len = char_len(SAMPLE);
    for strategy in all_strategies() {
        let chunks =
            decompose(SAMPLE, &strategy, DEFAULT_MAX_CHUNKS, None).expect("decompose succeeds");
        assert!(!chunks.is_empty(), "strategy {}", strategy.name());
        for (expected_index, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, expected_index, "strategy {}", strategy.name());
            assert!(
                chunk.start_offset <= chunk.end_offset && chunk.end_offset <= len,
                "strategy {}: bad span {}..{} (len {len})",
                strategy.name(),
                chunk.start_offset,
                chunk.end_offset
            );
        }
    }
}

#[test]
fn contiguous_fixed_size_tiles_the_text() {
    let strategy = Strategy::from_options("fixed_size", &json!({"chunkSize": 12})).expect("opts");
    let chunks = decompose(SAMPLE, &strategy, DEFAULT_MAX_CHUNKS, None).expect("decompose");
    assert_eq!(chunks[0].start_offset, 0);
    assert_eq!(chunks.last().expect("chunks").end_offset, char_len(SAMPLE));
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end_offset, pair[1].start_offset);
    }
}

#[test]
fn emitted_content_matches_original_slice() {
    for strategy in all_strategies() {
        let chunks =
            decompose(SAMPLE, &strategy, DEFAULT_MAX_CHUNKS, None).expect("decompose succeeds");
        for chunk in &chunks {
            assert_eq!(
                chunk.content,
                char_slice(SAMPLE, chunk.start_offset, chunk.end_offset),
                "strategy {}: content must be the original slice at its offsets",
                strategy.name()
            );
        }
    }
}

#[test]
fn same_input_same_output() {
    for strategy in all_strategies() {
        let a = decompose(SAMPLE, &strategy, DEFAULT_MAX_CHUNKS, None).expect("decompose");
        let b = decompose(SAMPLE, &strategy, DEFAULT_MAX_CHUNKS, None).expect("decompose");
        assert_eq!(a, b, "strategy {}", strategy.name());
    }
}
