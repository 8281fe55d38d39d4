//! Deterministic text decomposition for the RLM server.
//!
//! Seven chunking strategies with stable character offsets, content
//! structure detection, structural statistics, and a heuristic strategy
//! recommender. Strategies are modeled as a tagged variant with per-tag
//! option records and a single [`decompose`] entry point; only the
//! chunk-emit pipeline and its count guard are shared.

mod decompose;
mod error;
mod stats;
mod strategy;
mod structure;
mod suggest;
mod tokenizer;
mod types;

pub use decompose::{decompose, DEFAULT_MAX_CHUNKS};
pub use error::{ChunkerError, Result};
pub use stats::{compute_statistics, TextStatistics};
pub use strategy::{
    Strategy, TokenizerSelector, DEFAULT_CHUNK_SIZE, DEFAULT_LINES_PER_CHUNK,
    DEFAULT_TOKENS_PER_CHUNK,
};
pub use structure::{detect_structure, StructureKind};
pub use suggest::{
    suggest_strategy, StrategySuggestion, HEADER_RICH_THRESHOLD, LONG_TEXT_THRESHOLD,
    PARAGRAPH_RICH_THRESHOLD, SENTENCE_RICH_THRESHOLD,
};
pub use tokenizer::TokenizerProvider;
pub use types::{Chunk, ChunkMetadata};
