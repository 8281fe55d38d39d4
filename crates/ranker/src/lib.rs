//! BM25 ranking for the RLM server.
//!
//! An inverted index is built lazily per decomposition (chunk contents in,
//! postings out) and scored with BM25 (`k1 = 1.5`, `b = 0.75`). Tokenization
//! lowercases maximal alphanumeric runs; CJK-dominant text switches to
//! overlapping bigrams.

mod bm25;
mod index;
mod tokenize;

pub use bm25::{rank, ScoredDoc, B, K1};
pub use index::{InvertedIndex, Posting};
pub use tokenize::{is_cjk, is_predominantly_cjk, resolve_mode, tokenize, TokenizerMode};
