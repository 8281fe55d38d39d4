//! Inverted index over the chunks of one decomposition.

use crate::tokenize::{resolve_mode, tokenize, TokenizerMode};
use std::collections::HashMap;

/// One posting: a document and the term's frequency within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: u32,
    pub tf: u32,
}

/// Precomputed BM25 state for one decomposition: term postings, per-chunk
/// token lengths, and the corpus mean length.
#[derive(Debug, Clone)]
pub struct InvertedIndex {
    terms: HashMap<String, Vec<Posting>>,
    doc_lens: Vec<u32>,
    avg_doc_len: f64,
    mode: TokenizerMode,
}

impl InvertedIndex {
    /// Build from chunk contents. `mode` may be `auto`; the resolved mode is
    /// recorded so queries tokenize the same way.
    pub fn build<'a, I>(docs: I, mode: TokenizerMode) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let docs: Vec<&str> = docs.into_iter().collect();
        let sample: String = docs
            .iter()
            .flat_map(|d| d.chars())
            .take(2_000)
            .collect();
        let mode = resolve_mode(mode, &sample);

        let mut terms: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lens = Vec::with_capacity(docs.len());

        for (doc_id, content) in docs.iter().enumerate() {
            let tokens = tokenize(content, mode);
            doc_lens.push(tokens.len() as u32);

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for (term, count) in tf {
                terms.entry(term).or_default().push(Posting {
                    doc_id: doc_id as u32,
                    tf: count,
                });
            }
        }

        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().map(|&l| l as f64).sum::<f64>() / doc_lens.len() as f64
        };

        Self {
            terms,
            doc_lens,
            avg_doc_len,
            mode,
        }
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.terms.get(term).map(Vec::as_slice)
    }

    pub fn doc_count(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn doc_len(&self, doc_id: u32) -> u32 {
        self.doc_lens.get(doc_id as usize).copied().unwrap_or(0)
    }

    pub fn avg_doc_len(&self) -> f64 {
        self.avg_doc_len
    }

    pub fn mode(&self) -> TokenizerMode {
        self.mode
    }

    /// Rough in-memory footprint, used for cache accounting only.
    pub fn estimated_bytes(&self) -> usize {
        let term_bytes: usize = self
            .terms
            .iter()
            .map(|(term, postings)| term.len() + 40 + postings.len() * std::mem::size_of::<Posting>())
            .sum();
        term_bytes + self.doc_lens.len() * 4 + 64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_postings_and_lengths() {
        let index = InvertedIndex::build(
            ["the cat sat", "dogs bark", "the cat and the cat"],
            TokenizerMode::Auto,
        );
        assert_eq!(index.doc_count(), 3);
        assert_eq!(index.doc_len(0), 3);
        assert_eq!(index.doc_len(2), 5);
        assert!((index.avg_doc_len() - 10.0 / 3.0).abs() < 1e-9);

        let cat = index.postings("cat").expect("cat indexed");
        assert_eq!(cat.len(), 2);
        let by_doc: Vec<(u32, u32)> = cat.iter().map(|p| (p.doc_id, p.tf)).collect();
        assert!(by_doc.contains(&(0, 1)));
        assert!(by_doc.contains(&(2, 2)));
        assert!(index.postings("bark").is_some());
        assert!(index.postings("missing").is_none());
    }

    #[test]
    fn empty_corpus_is_well_formed() {
        let index = InvertedIndex::build([], TokenizerMode::Auto);
        assert_eq!(index.doc_count(), 0);
        assert_eq!(index.avg_doc_len(), 0.0);
    }

    #[test]
    fn resolved_mode_is_recorded() {
        let index = InvertedIndex::build(["中文内容", "更多中文"], TokenizerMode::Auto);
        assert_eq!(index.mode(), TokenizerMode::CjkBigram);
        assert!(index.postings("中文").is_some());
    }
}
