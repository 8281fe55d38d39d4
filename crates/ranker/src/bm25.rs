//! BM25 scoring over an [`InvertedIndex`].

use crate::index::InvertedIndex;
use crate::tokenize::tokenize;
use serde::Serialize;
use std::collections::HashMap;

pub const K1: f64 = 1.5;
pub const B: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredDoc {
    pub doc_id: u32,
    pub score: f64,
}

/// Rank documents for `query`, returning up to `top_k` results by score
/// descending (ties broken by document order). Scores of zero or below, and
/// scores under `min_score`, are filtered.
pub fn rank(
    index: &InvertedIndex,
    query: &str,
    top_k: usize,
    min_score: Option<f64>,
) -> Vec<ScoredDoc> {
    let n = index.doc_count();
    if n == 0 || top_k == 0 {
        return Vec::new();
    }

    let mut query_terms: HashMap<String, u32> = HashMap::new();
    for term in tokenize(query, index.mode()) {
        *query_terms.entry(term).or_insert(0) += 1;
    }

    let mut scores: HashMap<u32, f64> = HashMap::new();
    for (term, qf) in query_terms {
        let Some(postings) = index.postings(&term) else {
            continue;
        };
        let df = postings.len() as f64;
        let idf = (1.0 + (n as f64 - df + 0.5) / (df + 0.5)).ln();

        for posting in postings {
            let tf = posting.tf as f64;
            let doc_len = index.doc_len(posting.doc_id) as f64;
            let norm = K1 * (1.0 - B + B * doc_len / index.avg_doc_len());
            let contribution = qf as f64 * idf * (tf * (K1 + 1.0)) / (tf + norm);
            *scores.entry(posting.doc_id).or_insert(0.0) += contribution;
        }
    }

    let threshold = min_score.unwrap_or(0.0);
    let mut ranked: Vec<ScoredDoc> = scores
        .into_iter()
        .filter(|&(_, score)| score > 0.0 && score >= threshold)
        .map(|(doc_id, score)| ScoredDoc { doc_id, score })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    ranked.truncate(top_k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::TokenizerMode;

    fn sample_index() -> InvertedIndex {
        InvertedIndex::build(
            ["the cat sat", "dogs bark", "the cat and the cat"],
            TokenizerMode::Auto,
        )
    }

    #[test]
    fn ranks_by_bm25_score() {
        let ranked = rank(&sample_index(), "cat", 10, None);
        // The tf-heavy chunk wins; the disjoint chunk is filtered at zero.
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].doc_id, 2);
        assert_eq!(ranked[1].doc_id, 0);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn disjoint_documents_do_not_shift_ranks() {
        let base = rank(&sample_index(), "cat", 10, None);
        let grown = InvertedIndex::build(
            [
                "the cat sat",
                "dogs bark",
                "the cat and the cat",
                "zebras graze quietly",
            ],
            TokenizerMode::Auto,
        );
        let after = rank(&grown, "cat", 10, None);
        let base_order: Vec<u32> = base.iter().map(|d| d.doc_id).collect();
        let after_order: Vec<u32> = after.iter().map(|d| d.doc_id).collect();
        assert_eq!(base_order, after_order);
    }

    #[test]
    fn min_score_filters() {
        let all = rank(&sample_index(), "cat", 10, None);
        let floor = all[0].score;
        let filtered = rank(&sample_index(), "cat", 10, Some(floor));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].doc_id, 2);
    }

    #[test]
    fn top_k_truncates() {
        let ranked = rank(&sample_index(), "the cat", 1, None);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn repeated_query_terms_weigh_in() {
        let single = rank(&sample_index(), "cat", 10, None);
        let doubled = rank(&sample_index(), "cat cat", 10, None);
        assert!((doubled[0].score - 2.0 * single[0].score).abs() < 1e-9);
    }

    #[test]
    fn no_hits_is_empty() {
        assert!(rank(&sample_index(), "quasar", 10, None).is_empty());
    }
}
