//! Simplified document-level BM25 scorer (C10, §4.10).
//!
//! Deliberately not textbook BM25: there is no corpus-wide IDF term (each
//! document is scored independently against its own term-frequency index,
//! fetched from the object store), and `avgdl` is a fixed constant rather
//! than a corpus average. The per-term contributions are summed first; the
//! completed sum is then multiplied by 1.5 for every LLM-extracted keyword
//! that case-insensitively matches a query term, not per term before the sum.

use crate::models::Bm25DocIndex;

pub const K1: f32 = 1.2;
pub const B: f32 = 0.75;
pub const AVG_DOC_LEN: f32 = 1000.0;
pub const KEYWORD_BOOST: f32 = 1.5;

/// Scores `doc_index` against `query_terms` (already tokenized and stemmed
/// the same way the document index was built). `doc_length` is the
/// document's total token count, used for the length-normalization term.
pub fn score(query_terms: &[String], doc_index: &Bm25DocIndex, doc_length: i64, keywords: &[String]) -> f32 {
    if query_terms.is_empty() || doc_index.term_frequencies.is_empty() {
        return 0.0;
    }

    let dl = doc_length.max(0) as f32;
    let norm_len = 1.0 - B + B * (dl / AVG_DOC_LEN);

    let mut total = 0.0f32;
    for term in query_terms {
        let tf = *doc_index.term_frequencies.get(term).unwrap_or(&0) as f32;
        if tf == 0.0 {
            continue;
        }
        let numerator = tf * (K1 + 1.0);
        let denominator = tf + K1 * norm_len;
        total += numerator / denominator;
    }

    let matched_keywords = keywords
        .iter()
        .filter(|kw| {
            let kw_lower = kw.to_lowercase();
            query_terms.iter().any(|term| kw_lower.contains(term.as_str()))
        })
        .count() as i32;

    total * KEYWORD_BOOST.powi(matched_keywords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn index(pairs: &[(&str, u32)]) -> Bm25DocIndex {
        Bm25DocIndex {
            term_frequencies: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn no_matching_terms_scores_zero() {
        let idx = index(&[("apple", 3)]);
        let s = score(&["banana".to_string()], &idx, 1000, &[]);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn higher_term_frequency_scores_higher() {
        let low = index(&[("rust", 1)]);
        let high = index(&[("rust", 10)]);
        let s_low = score(&["rust".to_string()], &low, 1000, &[]);
        let s_high = score(&["rust".to_string()], &high, 1000, &[]);
        assert!(s_high > s_low);
    }

    #[test]
    fn matching_keyword_boosts_score() {
        let idx = index(&[("rust", 3)]);
        let base = score(&["rust".to_string()], &idx, 1000, &[]);
        let boosted = score(&["rust".to_string()], &idx, 1000, &["Rust Programming".to_string()]);
        assert!((boosted - base * KEYWORD_BOOST).abs() < 1e-5);
    }

    #[test]
    fn multiple_matched_keywords_compound_the_boost() {
        let idx = index(&[("rust", 3), ("async", 2)]);
        let terms = vec!["rust".to_string(), "async".to_string()];
        let base = score(&terms, &idx, 1000, &[]);
        let one_match = score(&terms, &idx, 1000, &["Rust Basics".to_string()]);
        let two_matches = score(&terms, &idx, 1000, &["Rust Basics".to_string(), "Async Rust".to_string()]);
        assert!((one_match - base * KEYWORD_BOOST).abs() < 1e-5);
        assert!((two_matches - base * KEYWORD_BOOST.powi(2)).abs() < 1e-5);
    }

    #[test]
    fn longer_document_scores_lower_for_same_term_frequency() {
        let idx = index(&[("rust", 3)]);
        let short = score(&["rust".to_string()], &idx, 200, &[]);
        let long = score(&["rust".to_string()], &idx, 5000, &[]);
        assert!(short > long);
    }

    #[test]
    fn empty_query_scores_zero() {
        let idx = index(&[("rust", 3)]);
        assert_eq!(score(&[], &idx, 1000, &[]), 0.0);
    }
}
