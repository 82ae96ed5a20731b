//! Deterministic, language-agnostic tokenizer (C3, §4.3).
//!
//! Pipeline: lowercase → extract hyphen-preserving word runs → drop
//! stopwords → Snowball-stem. Shared verbatim by indexing (BM25 term
//! frequencies) and querying, so a query term matches an index term iff
//! they stem to the same form (invariant P3).

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+(?:-[a-z0-9]+)*").unwrap());

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have",
        "he", "in", "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was",
        "were", "will", "with", "not", "no", "so", "if", "than", "then",
    ]
    .into_iter()
    .collect()
});

fn stemmer() -> &'static Stemmer {
    static STEMMER: once_cell::sync::OnceCell<Stemmer> = once_cell::sync::OnceCell::new();
    STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

/// Tokenizes `text` into an ordered list of stemmed tokens.
///
/// Pure function of `text` alone — no hidden state (invariant P3).
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let stemmer = stemmer();

    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|tok| !STOPWORDS.contains(tok))
        .map(|tok| stemmer.stem(tok).into_owned())
        .collect()
}

/// Builds a term-frequency map over `text`, the BM25 document index input.
pub fn term_frequencies(text: &str) -> std::collections::BTreeMap<String, u32> {
    let mut freqs = std::collections::BTreeMap::new();
    for term in tokenize(text) {
        *freqs.entry(term).or_insert(0) += 1;
    }
    freqs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_stopwords() {
        let tokens = tokenize("The Quick Brown Fox");
        assert!(!tokens.iter().any(|t| t == "the"));
        assert!(tokens.contains(&"quick".to_string()) || tokens.contains(&"quickli".to_string()));
    }

    #[test]
    fn preserves_hyphenated_compounds() {
        let tokens = tokenize("state-of-the-art retrieval");
        assert!(tokens.iter().any(|t| t.contains('-')));
    }

    #[test]
    fn is_deterministic_and_stateless() {
        let a = tokenize("Hybrid search agent system");
        let b = tokenize("Hybrid search agent system");
        assert_eq!(a, b);
    }

    #[test]
    fn query_and_index_paths_agree() {
        let index_tokens = tokenize("Running runners ran");
        let query_tokens = tokenize("running");
        assert!(index_tokens.contains(&query_tokens[0]));
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }
}
