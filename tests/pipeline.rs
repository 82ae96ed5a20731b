//! End-to-end exercise of the parts of the ingestion/query pipeline that
//! need no external services: extraction, chunking, tokenization, BM25,
//! RRF fusion, and the metadata filter DSL.

use ragforge::models::{Bm25DocIndex, Metadata, VectorCandidate};
use ragforge::{bm25, chunker, extractor, filter, rrf, tokenizer, validator};
use serde_json::json;
use uuid::Uuid;

const ARTICLE: &str = "Rust is a systems programming language that guarantees memory safety \
without a garbage collector. Ownership and borrowing are checked at compile time. \
Cargo is the build tool and package manager for Rust projects. Crates published to \
crates.io can be added as dependencies in Cargo.toml.";

#[test]
fn markdown_upload_flows_through_validate_extract_chunk_tokenize() {
    let bytes = ARTICLE.as_bytes();

    let extracted = validator::validate_and_extract(bytes, "txt").expect("plain text admits");
    assert!(extracted.contains("Ownership and borrowing"));

    let chunks = chunker::chunk_text(&extracted, 120, 20);
    assert!(chunks.len() > 1, "article should split into multiple chunks at this size");
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i as i64);
        assert!(!chunk.text.trim().is_empty());
    }

    let terms = tokenizer::tokenize("ownership and borrowing");
    assert!(terms.contains(&"ownership".to_string()));
    assert!(!terms.contains(&"and".to_string()), "stopwords should be filtered");
}

#[test]
fn unsupported_extension_is_rejected_before_extraction() {
    let err = validator::validate_and_extract(b"binary junk", "exe").unwrap_err();
    assert!(matches!(err, ragforge::error::CoreError::UnsupportedFormat(_)));
}

#[test]
fn empty_document_is_rejected() {
    let err = validator::validate_and_extract(b"   \n\t  ", "txt").unwrap_err();
    assert!(matches!(err, ragforge::error::CoreError::EmptyExtraction));
}

#[test]
fn html_extraction_strips_markup_before_chunking() {
    let html = b"<html><body><h1>Title</h1><p>Hello Rust world.</p></body></html>";
    let extracted = extractor::extract_text(html, "html").unwrap();
    assert!(extracted.contains("Hello Rust world"));
    assert!(!extracted.contains("<p>"));
}

#[test]
fn bm25_scores_rank_documents_with_more_matching_terms_higher() {
    let query_terms = tokenizer::tokenize("rust ownership borrowing");

    let mut relevant = Bm25DocIndex::default();
    for (term, count) in tokenizer::term_frequencies(ARTICLE) {
        relevant.term_frequencies.insert(term, count);
    }

    let mut irrelevant = Bm25DocIndex::default();
    for (term, count) in tokenizer::term_frequencies("the cat sat on the mat all afternoon") {
        irrelevant.term_frequencies.insert(term, count);
    }

    let relevant_score = bm25::score(&query_terms, &relevant, 40, &[]);
    let irrelevant_score = bm25::score(&query_terms, &irrelevant, 10, &[]);

    assert!(relevant_score > irrelevant_score);
}

#[test]
fn rrf_promotes_items_ranked_highly_by_both_signals() {
    let candidate = |id: i64| VectorCandidate {
        chunk_id: id,
        chunk_index: 0,
        document_id: id,
        document_uuid: Uuid::new_v4(),
        similarity: 1.0 / id as f32,
        filename: format!("doc{id}.txt"),
        uploaded_by: "tester".to_string(),
        summary: None,
        keywords: vec![],
        token_count: 100,
        metadata: Metadata::default(),
        rerank_score: None,
        rerank_reasoning: None,
    };

    let vector_ranked = vec![
        rrf::RankedItem { id: 1, item: candidate(1) },
        rrf::RankedItem { id: 2, item: candidate(2) },
        rrf::RankedItem { id: 3, item: candidate(3) },
    ];
    let bm25_ranked = vec![
        rrf::RankedItem { id: 2, item: candidate(2) },
        rrf::RankedItem { id: 1, item: candidate(1) },
        rrf::RankedItem { id: 3, item: candidate(3) },
    ];

    let fused = rrf::fuse(&vector_ranked, &bm25_ranked);
    assert_eq!(fused[0].0, 1, "ranked #1 and #2 by both signals should come out ahead of #3");
    assert_eq!(fused[2].0, 3);
}

#[test]
fn metadata_filter_dsl_evaluates_nested_boolean_composition() {
    let node = filter::parse_filter(&json!({
        "$and": [
            {"department": "engineering"},
            {"$or": [{"level": {"$gte": 3}}, {"tags": {"$all": ["urgent"]}}]}
        ]
    }))
    .unwrap();

    let mut metadata = Metadata::default();
    metadata.insert("department".to_string(), json!("engineering"));
    metadata.insert("level".to_string(), json!(2));
    metadata.insert("tags".to_string(), json!(["urgent", "review"]));

    let columns = |_: &str| None;
    assert!(filter::evaluate(&node, &columns, &metadata));

    metadata.insert("tags".to_string(), json!(["review"]));
    assert!(!filter::evaluate(&node, &columns, &metadata));
}
