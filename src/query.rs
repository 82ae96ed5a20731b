//! Query orchestrator (C14, §4.14).
//!
//! 1. Embed the query text.
//! 2. Vector-search for candidates under the metadata filter and
//!    `min_similarity` threshold: `max(100, rerank_candidates)` when hybrid
//!    fusion or reranking will run over the pool, `top_k` otherwise.
//! 3. If hybrid, fetch each candidate document's BM25 index from the object
//!    store, score it against the tokenized query, and fuse the vector and
//!    BM25 rankings with RRF.
//! 4. Truncate to `top_k`.
//! 5. If reranking is enabled, hydrate chunk text for the candidates and
//!    have the reranker re-score and re-sort them.
//! 6. Otherwise, lazily hydrate chunk text only for the final `top_k`.

use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::embedder;
use crate::error::CoreError;
use crate::filter::{parse_filter, FilterNode};
use crate::models::{SearchResultItem, VectorCandidate};
use crate::objectstore::ObjectStoreAdapter;
use crate::reranker::{self, RerankCandidate};
use crate::rrf::{self, RankedItem};
use crate::store::VectorStore;
use crate::{bm25, tokenizer};

pub struct QueryRequest {
    pub query: String,
    pub hybrid: bool,
    pub rerank: bool,
    pub top_k: Option<usize>,
    pub filter: Option<JsonValue>,
}

pub async fn run_query(
    config: &Config,
    store: &VectorStore,
    objects: &ObjectStoreAdapter,
    request: QueryRequest,
) -> Result<Vec<SearchResultItem>, CoreError> {
    if request.query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let filter: Option<FilterNode> = request
        .filter
        .as_ref()
        .map(parse_filter)
        .transpose()?;

    let top_k = request.top_k.unwrap_or(config.retrieval.top_k);
    let candidate_count = if request.hybrid || request.rerank {
        config.retrieval.rerank_candidates.max(100)
    } else {
        top_k
    } as i64;

    let query_embedding = embedder::embed_query(&config.embedding, &request.query).await?;

    let vector_candidates = store
        .search_similar(&query_embedding, candidate_count, config.retrieval.min_similarity, filter.as_ref())
        .await?;

    if vector_candidates.is_empty() {
        return Ok(Vec::new());
    }

    let fused = if request.hybrid {
        fuse_with_bm25(objects, &request.query, vector_candidates).await
    } else {
        vector_candidates
            .into_iter()
            .map(|c| (c.chunk_id, c, 0.0))
            .collect()
    };

    let mut truncated: Vec<VectorCandidate> = fused.into_iter().take(top_k).map(|(_, c, _)| c).collect();

    if request.rerank && config.reranker.enabled {
        truncated = apply_rerank(&config.reranker, objects, &request.query, truncated).await?;
    }

    hydrate_results(objects, truncated).await
}

async fn fuse_with_bm25(
    objects: &ObjectStoreAdapter,
    query: &str,
    vector_candidates: Vec<VectorCandidate>,
) -> Vec<(i64, VectorCandidate, f64)> {
    let query_terms = tokenizer::tokenize(query);

    let uuids: Vec<uuid::Uuid> = vector_candidates.iter().map(|c| c.document_uuid).collect();
    let indexes = objects.get_bm25_indexes(uuids).await;
    let index_map: std::collections::HashMap<uuid::Uuid, _> = indexes.into_iter().collect();

    let mut bm25_scored: Vec<(i64, f32)> = vector_candidates
        .iter()
        .filter_map(|c| {
            let index = index_map.get(&c.document_uuid)?.as_ref()?;
            let score = bm25::score(&query_terms, index, c.token_count, &c.keywords);
            Some((c.chunk_id, score))
        })
        .collect();
    bm25_scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));

    let vector_ranked: Vec<RankedItem<VectorCandidate>> = vector_candidates
        .iter()
        .cloned()
        .map(|c| RankedItem { id: c.chunk_id, item: c })
        .collect();
    let bm25_ranked: Vec<RankedItem<VectorCandidate>> = bm25_scored
        .iter()
        .filter_map(|(id, _)| {
            vector_candidates
                .iter()
                .find(|c| c.chunk_id == *id)
                .cloned()
                .map(|item| RankedItem { id: *id, item })
        })
        .collect();

    rrf::fuse(&vector_ranked, &bm25_ranked)
}

async fn apply_rerank(
    config: &crate::config::RerankerConfig,
    objects: &ObjectStoreAdapter,
    query: &str,
    candidates: Vec<VectorCandidate>,
) -> Result<Vec<VectorCandidate>, CoreError> {
    let keys: Vec<(uuid::Uuid, i64)> = candidates.iter().map(|c| (c.document_uuid, c.chunk_index)).collect();
    let texts = objects.get_chunk_texts(keys).await;

    let rerank_inputs: Vec<RerankCandidate> = candidates
        .iter()
        .zip(texts.iter())
        .filter_map(|(c, text)| {
            text.as_ref().ok().map(|t| RerankCandidate {
                id: c.chunk_id,
                text: t.clone(),
            })
        })
        .collect();

    let results = reranker::rerank(config, query, rerank_inputs).await;
    let result_map: std::collections::HashMap<i64, &reranker::RerankResult> =
        results.iter().map(|r| (r.id, r)).collect();

    let mut reranked: Vec<VectorCandidate> = candidates
        .into_iter()
        .map(|mut c| {
            if let Some(result) = result_map.get(&c.chunk_id) {
                c.rerank_score = Some(result.score);
                c.rerank_reasoning = result.reasoning.clone();
            }
            c
        })
        .collect();

    reranked.sort_by(|a, b| {
        let sa = a.rerank_score.unwrap_or(0.0);
        let sb = b.rerank_score.unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal).then(a.chunk_id.cmp(&b.chunk_id))
    });

    Ok(reranked)
}

async fn hydrate_results(
    objects: &ObjectStoreAdapter,
    candidates: Vec<VectorCandidate>,
) -> Result<Vec<SearchResultItem>, CoreError> {
    let keys: Vec<(uuid::Uuid, i64)> = candidates.iter().map(|c| (c.document_uuid, c.chunk_index)).collect();
    let texts = objects.get_chunk_texts(keys).await;

    let items = candidates
        .into_iter()
        .zip(texts)
        .filter_map(|(c, text)| {
            let chunk_text = text.ok()?;
            Some(SearchResultItem {
                chunk_text,
                similarity: c.similarity,
                rerank_score: c.rerank_score,
                rerank_reasoning: c.rerank_reasoning,
                filename: c.filename,
                chunk_index: c.chunk_index,
                document_uuid: c.document_uuid,
                document_id: c.document_id,
                summary: c.summary,
                document_metadata: c.metadata,
            })
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_handled_by_caller_before_embedding() {
        // run_query short-circuits on an empty/whitespace query without
        // touching the embedder or store; exercised at the orchestrator
        // level via the integration tests.
        assert!("   ".trim().is_empty());
    }
}
