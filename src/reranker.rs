//! LLM judge reranking (C12, §4.12).
//!
//! Scores `(query, chunk)` pairs in small batches under bounded concurrency.
//! A batch that fails (timeout, malformed response, provider error) never
//! aborts the whole rerank: its chunks fall back to the order they arrived
//! in, with `rerank_score = 0.0` and no reasoning, so a reranker outage
//! degrades relevance rather than availability.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::time::Duration;

use crate::config::RerankerConfig;

const MAX_CONCURRENCY: usize = 10;

#[derive(Debug, Clone)]
pub struct RerankCandidate {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct RerankResult {
    pub id: i64,
    pub score: f32,
    pub reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JudgeResponseItem {
    id: i64,
    score: f32,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Reranks `candidates` against `query`, preserving input order as the
/// fallback for any batch that fails outright.
pub async fn rerank(config: &RerankerConfig, query: &str, candidates: Vec<RerankCandidate>) -> Vec<RerankResult> {
    if !config.enabled || candidates.is_empty() {
        return candidates
            .into_iter()
            .map(|c| RerankResult {
                id: c.id,
                score: 0.0,
                reasoning: None,
            })
            .collect();
    }

    let batch_size = config.batch_size.max(1);
    let batches: Vec<Vec<RerankCandidate>> = candidates
        .chunks(batch_size)
        .map(|c| c.to_vec())
        .collect();

    let results: Vec<Vec<RerankResult>> = stream::iter(batches)
        .map(|batch| async move { score_batch(config, query, batch).await })
        .buffer_unordered(MAX_CONCURRENCY)
        .collect()
        .await;

    results.into_iter().flatten().collect()
}

async fn score_batch(config: &RerankerConfig, query: &str, batch: Vec<RerankCandidate>) -> Vec<RerankResult> {
    let fallback = || {
        batch
            .iter()
            .map(|c| RerankResult {
                id: c.id,
                score: 0.0,
                reasoning: None,
            })
            .collect::<Vec<_>>()
    };

    let api_key = match std::env::var(&config.api_key_env) {
        Ok(k) => k,
        Err(_) => return fallback(),
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
    {
        Ok(c) => c,
        Err(_) => return fallback(),
    };

    let passages: Vec<serde_json::Value> = batch
        .iter()
        .map(|c| serde_json::json!({ "id": c.id, "text": c.text }))
        .collect();

    let prompt = format!(
        "Query: {query}\n\nScore each passage's relevance to the query from 0.0 to 1.0. \
         Respond with a JSON object {{\"results\": [{{\"id\": number, \"score\": number, \
         \"reasoning\": string}}]}} covering every passage.\n\nPassages:\n{}",
        serde_json::to_string(&passages).unwrap_or_default()
    );

    let body = serde_json::json!({
        "model": config.model,
        "messages": [{ "role": "user", "content": prompt }],
        "response_format": { "type": "json_object" },
    });

    let resp = match client
        .post(&config.endpoint)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&body)
        .send()
        .await
    {
        Ok(r) if r.status().is_success() => r,
        _ => return fallback(),
    };

    let json: serde_json::Value = match resp.json().await {
        Ok(j) => j,
        Err(_) => return fallback(),
    };

    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str());

    let content = match content {
        Some(c) => c,
        None => return fallback(),
    };

    #[derive(Deserialize)]
    struct JudgeResponse {
        results: Vec<JudgeResponseItem>,
    }

    match serde_json::from_str::<JudgeResponse>(content) {
        Ok(parsed) => batch
            .iter()
            .map(|c| {
                parsed
                    .results
                    .iter()
                    .find(|r| r.id == c.id)
                    .map(|r| RerankResult {
                        id: c.id,
                        score: r.score,
                        reasoning: r.reasoning.clone(),
                    })
                    .unwrap_or(RerankResult {
                        id: c.id,
                        score: 0.0,
                        reasoning: None,
                    })
            })
            .collect(),
        Err(_) => fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_reranker_preserves_input_order_with_zero_scores() {
        let config = RerankerConfig {
            enabled: false,
            endpoint: String::new(),
            model: String::new(),
            api_key_env: "UNUSED".to_string(),
            batch_size: 2,
            timeout_secs: 1,
        };
        let candidates = vec![
            RerankCandidate { id: 1, text: "a".to_string() },
            RerankCandidate { id: 2, text: "b".to_string() },
        ];
        let results = rerank(&config, "query", candidates).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[0].score, 0.0);
    }

    #[tokio::test]
    async fn missing_api_key_falls_back_without_aborting() {
        let config = RerankerConfig {
            enabled: true,
            endpoint: "https://example.invalid/v1/chat/completions".to_string(),
            model: "judge".to_string(),
            api_key_env: "RERANKER_TEST_KEY_UNSET".to_string(),
            batch_size: 2,
            timeout_secs: 1,
        };
        let candidates = vec![RerankCandidate { id: 7, text: "hello".to_string() }];
        let results = rerank(&config, "query", candidates).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 7);
        assert_eq!(results[0].score, 0.0);
    }
}
