//! LLM-based metadata extraction (C6, §4.6).
//!
//! One call per document produces a short summary and a keyword list, used
//! later for BM25's keyword-boost term and surfaced in search results.
//! Failure here is never fatal to ingestion: after retries are exhausted the
//! document proceeds with `summary = None` and `keywords = []`.

use serde::Deserialize;
use std::time::Duration;

use crate::config::LlmExtractorConfig;

const MAX_RETRIES: u32 = 5;
const MAX_INPUT_CHARS: usize = 12_000;

/// Summary and keywords extracted from a document's text. Absence of a
/// field (rather than an error) is how callers observe extraction failure.
#[derive(Debug, Clone, Default)]
pub struct ExtractedMetadata {
    pub summary: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LlmPayload {
    summary: String,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Produces a summary and keyword list for `text`, or degrades gracefully to
/// an empty result when the provider is disabled or every attempt fails.
pub async fn extract_metadata(config: &LlmExtractorConfig, text: &str) -> ExtractedMetadata {
    if !config.enabled {
        return ExtractedMetadata::default();
    }

    let truncated: String = text.chars().take(MAX_INPUT_CHARS).collect();

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(4));
            tokio::time::sleep(delay).await;
        }

        match call_once(config, &truncated).await {
            Ok(payload) => {
                return ExtractedMetadata {
                    summary: Some(payload.summary),
                    keywords: payload.keywords,
                };
            }
            Err(Retryable(msg)) => {
                tracing::warn!(attempt, error = %msg, "llm extraction attempt failed, retrying");
                continue;
            }
            Err(Fatal(msg)) => {
                tracing::warn!(error = %msg, "llm extraction failed, degrading to empty metadata");
                return ExtractedMetadata::default();
            }
        }
    }

    tracing::warn!("llm extraction exhausted retries, degrading to empty metadata");
    ExtractedMetadata::default()
}

enum CallError {
    Retryable(String),
    Fatal(String),
}
use CallError::{Fatal, Retryable};

async fn call_once(config: &LlmExtractorConfig, text: &str) -> Result<LlmPayload, CallError> {
    let api_key = std::env::var(&config.api_key_env)
        .map_err(|_| Fatal(format!("{} not set", config.api_key_env)))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Fatal(e.to_string()))?;

    let prompt = format!(
        "Summarize the following document in 1-2 sentences and extract up to 10 \
         keywords. Respond with only a JSON object of the shape \
         {{\"summary\": string, \"keywords\": string[]}}.\n\nDocument:\n{text}"
    );

    let body = serde_json::json!({
        "model": config.model,
        "messages": [{ "role": "user", "content": prompt }],
        "response_format": { "type": "json_object" },
    });

    let resp = client
        .post(&config.endpoint)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&body)
        .send()
        .await
        .map_err(|e| Retryable(e.to_string()))?;

    let status = resp.status();
    if status.as_u16() == 429 || status.is_server_error() {
        let body_text = resp.text().await.unwrap_or_default();
        return Err(Retryable(format!("{status}: {body_text}")));
    }
    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        return Err(Fatal(format!("{status}: {body_text}")));
    }

    let json: serde_json::Value = resp.json().await.map_err(|e| Retryable(e.to_string()))?;
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| Retryable("missing choices[0].message.content".to_string()))?;

    // A malformed JSON body is treated the same as a transient API error:
    // it shares the retry budget rather than degrading on the first try.
    serde_json::from_str::<LlmPayload>(content)
        .map_err(|e| Retryable(format!("malformed JSON response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_returns_empty_metadata() {
        let config = LlmExtractorConfig {
            enabled: false,
            endpoint: String::new(),
            model: String::new(),
            api_key_env: "UNUSED".to_string(),
            timeout_secs: 1,
        };
        let result = extract_metadata(&config, "some text").await;
        assert!(result.summary.is_none());
        assert!(result.keywords.is_empty());
    }

    #[tokio::test]
    async fn missing_api_key_degrades_to_empty_metadata() {
        let config = LlmExtractorConfig {
            enabled: true,
            endpoint: "https://example.invalid/v1/chat/completions".to_string(),
            model: "test-model".to_string(),
            api_key_env: "LLM_EXTRACTOR_TEST_KEY_UNSET".to_string(),
            timeout_secs: 1,
        };
        let result = extract_metadata(&config, "some text").await;
        assert!(result.summary.is_none());
        assert!(result.keywords.is_empty());
    }
}
