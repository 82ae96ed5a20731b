//! Embedding provider abstraction with bounded-parallel calls and
//! token-limit recovery (C5, §4.5).
//!
//! Given a list of text chunks, produces a same-length-or-longer list of
//! 768-dimensional vectors. Each call is independent and runs under a
//! semaphore-bounded concurrency cap. A chunk whose call fails with a
//! token-limit error is never dropped or averaged: it is split at the best
//! available boundary (paragraph → sentence → word) into sub-chunks, each
//! recursed on up to a capped depth, and the caller receives the
//! concatenation of `(sub_text, sub_embedding)` pairs with contiguous
//! indices.

use anyhow::{bail, Result};
use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::chunker;
use crate::config::EmbeddingConfig;
use crate::error::CoreError;
use crate::models::EMBEDDING_DIM;

/// Recursion cap for token-limit-triggered splitting (§4.5).
const MAX_SPLIT_DEPTH: u32 = 3;

/// A successfully embedded piece of text, after any token-limit splitting.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub text: String,
    pub embedding: Vec<f32>,
}

pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;
    fn dims(&self) -> usize;
}

pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
}

pub struct OpenAiProvider {
    model: String,
    dims: usize,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for the openai provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for the openai provider"))?;
        if dims != EMBEDDING_DIM {
            bail!("embedding.dims must be {EMBEDDING_DIM} (invariant I5), got {dims}");
        }
        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }
        Ok(Self { model, dims })
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAiProvider::new(config)?)),
        other => bail!("unknown embedding provider: {other}"),
    }
}

/// Outcome of a single embedding API call.
enum CallOutcome {
    Success(Vec<f32>),
    TokenLimit,
    Transient(String),
    Fatal(String),
}

/// Embeds a batch of document chunks under bounded parallelism, recovering
/// from token-limit errors by recursive splitting. Used by the indexer
/// (many texts); [`embed_query`] is the single-text convenience wrapper used
/// by the query orchestrator.
pub async fn embed_chunks(
    config: &EmbeddingConfig,
    texts: &[String],
    concurrency: usize,
) -> Result<Vec<EmbeddedChunk>, CoreError> {
    let results: Vec<Vec<EmbeddedChunk>> = stream::iter(texts.iter().cloned())
        .map(|text| async move { embed_with_recovery(config, text, 0).await })
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, CoreError>>()?;

    Ok(results.into_iter().flatten().collect())
}

/// Embeds a single piece of text (e.g. a search query).
pub async fn embed_query(config: &EmbeddingConfig, text: &str) -> Result<Vec<f32>, CoreError> {
    let chunks = embed_with_recovery(config, text.to_string(), 0).await?;
    // A query is never split in practice (queries are short), but if the
    // provider ever rejects one on token-limit grounds, the first sub-chunk
    // is representative enough to search with.
    chunks
        .into_iter()
        .next()
        .map(|c| c.embedding)
        .ok_or_else(|| CoreError::EmbeddingFailed("empty embedding result".to_string()))
}

/// Embeds `text`; on a token-limit error, splits it in half at the best
/// available boundary and recurses on each half, up to [`MAX_SPLIT_DEPTH`].
fn embed_with_recovery(
    config: &EmbeddingConfig,
    text: String,
    depth: u32,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<EmbeddedChunk>, CoreError>> + Send>>
{
    let config = config.clone();
    Box::pin(async move {
        match call_with_retry(&config, &text).await {
            CallOutcome::Success(embedding) => Ok(vec![EmbeddedChunk { text, embedding }]),
            CallOutcome::TokenLimit => {
                if depth >= MAX_SPLIT_DEPTH {
                    return Err(CoreError::EmbeddingFailed(format!(
                        "token-limit split exhausted after {MAX_SPLIT_DEPTH} levels"
                    )));
                }
                let (left, right) = chunker::split_in_half(&text);
                if left.is_empty() || right.is_empty() {
                    return Err(CoreError::EmbeddingFailed(
                        "chunk cannot be split further but still exceeds token limit".to_string(),
                    ));
                }
                let mut left_out = embed_with_recovery(&config, left, depth + 1).await?;
                let right_out = embed_with_recovery(&config, right, depth + 1).await?;
                left_out.extend(right_out);
                Ok(left_out)
            }
            CallOutcome::Transient(msg) | CallOutcome::Fatal(msg) => {
                Err(CoreError::EmbeddingFailed(msg))
            }
        }
    })
}

/// Calls the configured provider with exponential-backoff retry on a small
/// set of transient status codes. Token-limit errors are never retried —
/// they're surfaced immediately so the caller can split instead.
async fn call_with_retry(config: &EmbeddingConfig, text: &str) -> CallOutcome {
    if config.provider == "disabled" {
        return CallOutcome::Fatal("embedding provider is disabled".to_string());
    }

    let mut last = String::new();
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }
        match embed_openai_call(config, text).await {
            CallOutcome::Transient(msg) => {
                last = msg;
                continue;
            }
            other => return other,
        }
    }
    CallOutcome::Transient(last)
}

async fn embed_openai_call(config: &EmbeddingConfig, text: &str) -> CallOutcome {
    let api_key = match std::env::var("OPENAI_API_KEY") {
        Ok(k) => k,
        Err(_) => return CallOutcome::Fatal("OPENAI_API_KEY not set".to_string()),
    };
    let model = match &config.model {
        Some(m) => m,
        None => return CallOutcome::Fatal("embedding.model required".to_string()),
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
    {
        Ok(c) => c,
        Err(e) => return CallOutcome::Fatal(e.to_string()),
    };

    let body = serde_json::json!({ "model": model, "input": text });

    let resp = client
        .post("https://api.openai.com/v1/embeddings")
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&body)
        .send()
        .await;

    match resp {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                match response.json::<serde_json::Value>().await {
                    Ok(json) => match parse_embedding(&json) {
                        Ok(vec) => CallOutcome::Success(vec),
                        Err(e) => CallOutcome::Fatal(e),
                    },
                    Err(e) => CallOutcome::Fatal(e.to_string()),
                }
            } else if status.as_u16() == 400 {
                let body_text = response.text().await.unwrap_or_default();
                if body_text.to_lowercase().contains("maximum context length")
                    || body_text.to_lowercase().contains("token")
                {
                    CallOutcome::TokenLimit
                } else {
                    CallOutcome::Fatal(format!("OpenAI API error {status}: {body_text}"))
                }
            } else if status.as_u16() == 429 || status.is_server_error() {
                let body_text = response.text().await.unwrap_or_default();
                CallOutcome::Transient(format!("OpenAI API error {status}: {body_text}"))
            } else {
                let body_text = response.text().await.unwrap_or_default();
                CallOutcome::Fatal(format!("OpenAI API error {status}: {body_text}"))
            }
        }
        Err(e) => CallOutcome::Transient(e.to_string()),
    }
}

fn parse_embedding(json: &serde_json::Value) -> Result<Vec<f32>, String> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|a| a.first())
        .ok_or("invalid OpenAI response: missing data[0]")?;
    let embedding = data
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or("invalid OpenAI response: missing embedding")?;
    Ok(embedding.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_is_fatal_not_transient() {
        let config = EmbeddingConfig {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: 1,
            max_retries: 5,
            timeout_secs: 1,
        };
        let result = embed_chunks(&config, &["hello".to_string()], 4).await;
        assert!(result.is_err());
    }
}
