//! Core data models used throughout the retrieval pipeline.
//!
//! These types represent the documents, chunks, and search results that flow
//! through the ingestion and query paths. The split mirrors the dual-tier
//! storage model: [`Document`] and [`ChunkRow`] are rows in the vector store
//! (hot tier); chunk text and the BM25 index live in the object store (cold
//! tier) and are represented here only as serialization targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Embedding dimension the vector store is provisioned for (invariant I5).
pub const EMBEDDING_DIM: usize = 768;

/// Document metadata keys that cannot be set by an uploader (§6, invariant I6).
pub const PROTECTED_METADATA_KEYS: &[&str] =
    &["uploaded_by", "uploaded_at", "id", "uuid", "content_hash"];

/// Document attributes that are first-class columns rather than entries in
/// the user `metadata` map, and so are filtered directly (§4.7).
pub const COLUMN_FIELDS: &[&str] = &[
    "uploaded_by",
    "keywords",
    "token_count",
    "created_at",
    "filename",
    "file_type",
    "chunk_count",
];

/// A normalized, free-form key/value map of user-supplied document attributes.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// The unit of ingestion (§3 "Document").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub uuid: Uuid,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub content_hash: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub metadata: Metadata,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub token_count: i64,
    pub chunk_count: i64,
}

/// A retrievable unit within a document (§3 "Chunk").
///
/// The chunk text itself is never stored here — only its embedding. Text
/// lives in the object store at `{document.uuid}/chunks/{chunk_index}.json`.
#[derive(Debug, Clone)]
pub struct ChunkRow {
    pub id: i64,
    pub document_id: i64,
    pub chunk_index: i64,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// One per document, stored in the object store at `bm25_doc_index.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bm25DocIndex {
    pub term_frequencies: BTreeMap<String, u32>,
}

/// Persisted shape of `{uuid}/chunks/NNN.json` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkBlob {
    pub text: String,
    pub index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Strips [`PROTECTED_METADATA_KEYS`] from an uploader-supplied metadata map.
///
/// Attempts to set a protected key are silently dropped, never an error
/// (invariant I6); server-derived values (`uploaded_by`, `uploaded_at`, …)
/// are attached separately by the caller.
pub fn strip_protected_metadata(mut metadata: Metadata) -> Metadata {
    for key in PROTECTED_METADATA_KEYS {
        metadata.remove(*key);
    }
    metadata
}

/// A single retrieved chunk returned from query orchestration (§4.14 step 7).
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub chunk_text: String,
    pub similarity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_reasoning: Option<String>,
    pub filename: String,
    pub chunk_index: i64,
    pub document_uuid: Uuid,
    pub document_id: i64,
    pub summary: Option<String>,
    pub document_metadata: Metadata,
}

/// The shape the vector-store k-NN search returns per candidate (§4.8).
///
/// Carries everything the query orchestrator needs so hybrid scoring never
/// requires a second lookup against the vector store.
#[derive(Debug, Clone)]
pub struct VectorCandidate {
    pub chunk_id: i64,
    pub chunk_index: i64,
    pub document_id: i64,
    pub document_uuid: Uuid,
    pub similarity: f32,
    pub filename: String,
    pub uploaded_by: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub token_count: i64,
    pub metadata: Metadata,
    pub rerank_score: Option<f32>,
    pub rerank_reasoning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_protected_metadata_drops_reserved_keys() {
        let mut metadata = Metadata::new();
        metadata.insert("uploaded_by".to_string(), serde_json::json!("attacker@x"));
        metadata.insert("category".to_string(), serde_json::json!("tech"));

        let cleaned = strip_protected_metadata(metadata);

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.get("category").unwrap(), "tech");
        assert!(!cleaned.contains_key("uploaded_by"));
    }
}
