//! Document retrieval by id (§6).
//!
//! Fetches a document row from the vector store and hydrates every chunk's
//! text from the object store, in chunk-index order.

use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::Metadata;
use crate::objectstore::ObjectStoreAdapter;
use crate::store::VectorStore;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub uuid: Uuid,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub uploaded_by: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub metadata: Metadata,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub token_count: i64,
    pub chunks: Vec<ChunkResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkResponse {
    pub index: i64,
    pub text: String,
}

pub async fn get_document(
    store: &VectorStore,
    objects: &ObjectStoreAdapter,
    uuid: Uuid,
) -> Result<DocumentResponse, CoreError> {
    let document = store
        .find_by_uuid(uuid)
        .await?
        .ok_or_else(|| CoreError::NotFound(uuid.to_string()))?;

    let keys: Vec<(Uuid, i64)> = (0..document.chunk_count).map(|i| (uuid, i)).collect();
    let texts = objects.get_chunk_texts(keys).await;

    let chunks: Vec<ChunkResponse> = texts
        .into_iter()
        .enumerate()
        .filter_map(|(i, result)| result.ok().map(|text| ChunkResponse { index: i as i64, text }))
        .collect();

    Ok(DocumentResponse {
        uuid: document.uuid,
        filename: document.filename,
        file_type: document.file_type,
        file_size: document.file_size,
        uploaded_by: document.uploaded_by,
        uploaded_at: document.uploaded_at,
        metadata: document.metadata,
        summary: document.summary,
        keywords: document.keywords,
        token_count: document.token_count,
        chunks,
    })
}
