//! Vector store adapter (C8, §4.8).
//!
//! Owns all reads and writes against the `documents` and `chunks` tables:
//! insert, k-NN cosine search under a predicate filter, cascade deletion,
//! and lookup by id/uuid/content hash. Candidates come back ordered by
//! similarity descending, ties broken by chunk id ascending, so downstream
//! fusion sees a deterministic order (invariant P6).

use chrono::Utc;
use pgvector::Vector;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::error::CoreError;
use crate::filter::{evaluate, FilterNode};
use crate::models::{Document, Metadata, VectorCandidate};

pub struct VectorStore {
    pool: PgPool,
}

impl VectorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Looks up a document by content hash, for dedup (invariant I1).
    pub async fn find_by_content_hash(&self, hash: &str) -> Result<Option<Document>, CoreError> {
        let row = sqlx::query(
            "SELECT id, uuid, filename, file_type, file_size, content_hash, uploaded_by, \
             uploaded_at, metadata, summary, keywords, token_count, chunk_count \
             FROM documents WHERE content_hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        Ok(row.map(row_to_document))
    }

    pub async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Document>, CoreError> {
        let row = sqlx::query(
            "SELECT id, uuid, filename, file_type, file_size, content_hash, uploaded_by, \
             uploaded_at, metadata, summary, keywords, token_count, chunk_count \
             FROM documents WHERE uuid = $1",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        Ok(row.map(row_to_document))
    }

    pub async fn list_documents(&self, limit: i64, offset: i64) -> Result<Vec<Document>, CoreError> {
        let rows = sqlx::query(
            "SELECT id, uuid, filename, file_type, file_size, content_hash, uploaded_by, \
             uploaded_at, metadata, summary, keywords, token_count, chunk_count \
             FROM documents ORDER BY uploaded_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        Ok(rows.into_iter().map(row_to_document).collect())
    }

    /// Inserts a new document row. Relies on the `content_hash` unique
    /// constraint to make a racing duplicate upload fail at the database
    /// rather than the application layer.
    pub async fn insert_document(
        &self,
        uuid: Uuid,
        filename: &str,
        file_type: &str,
        file_size: i64,
        content_hash: &str,
        uploaded_by: &str,
        metadata: &Metadata,
        summary: Option<&str>,
        keywords: &[String],
        token_count: i64,
        chunk_count: i64,
    ) -> Result<i64, CoreError> {
        let metadata_json = serde_json::to_value(metadata)
            .map_err(|e| CoreError::StoreUnavailable(format!("metadata serialization failed: {e}")))?;

        let row = sqlx::query(
            "INSERT INTO documents \
             (uuid, filename, file_type, file_size, content_hash, uploaded_by, uploaded_at, \
              metadata, summary, keywords, token_count, chunk_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING id",
        )
        .bind(uuid)
        .bind(filename)
        .bind(file_type)
        .bind(file_size)
        .bind(content_hash)
        .bind(uploaded_by)
        .bind(Utc::now())
        .bind(metadata_json)
        .bind(summary)
        .bind(keywords)
        .bind(token_count)
        .bind(chunk_count)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::StoreUnavailable(format!("duplicate content_hash: {e}"))
            } else {
                CoreError::StoreUnavailable(e.to_string())
            }
        })?;

        Ok(row.get::<i64, _>("id"))
    }

    pub async fn insert_chunks(
        &self,
        document_id: i64,
        chunks: &[(i64, Vec<f32>)],
    ) -> Result<(), CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        for (index, embedding) in chunks {
            sqlx::query(
                "INSERT INTO chunks (document_id, chunk_index, embedding, created_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(document_id)
            .bind(index)
            .bind(Vector::from(embedding.clone()))
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    /// Deletes a document and its chunks (cascade via foreign key), for
    /// invariant I4. Returns the deleted document's uuid so the caller can
    /// clean up its object-store prefix too.
    pub async fn delete_document(&self, uuid: Uuid) -> Result<Option<Uuid>, CoreError> {
        let row = sqlx::query("DELETE FROM documents WHERE uuid = $1 RETURNING uuid")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        Ok(row.map(|r| r.get::<Uuid, _>("uuid")))
    }

    /// Vector k-NN search: pulls the `limit` nearest chunks by cosine
    /// distance, joined against their parent document, then applies the
    /// metadata filter and `min_similarity` threshold in application code
    /// (the filter DSL is too general to translate into SQL predicates).
    pub async fn search_similar(
        &self,
        query_embedding: &[f32],
        limit: i64,
        min_similarity: f32,
        filter: Option<&FilterNode>,
    ) -> Result<Vec<VectorCandidate>, CoreError> {
        let vector = Vector::from(query_embedding.to_vec());

        let rows = sqlx::query(
            "SELECT c.id AS chunk_id, c.chunk_index, d.id AS document_id, d.uuid AS document_uuid, \
             1 - (c.embedding <=> $1) AS similarity, d.filename, d.uploaded_by, d.summary, \
             d.keywords, d.token_count, d.metadata \
             FROM chunks c JOIN documents d ON d.id = c.document_id \
             ORDER BY c.embedding <=> $1 ASC, c.id ASC LIMIT $2",
        )
        .bind(vector)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let similarity: f32 = row.get("similarity");
            if similarity < min_similarity {
                continue;
            }

            let metadata_json: serde_json::Value = row.get("metadata");
            let metadata: Metadata = serde_json::from_value(metadata_json).unwrap_or_default();

            let candidate = VectorCandidate {
                chunk_id: row.get("chunk_id"),
                chunk_index: row.get("chunk_index"),
                document_id: row.get("document_id"),
                document_uuid: row.get("document_uuid"),
                similarity,
                filename: row.get("filename"),
                uploaded_by: row.get("uploaded_by"),
                summary: row.get("summary"),
                keywords: row.get::<Vec<String>, _>("keywords"),
                token_count: row.get("token_count"),
                metadata,
                rerank_score: None,
                rerank_reasoning: None,
            };

            if let Some(node) = filter {
                let columns = |field: &str| -> Option<serde_json::Value> {
                    match field {
                        "uploaded_by" => Some(serde_json::json!(candidate.uploaded_by)),
                        "keywords" => Some(serde_json::json!(candidate.keywords)),
                        "token_count" => Some(serde_json::json!(candidate.token_count)),
                        "filename" => Some(serde_json::json!(candidate.filename)),
                        _ => None,
                    }
                };
                if !evaluate(node, &columns, &candidate.metadata) {
                    continue;
                }
            }

            candidates.push(candidate);
        }

        Ok(candidates)
    }
}

fn row_to_document(row: sqlx::postgres::PgRow) -> Document {
    let metadata_json: serde_json::Value = row.get("metadata");
    Document {
        id: row.get("id"),
        uuid: row.get("uuid"),
        filename: row.get("filename"),
        file_type: row.get("file_type"),
        file_size: row.get("file_size"),
        content_hash: row.get("content_hash"),
        uploaded_by: row.get("uploaded_by"),
        uploaded_at: row.get("uploaded_at"),
        metadata: serde_json::from_value(metadata_json).unwrap_or_default(),
        summary: row.get("summary"),
        keywords: row.get::<Vec<String>, _>("keywords"),
        token_count: row.get("token_count"),
        chunk_count: row.get("chunk_count"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}
