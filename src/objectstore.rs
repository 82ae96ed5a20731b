//! Object store adapter (C9, §4.9).
//!
//! Wraps the `object_store` crate around an S3-compatible bucket, keying
//! every blob under a document's UUID: the original upload, the extracted
//! plain text, one JSON blob per chunk, and the document's BM25
//! term-frequency index. Deleting a document removes its entire prefix in
//! one call, which the ingestion orchestrator relies on for rollback.

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ObjectStoreConfig;
use crate::error::CoreError;
use crate::models::{Bm25DocIndex, ChunkBlob};

const FETCH_CONCURRENCY: usize = 10;

pub struct ObjectStoreAdapter {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl ObjectStoreAdapter {
    pub fn new(config: &ObjectStoreConfig) -> Result<Self, CoreError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }
        let store = builder
            .build()
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        Ok(Self {
            store: Arc::new(store),
            prefix: config.prefix.clone(),
        })
    }

    fn path(&self, uuid: Uuid, suffix: &str) -> ObjectPath {
        let raw = if self.prefix.is_empty() {
            format!("{uuid}/{suffix}")
        } else {
            format!("{}/{uuid}/{suffix}", self.prefix.trim_matches('/'))
        };
        ObjectPath::from(raw)
    }

    pub async fn put_original(&self, uuid: Uuid, bytes: Vec<u8>) -> Result<(), CoreError> {
        self.put_bytes(uuid, "original", bytes.into()).await
    }

    pub async fn put_extracted_text(&self, uuid: Uuid, text: &str) -> Result<(), CoreError> {
        self.put_bytes(uuid, "extracted.txt", Bytes::from(text.to_string())).await
    }

    pub async fn put_chunk(&self, uuid: Uuid, chunk: &ChunkBlob) -> Result<(), CoreError> {
        let json = serde_json::to_vec(chunk)
            .map_err(|e| CoreError::StoreUnavailable(format!("chunk serialization failed: {e}")))?;
        let suffix = format!("chunks/{:06}.json", chunk.index);
        self.put_bytes(uuid, &suffix, json.into()).await
    }

    pub async fn put_chunks(&self, uuid: Uuid, chunks: &[ChunkBlob]) -> Result<(), CoreError> {
        stream::iter(chunks.iter())
            .map(|chunk| self.put_chunk(uuid, chunk))
            .buffer_unordered(FETCH_CONCURRENCY)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(())
    }

    pub async fn put_bm25_index(&self, uuid: Uuid, index: &Bm25DocIndex) -> Result<(), CoreError> {
        let json = serde_json::to_vec(index)
            .map_err(|e| CoreError::StoreUnavailable(format!("bm25 index serialization failed: {e}")))?;
        self.put_bytes(uuid, "bm25_doc_index.json", json.into()).await
    }

    async fn put_bytes(&self, uuid: Uuid, suffix: &str, bytes: Bytes) -> Result<(), CoreError> {
        self.store
            .put(&self.path(uuid, suffix), bytes.into())
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    pub async fn get_chunk_text(&self, uuid: Uuid, chunk_index: i64) -> Result<String, CoreError> {
        let suffix = format!("chunks/{chunk_index:06}.json");
        let bytes = self
            .store
            .get(&self.path(uuid, &suffix))
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        let blob: ChunkBlob = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::StoreUnavailable(format!("malformed chunk blob: {e}")))?;
        Ok(blob.text)
    }

    /// Hydrates chunk text for many `(uuid, chunk_index)` pairs concurrently.
    /// Used by the query orchestrator, which only needs text for the final
    /// top-k results rather than every candidate (§4.14).
    pub async fn get_chunk_texts(&self, keys: Vec<(Uuid, i64)>) -> Vec<Result<String, CoreError>> {
        stream::iter(keys)
            .map(|(uuid, idx)| async move { self.get_chunk_text(uuid, idx).await })
            .buffered(FETCH_CONCURRENCY)
            .collect()
            .await
    }

    pub async fn get_bm25_index(&self, uuid: Uuid) -> Result<Bm25DocIndex, CoreError> {
        let bytes = self
            .store
            .get(&self.path(uuid, "bm25_doc_index.json"))
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::StoreUnavailable(format!("malformed bm25 index: {e}")))
    }

    /// Fetches many documents' BM25 indexes concurrently, tolerating
    /// individual misses (a document deleted between candidate selection and
    /// hydration just scores zero rather than failing the whole query).
    pub async fn get_bm25_indexes(&self, uuids: Vec<Uuid>) -> Vec<(Uuid, Option<Bm25DocIndex>)> {
        stream::iter(uuids)
            .map(|uuid| async move {
                let index = self.get_bm25_index(uuid).await.ok();
                (uuid, index)
            })
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await
    }

    /// Deletes every blob under `{uuid}/`, used for ingestion rollback and
    /// document deletion alike.
    pub async fn delete_prefix(&self, uuid: Uuid) -> Result<(), CoreError> {
        let prefix = self.path(uuid, "");
        let locations: Vec<ObjectPath> = self
            .store
            .list(Some(&prefix))
            .map(|meta| meta.map(|m| m.location))
            .try_collect()
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        for location in locations {
            self.store
                .delete(&location)
                .await
                .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        }
        Ok(())
    }

    /// Lists every document UUID prefix currently in the object store, for
    /// the GC reconciliation sweep (§11).
    pub async fn list_document_prefixes(&self) -> Result<Vec<Uuid>, CoreError> {
        let root = if self.prefix.is_empty() {
            ObjectPath::from("")
        } else {
            ObjectPath::from(self.prefix.trim_matches('/'))
        };
        let mut uuids = std::collections::BTreeSet::new();
        let mut stream = self.store.list(Some(&root));
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
            let parts: Vec<String> = meta.location.parts().map(|p| p.as_ref().to_string()).collect::<Vec<_>>();
            let uuid_part = if self.prefix.is_empty() { parts.first() } else { parts.get(1) };
            if let Some(part) = uuid_part {
                if let Ok(uuid) = Uuid::parse_str(part) {
                    uuids.insert(uuid);
                }
            }
        }
        Ok(uuids.into_iter().collect())
    }
}
