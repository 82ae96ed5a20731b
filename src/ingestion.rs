//! Ingestion orchestrator (C13, §4.13).
//!
//! Drives a single upload through validation, hashing, extraction,
//! chunking, parallel embedding/LLM-extraction/object-store writes, BM25
//! indexing, and the final vector-store commit. Every stage after hashing
//! runs best-effort cleanup on failure: an object-store prefix is only ever
//! left behind if the vector-store commit itself fails after the blobs were
//! already written, in which case it's the GC sweep's job to reconcile it.
//!
//! ```text
//! RECEIVED -> VALIDATED -> HASHED -+-> DEDUPED (stop)
//!                                  |
//!                                  +-> EXTRACTING -> CHUNKING
//!                                        -> (EMBEDDING | LLM_EXTRACT | OBJECTSTORE)
//!                                        -> BM25_INDEXED -> VECTORSTORE_COMMIT -> COMMITTED
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::chunker::{self, TextChunk};
use crate::config::Config;
use crate::embedder::{self, EmbeddedChunk};
use crate::error::CoreError;
use crate::llm_extractor;
use crate::models::{strip_protected_metadata, ChunkBlob, Document, Metadata};
use crate::objectstore::ObjectStoreAdapter;
use crate::store::VectorStore;
use crate::tokenizer;

/// Outcome of an ingestion attempt: either a newly committed document, or a
/// pointer to the existing one it deduplicated against (invariant I1).
pub enum IngestOutcome {
    Committed(Document),
    Deduplicated(Document),
}

pub struct IngestRequest {
    pub filename: String,
    pub extension: String,
    pub bytes: Vec<u8>,
    pub uploaded_by: String,
    pub metadata: Metadata,
}

pub async fn ingest_document(
    config: &Config,
    store: &VectorStore,
    objects: &ObjectStoreAdapter,
    request: IngestRequest,
) -> Result<IngestOutcome, CoreError> {
    // VALIDATED
    let extracted_text = crate::validator::validate_and_extract(&request.bytes, &request.extension)?;

    // HASHED
    let content_hash = hash_content(&request.bytes);

    // DEDUPED
    if let Some(existing) = store.find_by_content_hash(&content_hash).await? {
        return Ok(IngestOutcome::Deduplicated(existing));
    }

    let uuid = Uuid::new_v4();

    // Run the stages that can fail after committing nothing yet; on error,
    // nothing has been persisted so there's nothing to roll back.
    let (chunks, embedded, llm_metadata) = run_pipeline(config, &extracted_text).await?;

    // OBJECTSTORE: original + extracted text + per-chunk blobs + bm25 index.
    if let Err(e) = write_object_store(objects, uuid, &request.bytes, &extracted_text, &chunks, &embedded).await {
        objects.delete_prefix(uuid).await.ok();
        return Err(e);
    }

    // VECTORSTORE_COMMIT
    let metadata = strip_protected_metadata(request.metadata);
    let token_count = tokenizer::tokenize(&extracted_text).len() as i64;

    let document_id = match store
        .insert_document(
            uuid,
            &request.filename,
            &request.extension,
            request.bytes.len() as i64,
            &content_hash,
            &request.uploaded_by,
            &metadata,
            llm_metadata.summary.as_deref(),
            &llm_metadata.keywords,
            token_count,
            embedded.len() as i64,
        )
        .await
    {
        Ok(id) => id,
        Err(e) => {
            objects.delete_prefix(uuid).await.ok();
            return Err(e);
        }
    };

    let chunk_rows: Vec<(i64, Vec<f32>)> = embedded
        .iter()
        .enumerate()
        .map(|(i, c)| (i as i64, c.embedding.clone()))
        .collect();

    if let Err(e) = store.insert_chunks(document_id, &chunk_rows).await {
        store.delete_document(uuid).await.ok();
        objects.delete_prefix(uuid).await.ok();
        return Err(e);
    }

    let document = Document {
        id: document_id,
        uuid,
        filename: request.filename,
        file_type: request.extension,
        file_size: request.bytes.len() as i64,
        content_hash,
        uploaded_by: request.uploaded_by,
        uploaded_at: chrono::Utc::now(),
        metadata,
        summary: llm_metadata.summary,
        keywords: llm_metadata.keywords,
        token_count,
        chunk_count: embedded.len() as i64,
    };

    Ok(IngestOutcome::Committed(document))
}

async fn run_pipeline(
    config: &Config,
    extracted_text: &str,
) -> Result<(Vec<TextChunk>, Vec<EmbeddedChunk>, llm_extractor::ExtractedMetadata), CoreError> {
    // CHUNKING
    let chunks = chunker::chunk_text(
        extracted_text,
        config.chunking.chunk_chars,
        config.chunking.overlap_chars,
    );
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

    // EMBEDDING and LLM_EXTRACT run concurrently; both recover gracefully
    // from their own transient failures, so only embedding's error aborts
    // ingestion here (invariant I2: chunk/embedding counts must match).
    let embed_fut = Box::pin(embedder::embed_chunks(
        &config.embedding,
        &texts,
        config.retrieval.embed_concurrency,
    ));
    let llm_fut = Box::pin(llm_extractor::extract_metadata(&config.llm_extractor, extracted_text));
    let (embedded, llm_metadata) = tokio::join!(embed_fut, llm_fut);
    let embedded = embedded?;

    Ok((chunks, embedded, llm_metadata))
}

async fn write_object_store(
    objects: &ObjectStoreAdapter,
    uuid: Uuid,
    original_bytes: &[u8],
    extracted_text: &str,
    _chunks: &[TextChunk],
    embedded: &[EmbeddedChunk],
) -> Result<(), CoreError> {
    objects.put_original(uuid, original_bytes.to_vec()).await?;
    objects.put_extracted_text(uuid, extracted_text).await?;

    let blobs: Vec<ChunkBlob> = embedded
        .iter()
        .enumerate()
        .map(|(i, c)| ChunkBlob {
            text: c.text.clone(),
            index: i as i64,
            metadata: None,
        })
        .collect();
    objects.put_chunks(uuid, &blobs).await?;

    let mut doc_index = crate::models::Bm25DocIndex::default();
    for chunk in embedded {
        for (term, count) in tokenizer::term_frequencies(&chunk.text) {
            *doc_index.term_frequencies.entry(term).or_insert(0) += count;
        }
    }
    // BM25_INDEXED: the term-frequency index is derived once here at write
    // time and never recomputed from scratch per query.
    objects.put_bm25_index(uuid, &doc_index).await?;

    Ok(())
}

fn hash_content(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Deletes a document and its object-store blobs, in vector-store-first
/// order so a crash between the two steps leaves only an orphaned
/// object-store prefix — recoverable by the GC sweep — rather than a
/// vector-store row with no backing text.
pub async fn delete_document(
    store: &VectorStore,
    objects: &ObjectStoreAdapter,
    uuid: Uuid,
) -> Result<bool, CoreError> {
    match store.delete_document(uuid).await? {
        Some(deleted_uuid) => {
            objects.delete_prefix(deleted_uuid).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_for_identical_bytes() {
        let a = hash_content(b"hello world");
        let b = hash_content(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_differs_for_different_bytes() {
        assert_ne!(hash_content(b"hello"), hash_content(b"world"));
    }

    #[test]
    fn hash_is_content_only_not_filename() {
        // The content hash intentionally carries no filename information:
        // two uploads with different names but identical bytes dedup.
        let a = hash_content(b"same content");
        let b = hash_content(b"same content");
        assert_eq!(a, b);
    }
}
