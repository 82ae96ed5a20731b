//! Error taxonomy (§7).
//!
//! Hard errors (validation, store unavailability, persistent embedding
//! failure) propagate to the request boundary and trigger ingestion cleanup
//! before surfacing. LLM extraction and reranking failures are soft by
//! local policy: the component that owns them catches its own failures and
//! degrades (empty metadata, fallback ordering) rather than letting them
//! reach a caller, so `LlmExtractionFailed` and `RerankFailed` are rarely
//! constructed outside that component's own error handling, but they are
//! still part of the taxonomy.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file signature does not match declared format: {0}")]
    SignatureMismatch(String),

    #[error("extraction produced no usable text")]
    EmptyExtraction,

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("document already exists (uploaded as '{existing_filename}'). Skipping duplicate.")]
    DuplicateContent {
        existing_document_id: i64,
        existing_filename: String,
    },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("llm metadata extraction failed: {0}")]
    LlmExtractionFailed(String),

    #[error("reranking failed: {0}")]
    RerankFailed(String),

    #[error("vector or object store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("document {uuid} is in an inconsistent state: {detail}")]
    InconsistentState { uuid: Uuid, detail: String },

    #[error("document not found: {0}")]
    NotFound(String),
}

impl CoreError {
    /// A single human-readable message, per §7's "every failure response
    /// includes a single human-readable message" requirement.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether this error kind maps to a client (4xx) response at the
    /// transport boundary, as opposed to a server (5xx) one. Routing itself
    /// is out of scope (§1); this is the classification a thin HTTP layer
    /// would switch on.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::UnsupportedFormat(_)
                | CoreError::SignatureMismatch(_)
                | CoreError::EmptyExtraction
                | CoreError::InvalidFilter(_)
                | CoreError::NotFound(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
