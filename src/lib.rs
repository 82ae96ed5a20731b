//! # ragforge
//!
//! **A hybrid retrieval-augmented search service over a dual-tier document
//! store.**
//!
//! ragforge ingests documents of many formats, splits them into overlapping
//! chunks, embeds and indexes them for both dense (vector) and lexical
//! (BM25) retrieval, and serves hybrid search with optional LLM reranking
//! via an HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────────────┐   ┌───────────────┐
//! │  Upload    │──▶│  Ingestion          │──▶│  Postgres      │
//! │  (bytes)   │   │  Orchestrator       │   │  + pgvector    │
//! └────────────┘   │  validate → extract │   │  (hot tier)    │
//!                   │  → chunk → embed    │   └───────┬───────┘
//!                   │  → llm-extract      │           │
//!                   └──────────┬──────────┘           │
//!                              ▼                       │
//!                   ┌────────────────────┐             │
//!                   │  Object store       │◀────────────┘
//!                   │  (cold tier: text,  │
//!                   │  chunk blobs, BM25) │
//!                   └──────────┬──────────┘
//!                              │
//!          ┌───────────────────┴────────────────────┐
//!          ▼                                         ▼
//! ┌──────────────────┐                     ┌───────────────────┐
//! │ Query             │                    │  HTTP server       │
//! │ Orchestrator       │◀──────────────────│  (Axum)            │
//! │ embed → vector     │                    └───────────────────┘
//! │ search → BM25 →    │
//! │ RRF fuse → rerank  │
//! └──────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. [`validator`] admits an upload through a three-tier gate (extension,
//!    signature, extraction), then [`extractor`] normalizes it to UTF-8 text.
//! 2. [`chunker`] splits the text into overlapping, boundary-snapped windows.
//! 3. [`embedder`] embeds each chunk under bounded concurrency, recovering
//!    from token-limit errors by recursive splitting.
//! 4. [`llm_extractor`] produces a summary and keywords for the whole document.
//! 5. [`ingestion`] orchestrates the above, then commits chunk blobs, the
//!    original bytes, and a [`bm25`] term-frequency index to [`objectstore`],
//!    and the document/chunk rows to [`store`].
//! 6. [`query`] embeds a search query, retrieves vector candidates from
//!    [`store`] under a [`filter`] predicate, optionally fuses them with
//!    BM25 scores via [`rrf`], and optionally reranks with [`reranker`].
//! 7. [`server`] exposes all of the above over HTTP.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | The `CoreError` taxonomy shared across every component |
//! | [`models`] | Core data types: `Document`, `ChunkRow`, `SearchResultItem`, … |
//! | [`validator`] | Three-tier upload admission gate |
//! | [`extractor`] | Multi-format text extraction (PDF, HTML, JSON, XML, …) |
//! | [`tokenizer`] | Stemmed, stopword-filtered tokenization for BM25 |
//! | [`chunker`] | Hierarchical-boundary sliding-window text chunker |
//! | [`embedder`] | Bounded-parallel embedding with token-limit recovery |
//! | [`llm_extractor`] | LLM-based summary and keyword extraction |
//! | [`filter`] | MongoDB-style metadata filter DSL |
//! | [`bm25`] | Simplified document-level BM25 scorer |
//! | [`rrf`] | Reciprocal rank fusion |
//! | [`reranker`] | Batched LLM judge reranking |
//! | [`store`] | Postgres + pgvector vector-store adapter |
//! | [`objectstore`] | S3-compatible object-store adapter |
//! | [`ingestion`] | Ingestion orchestrator state machine |
//! | [`query`] | Query orchestrator |
//! | [`get`] | Document retrieval by id |
//! | [`health`] | Vector-store / object-store health reporting |
//! | [`gc`] | Read-only orphaned-blob reconciliation sweep |
//! | [`server`] | HTTP transport (Axum) |
//! | [`db`] | Postgres connection pool |
//! | [`migrate`] | Database schema migrations (idempotent) |

pub mod bm25;
pub mod chunker;
pub mod config;
pub mod db;
pub mod embedder;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod gc;
pub mod get;
pub mod health;
pub mod ingestion;
pub mod llm_extractor;
pub mod migrate;
pub mod models;
pub mod objectstore;
pub mod query;
pub mod reranker;
pub mod rrf;
pub mod server;
pub mod store;
pub mod tokenizer;
pub mod validator;
