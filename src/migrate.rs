//! Database schema migrations.
//!
//! Creates the `documents` and `chunks` tables plus supporting indexes,
//! idempotently. Run via the `migrate` CLI subcommand before first `serve`.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::models::EMBEDDING_DIM;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE EXTENSION IF NOT EXISTS \"uuid-ossp\"")
        .execute(&pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id BIGSERIAL PRIMARY KEY,
            uuid UUID NOT NULL UNIQUE,
            filename TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_size BIGINT NOT NULL,
            content_hash TEXT NOT NULL UNIQUE,
            uploaded_by TEXT NOT NULL,
            uploaded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
            summary TEXT,
            keywords TEXT[] NOT NULL DEFAULT '{}',
            token_count BIGINT NOT NULL DEFAULT 0,
            chunk_count BIGINT NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(&pool)
    .await?;

    let create_chunks = format!(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id BIGSERIAL PRIMARY KEY,
            document_id BIGINT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            chunk_index BIGINT NOT NULL,
            embedding vector({EMBEDDING_DIM}) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE(document_id, chunk_index)
        )
        "#
    );
    sqlx::query(&create_chunks).execute(&pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_keywords ON documents USING GIN(keywords)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_metadata ON documents USING GIN(metadata)")
        .execute(&pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunks_embedding ON chunks \
         USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
