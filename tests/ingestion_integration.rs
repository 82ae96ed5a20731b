//! Exercises ingest -> query -> get -> delete against a real Postgres
//! instance and an S3-compatible object store (e.g. MinIO). Ignored by
//! default since it needs both running; set `DATABASE_URL` and
//! `RAGFORGE_TEST_S3_ENDPOINT`/`RAGFORGE_TEST_S3_BUCKET` and run with
//! `cargo test -- --ignored` against a disposable database.

use ragforge::config::Config;
use ragforge::db;
use ragforge::ingestion::{self, IngestOutcome, IngestRequest};
use ragforge::migrate;
use ragforge::models::Metadata;
use ragforge::objectstore::ObjectStoreAdapter;
use ragforge::query::{run_query, QueryRequest};
use ragforge::store::VectorStore;

fn test_config() -> Config {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test");
    let toml_src = format!(
        r#"
[database]
url = "{database_url}"

[object_store]
bucket = "{bucket}"
endpoint_url = "{endpoint}"
region = "us-east-1"
prefix = "ragforge-test"

[chunking]
chunk_chars = 500
overlap_chars = 50

[retrieval]
top_k = 5
rerank_candidates = 20
min_similarity = 0.0
embed_concurrency = 4

[server]
bind = "127.0.0.1:0"
"#,
        database_url = database_url,
        bucket = std::env::var("RAGFORGE_TEST_S3_BUCKET").unwrap_or_else(|_| "ragforge-test".to_string()),
        endpoint = std::env::var("RAGFORGE_TEST_S3_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:9000".to_string()),
    );
    toml::from_str(&toml_src).expect("test config must parse")
}

#[tokio::test]
#[ignore] // requires a live Postgres + S3-compatible endpoint
async fn ingest_query_get_and_delete_round_trip() {
    let cfg = test_config();
    migrate::run_migrations(&cfg).await.expect("migrations should run");

    let pool = db::connect(&cfg).await.expect("should connect to postgres");
    let store = VectorStore::new(pool);
    let objects = ObjectStoreAdapter::new(&cfg.object_store).expect("object store should build");

    let mut metadata = Metadata::new();
    metadata.insert("category".to_string(), serde_json::json!("test"));

    let request = IngestRequest {
        filename: "notes.txt".to_string(),
        extension: "txt".to_string(),
        bytes: b"Rust ownership rules prevent data races at compile time.".to_vec(),
        uploaded_by: "integration-test".to_string(),
        metadata,
    };

    let outcome = ingestion::ingest_document(&cfg, &store, &objects, request)
        .await
        .expect("ingestion should succeed");

    let document = match outcome {
        IngestOutcome::Committed(doc) => doc,
        IngestOutcome::Deduplicated(_) => panic!("first ingest of unique content should not dedup"),
    };
    assert_eq!(document.chunk_count, 1);

    let fetched = ragforge::get::get_document(&store, &objects, document.uuid)
        .await
        .expect("document should be retrievable");
    assert_eq!(fetched.chunks.len(), 1);
    assert!(fetched.chunks[0].text.contains("ownership"));

    let results = run_query(
        &cfg,
        &store,
        &objects,
        QueryRequest {
            query: "ownership rules".to_string(),
            hybrid: true,
            rerank: false,
            top_k: Some(5),
            filter: None,
        },
    )
    .await
    .expect("query should succeed");
    assert!(results.iter().any(|r| r.document_uuid == document.uuid));

    let deleted = ingestion::delete_document(&store, &objects, document.uuid)
        .await
        .expect("delete should succeed");
    assert!(deleted);
    assert!(store.find_by_uuid(document.uuid).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // requires a live Postgres + S3-compatible endpoint
async fn duplicate_content_deduplicates_by_hash_not_filename() {
    let cfg = test_config();
    migrate::run_migrations(&cfg).await.expect("migrations should run");

    let pool = db::connect(&cfg).await.expect("should connect to postgres");
    let store = VectorStore::new(pool);
    let objects = ObjectStoreAdapter::new(&cfg.object_store).expect("object store should build");

    let bytes = b"Identical content uploaded under two different names.".to_vec();

    let first = ingestion::ingest_document(
        &cfg,
        &store,
        &objects,
        IngestRequest {
            filename: "first.txt".to_string(),
            extension: "txt".to_string(),
            bytes: bytes.clone(),
            uploaded_by: "integration-test".to_string(),
            metadata: Metadata::new(),
        },
    )
    .await
    .expect("first ingest should succeed");

    let first_doc = match first {
        IngestOutcome::Committed(doc) => doc,
        IngestOutcome::Deduplicated(_) => panic!("first ingest should commit"),
    };

    let second = ingestion::ingest_document(
        &cfg,
        &store,
        &objects,
        IngestRequest {
            filename: "second.txt".to_string(),
            extension: "txt".to_string(),
            bytes,
            uploaded_by: "integration-test".to_string(),
            metadata: Metadata::new(),
        },
    )
    .await
    .expect("second ingest should succeed");

    match second {
        IngestOutcome::Deduplicated(doc) => assert_eq!(doc.uuid, first_doc.uuid),
        IngestOutcome::Committed(_) => panic!("identical content should dedup against the first upload"),
    }

    ingestion::delete_document(&store, &objects, first_doc.uuid).await.ok();
}
