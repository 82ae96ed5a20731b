//! # ragforge
//!
//! A hybrid retrieval-augmented search service over a dual-tier document
//! store. See the [`ragforge`] library crate for the architecture overview.

use clap::{Parser, Subcommand};
use ragforge::config;
use ragforge::objectstore::ObjectStoreAdapter;
use ragforge::store::VectorStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragforge-server", about = "Hybrid RAG search service", version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./config/ragforge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema
    Migrate,

    /// Start the HTTP server
    Serve,

    /// Run a search query from the command line
    Query {
        /// Search query text
        query: String,

        /// Disable BM25 fusion (vector-only search)
        #[arg(long)]
        no_hybrid: bool,

        /// Apply LLM reranking to the results
        #[arg(long)]
        rerank: bool,

        /// Maximum number of results
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Report object-store prefixes with no corresponding document row
    Gc,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Migrate => {
            ragforge::migrate::run_migrations(&cfg).await?;
            println!("database schema is up to date");
        }
        Commands::Serve => {
            let provider = ragforge::embedder::create_provider(&cfg.embedding)?;
            tracing::info!(provider = provider.model_name(), dims = provider.dims(), "embedding provider ready");

            let pool = ragforge::db::connect(&cfg).await?;
            let store = VectorStore::new(pool);
            let objects = ObjectStoreAdapter::new(&cfg.object_store)?;
            ragforge::server::run_server(&cfg, store, objects).await?;
        }
        Commands::Query { query, no_hybrid, rerank, top_k } => {
            let pool = ragforge::db::connect(&cfg).await?;
            let store = VectorStore::new(pool);
            let objects = ObjectStoreAdapter::new(&cfg.object_store)?;
            let request = ragforge::query::QueryRequest {
                query,
                hybrid: !no_hybrid,
                rerank,
                top_k,
                filter: None,
            };
            let results = ragforge::query::run_query(&cfg, &store, &objects, request).await?;
            for (i, result) in results.iter().enumerate() {
                println!("{}. [{:.3}] {} (chunk {})", i + 1, result.similarity, result.filename, result.chunk_index);
                println!("    {}", result.chunk_text.replace('\n', " ").trim());
            }
        }
        Commands::Gc => {
            let pool = ragforge::db::connect(&cfg).await?;
            let store = VectorStore::new(pool);
            let objects = ObjectStoreAdapter::new(&cfg.object_store)?;
            let report = ragforge::gc::reconcile(&store, &objects).await?;
            println!(
                "{} / {} object-store prefixes have no matching document",
                report.orphaned_object_prefixes.len(),
                report.total_object_prefixes
            );
            for uuid in &report.orphaned_object_prefixes {
                println!("  orphaned: {uuid}");
            }
        }
    }

    Ok(())
}
