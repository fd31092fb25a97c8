//! Command line for the Adjacent retrieval store.
//!
//! # Usage
//!
//! ```bash
//! adjacent-rag --storage ./rag index --file notes.md --file todo.md
//! adjacent-rag --storage ./rag query "What are the deployment blockers?" --top-k 3
//! adjacent-rag --storage ./rag inspect
//! adjacent-rag demo
//! ```
//!
//! Logs go to stderr and are controlled with `RUST_LOG`.

use std::path::PathBuf;

use adjacent_embeddings::{EmbeddingProvider, HashingProvider};
use adjacent_retrieval::{EmbeddingProviderType, RagAgent, Retriever, RetrieverConfig};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEPLOYMENT_CHUNK: &str = "Deployment and infra blockers: we need access to the staging \
    database, CI pipelines are flaky, and container images are missing runtime libs.";
const ROADMAP_CHUNK: &str = "Product roadmap and feature ideas: focus on onboarding, analytics, \
    and improving the user profile experience over the next two sprints.";
const DEMO_QUERY: &str = "What are the deployment blockers?";

#[derive(Parser, Debug)]
#[command(name = "adjacent-rag")]
#[command(about = "Index text and retrieve the most similar chunks")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the chunk list and index
    #[arg(long, env = "ADJACENT_RAG_STORAGE", global = true)]
    storage: Option<PathBuf>,

    /// Embedding provider: openai or hashing
    #[arg(long, env = "ADJACENT_RAG_PROVIDER", global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and persist the index from files or inline text
    Index {
        /// File to index; repeat to concatenate several files
        #[arg(
            long = "file",
            required_unless_present = "text",
            conflicts_with = "text"
        )]
        files: Vec<PathBuf>,

        /// Inline text to index
        #[arg(long)]
        text: Option<String>,
    },

    /// Retrieve the chunks most similar to a query
    Query {
        /// Query text
        text: String,

        /// Number of results (configured default when omitted)
        #[arg(long)]
        top_k: Option<usize>,

        /// Print results as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Load the stored artifacts and describe them
    Inspect,

    /// Index two topics in a scratch directory and check the ranking
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Demo => run_demo().await,
        Command::Index { files, text } => {
            let agent = cli.agent().await?;
            let summary = match text {
                Some(text) => agent.index_text(text).await?,
                None => agent.index_files(files.as_slice()).await?,
            };
            println!(
                "Indexed {} chunks (dimension {}) into {}",
                summary.chunks,
                summary.dimension,
                agent.retriever().store().root().display()
            );
            Ok(())
        }
        Command::Query { text, top_k, json } => {
            let agent = cli.agent().await?;
            let results = match top_k {
                Some(top_k) => agent.retrieve(text, *top_k).await?,
                None => agent.retrieve_default(text).await?,
            };
            if *json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in &results {
                    println!("{:.4}\t{}", result.distance, result.chunk);
                }
            }
            Ok(())
        }
        Command::Inspect => {
            let retriever = Retriever::new(cli.retriever_config().await?)?;
            let summary = retriever.load().await?;
            let store = retriever.store();
            println!("chunks:     {}", summary.chunks);
            println!("dimension:  {}", summary.dimension);
            println!("chunk list: {}", store.chunks_path().display());
            println!("index:      {}", store.index_path().display());
            Ok(())
        }
    }
}

impl Cli {
    /// Configuration from `--config`, with the storage and provider overrides applied.
    async fn retriever_config(&self) -> Result<RetrieverConfig> {
        let mut config = match &self.config {
            Some(path) => RetrieverConfig::load(path)
                .await
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => RetrieverConfig::default(),
        };
        if let Some(storage) = &self.storage {
            config.storage_dir = storage.clone();
        }
        if let Some(provider) = &self.provider {
            config.embedding.provider = provider.parse::<EmbeddingProviderType>()?;
        }
        config.validate()?;
        Ok(config)
    }

    async fn agent(&self) -> Result<RagAgent> {
        Ok(RagAgent::from_config(self.retriever_config().await?)?)
    }
}

async fn run_demo() -> Result<()> {
    let scratch = tempfile::tempdir().context("failed to create scratch directory")?;
    info!("Running demo in {}", scratch.path().display());

    let provider = HashingProvider::new();
    let retriever = Retriever::new(RetrieverConfig::new(scratch.path()))?;

    let chunks = vec![DEPLOYMENT_CHUNK.to_string(), ROADMAP_CHUNK.to_string()];
    let embeddings = provider.embed_batch(&chunks).await?;
    retriever.index_chunks(chunks, embeddings).await?;

    let query = provider.embed(DEMO_QUERY).await?;
    let results = retriever.query(&query, 2).await?;

    println!("Query: {DEMO_QUERY}");
    for (rank, result) in results.iter().enumerate() {
        println!("{}. [{:.4}] {}", rank + 1, result.distance, result.chunk);
    }

    match results.first() {
        Some(top) if top.chunk == DEPLOYMENT_CHUNK => {
            println!("OK: the deployment chunk ranks first");
            Ok(())
        }
        Some(top) => bail!("expected the deployment chunk first, got: {}", top.chunk),
        None => bail!("query returned no results"),
    }
}
