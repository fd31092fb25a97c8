//! End-to-end tests for indexing, persistence, and retrieval.
//!
//! These tests verify that:
//! - Deployment questions rank the deployment chunk above the roadmap chunk
//! - Indexed files are concatenated and chunked in order
//! - A fresh retriever over the same storage answers identically
//! - Missing and corrupt storage surface distinct errors

use std::path::PathBuf;
use std::sync::Arc;

use adjacent_retrieval::{
    ChunkingConfig, EmbeddingProvider, HashingProvider, RagAgent, RetrievalError, Retriever,
    RetrieverConfig,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const DEPLOYMENT_QUERY: &str = "What are the deployment blockers?";

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn retriever(dir: &TempDir, chunking: ChunkingConfig) -> Retriever {
    Retriever::new(RetrieverConfig::new(dir.path()).with_chunking(chunking)).unwrap()
}

#[tokio::test]
async fn test_deployment_query_ranks_deployment_chunk_first() {
    let temp_dir = TempDir::new().unwrap();
    let retriever = retriever(&temp_dir, ChunkingConfig::default());
    let provider = HashingProvider::new();

    let chunks = vec![
        "deployment blockers and staging access".to_string(),
        "product roadmap and onboarding".to_string(),
    ];
    let embeddings = provider.embed_batch(&chunks).await.unwrap();
    retriever.index_chunks(chunks, embeddings).await.unwrap();

    let query = provider.embed(DEPLOYMENT_QUERY).await.unwrap();
    let results = retriever.query(&query, 1).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].position, 0);
    assert_eq!(results[0].chunk, "deployment blockers and staging access");

    let everything = retriever.query(&query, usize::MAX).await.unwrap();
    let positions: Vec<usize> = everything.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![0, 1]);
}

#[tokio::test]
async fn test_agent_indexes_fixture_files() {
    let temp_dir = TempDir::new().unwrap();
    // Each fixture is exactly one window, so chunk boundaries follow the files.
    let agent = RagAgent::new(
        retriever(&temp_dir, ChunkingConfig::new(25, 0)),
        Arc::new(HashingProvider::new()),
    );

    let summary = agent
        .index_files(&[
            fixtures_dir().join("infra-notes.md"),
            fixtures_dir().join("product-notes.md"),
        ])
        .await
        .unwrap();
    assert_eq!(summary.chunks, 2);
    assert_eq!(summary.dimension, 384);

    let results = agent.retrieve(DEPLOYMENT_QUERY, 1).await.unwrap();
    assert!(results[0].chunk.starts_with("# Infra sync"));

    let results = agent
        .retrieve("Which roadmap features focus on onboarding?", 2)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].chunk.starts_with("# Product sync"));
    assert!(results[0].distance <= results[1].distance);
}

#[tokio::test]
async fn test_fresh_retriever_reloads_identical_results() {
    let temp_dir = TempDir::new().unwrap();
    let provider = HashingProvider::with_dimension(128).unwrap();
    let text = std::fs::read_to_string(fixtures_dir().join("infra-notes.md")).unwrap();

    let first = retriever(&temp_dir, ChunkingConfig::new(8, 2));
    first.index_text(&text, &provider).await.unwrap();
    let query = provider.embed("staging database access").await.unwrap();
    let expected = first.query(&query, 3).await.unwrap();

    let second = retriever(&temp_dir, ChunkingConfig::new(8, 2));
    assert!(!second.is_built().await);
    let actual = second.query(&query, 3).await.unwrap();

    assert!(second.is_built().await);
    assert_eq!(actual, expected);
    assert_eq!(second.chunks().await, first.chunks().await);
}

#[tokio::test]
async fn test_query_on_empty_storage_is_not_built() {
    let temp_dir = TempDir::new().unwrap();
    let retriever = retriever(&temp_dir, ChunkingConfig::default());

    let err = retriever.query(&[0.0; 384], 5).await.unwrap_err();
    assert!(matches!(err, RetrievalError::IndexNotBuilt));

    // An explicit load reports what is missing instead.
    let err = retriever.load().await.unwrap_err();
    assert!(matches!(err, RetrievalError::NotFound(_)));
}

#[tokio::test]
async fn test_query_on_corrupt_storage_is_corrupt() {
    let temp_dir = TempDir::new().unwrap();
    let provider = HashingProvider::new();

    let writer = retriever(&temp_dir, ChunkingConfig::default());
    writer
        .index_text("deployment blockers and staging access", &provider)
        .await
        .unwrap();
    std::fs::write(writer.store().index_path(), b"not an index").unwrap();

    let reader = retriever(&temp_dir, ChunkingConfig::default());
    let query = provider.embed(DEPLOYMENT_QUERY).await.unwrap();
    let err = reader.query(&query, 1).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Corrupt(_)));
}

#[tokio::test]
async fn test_concurrent_queries_share_resident_index() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(HashingProvider::new());
    let text = std::fs::read_to_string(fixtures_dir().join("product-notes.md")).unwrap();

    let writer = retriever(&temp_dir, ChunkingConfig::new(6, 1));
    writer.index_text(&text, provider.as_ref()).await.unwrap();

    // Every task races the first auto-load of a fresh instance.
    let reader = Arc::new(retriever(&temp_dir, ChunkingConfig::new(6, 1)));
    let query = provider.embed("onboarding analytics").await.unwrap();
    let expected = writer.query(&query, 2).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let reader = Arc::clone(&reader);
        let query = query.clone();
        handles.push(tokio::spawn(async move { reader.query(&query, 2).await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), expected);
    }
}
