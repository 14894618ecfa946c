//! Collaborator capability interfaces.
//!
//! The engine is written only against these trait objects, never against a
//! concrete store implementation, so the host application can back them
//! with whatever BM25 index, vector index, metadata table and metrics sink
//! it already runs.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{Bm25Candidate, Chunk, VectorCandidate};

/// Lexical (BM25) retrieval store.
#[async_trait]
pub trait Bm25Store: Send + Sync {
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Bm25Candidate>>;

    async fn index(&self, cancel: &CancellationToken, docs: &[(String, String)]) -> Result<()>;
    async fn delete(&self, cancel: &CancellationToken, ids: &[String]) -> Result<()>;
    fn stats(&self) -> Bm25Stats;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Bm25Stats {
    pub document_count: usize,
}

/// Dense-vector retrieval store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(
        &self,
        cancel: &CancellationToken,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<VectorCandidate>>;

    async fn add(
        &self,
        cancel: &CancellationToken,
        ids: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()>;
    async fn delete(&self, cancel: &CancellationToken, ids: &[String]) -> Result<()>;
    fn count(&self) -> usize;
}

/// Embedding generation. The embedding model/provider itself is out of
/// scope; the engine only consumes this contract.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, cancel: &CancellationToken, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(
        &self,
        cancel: &CancellationToken,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>>;
    fn dimensions(&self) -> usize;
    fn model_name(&self) -> &str;
}

/// Chunk metadata store, including the dimension-guard persisted state.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_chunks(&self, cancel: &CancellationToken, ids: &[String]) -> Result<Vec<Chunk>>;
    async fn get_chunks_by_file(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<Vec<Chunk>>;
    async fn save_chunks(&self, cancel: &CancellationToken, chunks: &[Chunk]) -> Result<()>;
    async fn delete_chunks(&self, cancel: &CancellationToken, ids: &[String]) -> Result<()>;

    async fn get_state(&self, cancel: &CancellationToken, key: &str) -> Result<Option<String>>;
    async fn set_state(&self, cancel: &CancellationToken, key: &str, value: &str) -> Result<()>;
}

/// Well-known state keys persisted by the indexer and consulted by the
/// dimension guard.
pub const STATE_INDEX_DIMENSION: &str = "index_dimension";
pub const STATE_INDEX_MODEL: &str = "index_model";

/// Telemetry flush target: incremental upserts keyed by date or term.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn incr_query_type(&self, date: &str, query_type: &str, count: u64) -> Result<()>;
    async fn incr_latency_bucket(&self, date: &str, bucket: &str, count: u64) -> Result<()>;
    async fn incr_term(&self, term: &str, count: u64) -> Result<()>;
    async fn record_zero_result(&self, query: &str) -> Result<()>;
}
