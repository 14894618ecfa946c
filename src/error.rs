//! Error types for the search engine core

use thiserror::Error;

/// Result type alias using [`SearchError`]
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error type alias for convenience
pub type Error = SearchError;

/// Errors surfaced by the engine. Most collaborator failures degrade the
/// query (see the orchestrator) rather than reaching the caller as one of
/// these; a variant here means the engine could not produce any answer.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("bm25 store error: {0}")]
    Bm25Store(String),

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("both retrieval sides failed: bm25={bm25}, vector={vector}")]
    BothSidesFailed { bm25: String, vector: String },

    #[error("metadata store error: {0}")]
    Metadata(String),

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("reranker error: {0}")]
    Reranker(String),

    #[error("metrics store error: {0}")]
    Metrics(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("missing required collaborator: {0}")]
    NilDependency(&'static str),

    #[error("operation cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
