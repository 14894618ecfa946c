//! queryforge-core: a hybrid BM25 + vector search engine core.
//!
//! Combines lexical (BM25) and dense-vector retrieval via reciprocal rank
//! fusion, with query classification, expansion and decomposition feeding
//! the retrieval step, and reranking, score shaping and filtering applied
//! to the fused results. The engine is written only against the
//! collaborator traits in [`stores`], [`rerank::Reranker`] and
//! [`classify::QueryClassifier`]. Concrete stores, embedding providers,
//! chunkers and indexers are external collaborators outside this crate's
//! scope.

pub mod classify;
pub mod config;
pub mod decompose;
pub mod error;
pub mod expand;
pub mod filter;
pub mod fuse;
pub mod orchestrator;
pub mod rerank;
pub mod shape;
pub mod stores;
pub mod telemetry;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result, SearchError};
pub use orchestrator::{SearchEngine, SearchEngineBuilder};
pub use types::{
    Chunk, ContentType, ContentTypeFilter, SearchFilter, SearchOptions, SearchResult, Symbol,
    Weights,
};
