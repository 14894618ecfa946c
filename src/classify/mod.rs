//! Query classification: assign a query to LEXICAL/SEMANTIC/MIXED and
//! pick fusion weights for it.

mod hybrid;
mod llm;
mod pattern;

pub use hybrid::HybridClassifier;
pub use llm::LlmClassifier;
pub use pattern::PatternClassifier;

use async_trait::async_trait;

use crate::types::{QueryType, Weights};

/// Shared contract for the pattern/LLM/hybrid classifiers. Never fails the
/// caller outright: implementations degrade to `(Mixed, default weights)`
/// on internal error rather than returning `Err`.
#[async_trait]
pub trait QueryClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> (QueryType, Weights);
}
