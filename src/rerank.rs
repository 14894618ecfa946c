//! Reranker adapter: an optional cross-encoder pass that overwrites
//! fused RRF scores with a relevance score conditioned on the full query
//! and document text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::RerankerConfig;
use crate::error::Result;

/// One document submitted for reranking, keyed by its position in the
/// caller's candidate list so results can be mapped back.
#[derive(Debug, Clone)]
pub struct RerankDocument {
    pub original_index: usize,
    pub text: String,
}

/// A reranked document: its original index, the reranker's score, and the
/// text it scored (carried through so callers don't need a second lookup).
#[derive(Debug, Clone)]
pub struct RerankedDocument {
    pub original_index: usize,
    pub score: f64,
    pub text: String,
}

/// Cross-encoder reranker contract. Treated as unavailable on any failure
/// and bypassed by the orchestrator; never a fatal error.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        cancel: &CancellationToken,
        query: &str,
        documents: &[RerankDocument],
        top_k: usize,
    ) -> Result<Vec<RerankedDocument>>;

    async fn available(&self, cancel: &CancellationToken) -> bool;
}

/// Always-available default: returns decreasing synthetic scores
/// (1.0, 0.99, ...) preserving the caller's input order. Used when no
/// reranker collaborator is configured, or as a degrade target.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(
        &self,
        _cancel: &CancellationToken,
        _query: &str,
        documents: &[RerankDocument],
        top_k: usize,
    ) -> Result<Vec<RerankedDocument>> {
        let n = documents.len().min(top_k.max(1));
        Ok(documents
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, doc)| RerankedDocument {
                original_index: doc.original_index,
                score: 1.0 - (i as f64) * 0.01,
                text: doc.text.clone(),
            })
            .collect())
    }

    async fn available(&self, _cancel: &CancellationToken) -> bool {
        true
    }
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    query: &'a str,
    documents: &'a [String],
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    scores: Vec<DocumentScore>,
}

#[derive(Debug, Deserialize)]
struct DocumentScore {
    index: usize,
    score: f64,
}

/// HTTP-backed cross-encoder reranker, calling a generic `/rerank` scoring
/// endpoint. Health-gated via `/health`; both calls are wrapped in the
/// configured timeout and degrade to "unavailable" rather than erroring.
pub struct HttpReranker {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpReranker {
    pub fn new(config: &RerankerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone().unwrap_or_default(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        _cancel: &CancellationToken,
        query: &str,
        documents: &[RerankDocument],
        top_k: usize,
    ) -> Result<Vec<RerankedDocument>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let request = ScoreRequest {
            query,
            documents: &texts,
            top_k,
        };

        let url = format!("{}/rerank", self.base_url.trim_end_matches('/'));
        let result = tokio::time::timeout(
            self.timeout,
            self.client.post(&url).json(&request).send(),
        )
        .await;

        let response = match result {
            Ok(Ok(resp)) if resp.status().is_success() => resp,
            _ => return Ok(Vec::new()),
        };

        let parsed: ScoreResponse = match response.json().await {
            Ok(p) => p,
            Err(_) => return Ok(Vec::new()),
        };

        let mut reranked: Vec<RerankedDocument> = parsed
            .scores
            .into_iter()
            .filter_map(|s| {
                let doc = documents.get(s.index)?;
                Some(RerankedDocument {
                    original_index: doc.original_index,
                    score: s.score,
                    text: doc.text.clone(),
                })
            })
            .collect();

        reranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        reranked.truncate(top_k.max(1));
        Ok(reranked)
    }

    async fn available(&self, _cancel: &CancellationToken) -> bool {
        if self.base_url.is_empty() {
            return false;
        }
        let url = format!("{}/health", self.base_url.trim_end_matches('/'));
        matches!(
            tokio::time::timeout(self.timeout, self.client.get(&url).send()).await,
            Ok(Ok(resp)) if resp.status().is_success()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(n: usize) -> Vec<RerankDocument> {
        (0..n)
            .map(|i| RerankDocument {
                original_index: i,
                text: format!("doc {i}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn no_op_reranker_returns_decreasing_scores_in_input_order() {
        let reranker = NoOpReranker;
        let cancel = CancellationToken::new();
        let result = reranker.rerank(&cancel, "q", &docs(3), 3).await.unwrap();
        assert_eq!(result.len(), 3);
        assert!(result[0].score > result[1].score);
        assert!(result[1].score > result[2].score);
        assert_eq!(result[0].original_index, 0);
    }

    #[tokio::test]
    async fn no_op_reranker_respects_top_k() {
        let reranker = NoOpReranker;
        let cancel = CancellationToken::new();
        let result = reranker.rerank(&cancel, "q", &docs(5), 2).await.unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn no_op_reranker_is_always_available() {
        let reranker = NoOpReranker;
        let cancel = CancellationToken::new();
        assert!(reranker.available(&cancel).await);
    }

    #[tokio::test]
    async fn http_reranker_with_empty_base_url_is_unavailable() {
        let config = RerankerConfig {
            base_url: None,
            ..RerankerConfig::default()
        };
        let reranker = HttpReranker::new(&config);
        let cancel = CancellationToken::new();
        assert!(!reranker.available(&cancel).await);
    }
}
