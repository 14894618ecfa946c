//! LLM-backed classifier: a single prompt to an external text-generation
//! service (an Ollama-compatible `/api/generate` endpoint), robust to noisy
//! responses and never fatal on failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::QueryClassifier;
use crate::types::{QueryType, Weights};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

/// Classifier backed by a remote LLM. Construct via [`LlmClassifier::new`];
/// every call is wrapped in the configured timeout by the caller
/// ([`HybridClassifier`](super::HybridClassifier)).
pub struct LlmClassifier {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl LlmClassifier {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            timeout,
        }
    }

    /// GET `/api/tags`, used as an availability probe by callers that want
    /// to skip the LLM path entirely when the service is down.
    pub async fn healthy(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match tokio::time::timeout(self.timeout, self.client.get(&url).send()).await {
            Ok(Ok(resp)) => resp.status().is_success(),
            _ => false,
        }
    }

    async fn classify_inner(&self, query: &str) -> Option<QueryType> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(query),
            stream: false,
        };

        let send = self.client.post(&url).json(&body).send();
        let response = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(resp)) if resp.status().is_success() => resp,
            Ok(Ok(resp)) => {
                tracing::debug!("classifier endpoint returned HTTP {}", resp.status());
                return None;
            }
            Ok(Err(e)) => {
                tracing::debug!("classifier request failed: {}", e);
                return None;
            }
            Err(_) => {
                tracing::debug!("classifier request timed out after {:?}", self.timeout);
                return None;
            }
        };

        let parsed: GenerateResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("classifier response was not valid JSON: {}", e);
                return None;
            }
        };

        Some(parse_query_type(&parsed.response))
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        "Classify the following search query as exactly one of LEXICAL, SEMANTIC, or MIXED. \
         Respond with only that single word.\n\nQuery: {}\n",
        query
    )
}

/// Any response that doesn't contain one of the three expected tokens
/// defaults to MIXED; the call must never fail because of an unexpected
/// model output.
fn parse_query_type(response: &str) -> QueryType {
    let upper = response.to_uppercase();
    if upper.contains("LEXICAL") {
        QueryType::Lexical
    } else if upper.contains("SEMANTIC") {
        QueryType::Semantic
    } else {
        QueryType::Mixed
    }
}

#[async_trait]
impl QueryClassifier for LlmClassifier {
    async fn classify(&self, query: &str) -> (QueryType, Weights) {
        let query_type = self.classify_inner(query).await.unwrap_or(QueryType::Mixed);
        (query_type, query_type.canonical_weights())
    }
}

impl LlmClassifier {
    /// Like `classify_inner`, but exposed to `HybridClassifier` so it can
    /// tell "the LLM answered, ambiguously" (falls back to `Mixed` here)
    /// apart from "the LLM was unreachable" (`None`, let the caller fall
    /// through to the pattern classifier instead).
    pub(super) async fn try_classify(&self, query: &str) -> Option<(QueryType, Weights)> {
        let query_type = self.classify_inner(query).await?;
        Some((query_type, query_type.canonical_weights()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_text_defaults_to_mixed() {
        assert_eq!(parse_query_type("I'm not sure which category fits best"), QueryType::Mixed);
        assert_eq!(parse_query_type(""), QueryType::Mixed);
        assert_eq!(parse_query_type("garbage output"), QueryType::Mixed);
    }

    #[test]
    fn substring_match_is_intentionally_permissive() {
        // A response mentioning "lexically" still resolves via substring
        // match; the classifier trades precision for never failing outright.
        assert_eq!(parse_query_type("this query reads lexically"), QueryType::Lexical);
    }

    #[test]
    fn expected_tokens_are_recognized_case_insensitively() {
        assert_eq!(parse_query_type("lexical"), QueryType::Lexical);
        assert_eq!(parse_query_type("SEMANTIC"), QueryType::Semantic);
        assert_eq!(parse_query_type(" Mixed \n"), QueryType::Mixed);
    }
}
