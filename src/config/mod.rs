//! Engine configuration
//!
//! Loading configuration from disk or environment is an external
//! collaborator's job; this module only defines the typed, serializable
//! shape and its defaults, following `LLMServiceConfig`'s pattern of
//! env-var-overridable defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_weights: WeightsConfig,
    pub rrf_constant: f64,
    pub search_timeout_secs: u64,
    pub classifier: ClassifierConfig,
    pub expander: ExpanderConfig,
    pub decomposer: DecomposerConfig,
    pub multi_rrf: MultiRrfConfig,
    pub reranker: RerankerConfig,
    pub telemetry: TelemetryConfig,
    pub adjacent_chunks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            default_weights: WeightsConfig::default(),
            rrf_constant: 60.0,
            search_timeout_secs: 5,
            classifier: ClassifierConfig::default(),
            expander: ExpanderConfig::default(),
            decomposer: DecomposerConfig::default(),
            multi_rrf: MultiRrfConfig::default(),
            reranker: RerankerConfig::default(),
            telemetry: TelemetryConfig::default(),
            adjacent_chunks: 0,
        }
    }
}

impl EngineConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

/// Plain (bm25, semantic) weight pair, serializable for config files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    pub bm25: f64,
    pub semantic: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            bm25: 0.35,
            semantic: 0.65,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Base URL of the LLM endpoint used for classification, e.g. an Ollama
    /// server. `None` means the hybrid classifier falls straight through to
    /// the pattern classifier.
    pub llm_base_url: Option<String>,
    pub llm_model: String,
    pub timeout_secs: u64,
    pub cache_size: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            llm_base_url: std::env::var("QUERYFORGE_CLASSIFIER_URL").ok(),
            llm_model: std::env::var("QUERYFORGE_CLASSIFIER_MODEL")
                .unwrap_or_else(|_| "llama3.1".to_string()),
            timeout_secs: 2,
            cache_size: 10_000,
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpanderConfig {
    pub max_expansions: usize,
    pub include_casing_variants: bool,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            max_expansions: 3,
            include_casing_variants: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposerConfig {
    pub max_sub_queries: usize,
    pub parallelism: usize,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            max_sub_queries: 8,
            parallelism: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiRrfConfig {
    pub consensus_boost: f64,
}

impl Default for MultiRrfConfig {
    fn default() -> Self {
        Self {
            consensus_boost: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    /// Base URL of the cross-encoder reranking service. `None` disables
    /// remote reranking and the no-op reranker is used instead.
    pub base_url: Option<String>,
    pub pool_size: usize,
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("QUERYFORGE_RERANKER_URL").ok(),
            pool_size: 50,
            timeout_secs: 30,
        }
    }
}

impl RerankerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub top_terms_capacity: usize,
    pub zero_results_capacity: usize,
    pub recent_queries_capacity: usize,
    pub recent_embeddings_capacity: usize,
    pub similarity_threshold: f32,
    pub flush_interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            top_terms_capacity: 100,
            zero_results_capacity: 100,
            recent_queries_capacity: 500,
            recent_embeddings_capacity: 10,
            similarity_threshold: 0.95,
            flush_interval_secs: 0,
        }
    }
}

impl TelemetryConfig {
    /// `None` when flushing is disabled (a `0` interval).
    pub fn flush_interval(&self) -> Option<Duration> {
        if self.flush_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.flush_interval_secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.default_limit, 10);
        assert_eq!(cfg.max_limit, 100);
        assert_eq!(cfg.default_weights.bm25, 0.35);
        assert_eq!(cfg.default_weights.semantic, 0.65);
        assert_eq!(cfg.rrf_constant, 60.0);
        assert_eq!(cfg.classifier.cache_size, 10_000);
        assert_eq!(cfg.expander.max_expansions, 3);
        assert_eq!(cfg.decomposer.max_sub_queries, 8);
        assert_eq!(cfg.decomposer.parallelism, 4);
        assert_eq!(cfg.multi_rrf.consensus_boost, 0.1);
        assert_eq!(cfg.reranker.pool_size, 50);
        assert_eq!(cfg.telemetry.top_terms_capacity, 100);
        assert_eq!(cfg.telemetry.recent_embeddings_capacity, 10);
        assert!(cfg.telemetry.flush_interval().is_none());
    }
}
