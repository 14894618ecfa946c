//! Telemetry core: bounded, lock-protected query observability.
//!
//! All state lives behind one internal mutex so the recorder can be shared
//! behind a plain `&self` across concurrent callers. Recording is in-memory
//! only; a periodic flush drains accumulated deltas to the metrics store
//! collaborator.

mod bucket;

pub use bucket::LatencyBucket;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;

use crate::config::TelemetryConfig;
use crate::stores::MetricsStore;
use crate::types::QueryType;

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn tokenize_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(|s| s.to_lowercase())
        .filter(|s| s.chars().count() >= 3)
        .collect()
}

/// Point-in-time copy of all counters, safe to read without holding any
/// lock; readers never observe partially updated state.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub per_day_query_types: HashMap<String, HashMap<String, u64>>,
    pub per_day_latency: HashMap<String, HashMap<LatencyBucket, u64>>,
    pub top_terms: Vec<(String, u64)>,
    pub zero_result_queries: Vec<String>,
    pub total_queries: u64,
    pub unique_query_count: u64,
    pub exact_repeat_count: u64,
    pub similar_query_count: u64,
}

struct FlushDeltas {
    query_types: HashMap<(String, String), u64>,
    latency: HashMap<(String, LatencyBucket), u64>,
    terms: HashMap<String, u64>,
    zero_results: Vec<String>,
}

impl FlushDeltas {
    fn new() -> Self {
        Self {
            query_types: HashMap::new(),
            latency: HashMap::new(),
            terms: HashMap::new(),
            zero_results: Vec::new(),
        }
    }
}

struct State {
    per_day_query_types: HashMap<String, HashMap<String, u64>>,
    per_day_latency: HashMap<String, HashMap<LatencyBucket, u64>>,
    top_terms: LruCache<String, u64>,
    zero_result_buffer: VecDeque<String>,
    recent_queries: VecDeque<String>,
    recent_embeddings: VecDeque<Vec<f32>>,
    total_queries: u64,
    unique_query_count: u64,
    exact_repeat_count: u64,
    similar_query_count: u64,
    pending: FlushDeltas,
}

/// Bounded telemetry recorder for query-time observability.
pub struct TelemetryCore {
    config: TelemetryConfig,
    metrics_store: Option<Arc<dyn MetricsStore>>,
    state: Mutex<State>,
    closed: AtomicBool,
}

impl TelemetryCore {
    pub fn new(config: TelemetryConfig, metrics_store: Option<Arc<dyn MetricsStore>>) -> Self {
        let top_terms_capacity =
            std::num::NonZeroUsize::new(config.top_terms_capacity.max(1)).unwrap();
        Self {
            state: Mutex::new(State {
                per_day_query_types: HashMap::new(),
                per_day_latency: HashMap::new(),
                top_terms: LruCache::new(top_terms_capacity),
                zero_result_buffer: VecDeque::with_capacity(config.zero_results_capacity),
                recent_queries: VecDeque::with_capacity(config.recent_queries_capacity),
                recent_embeddings: VecDeque::with_capacity(config.recent_embeddings_capacity),
                total_queries: 0,
                unique_query_count: 0,
                exact_repeat_count: 0,
                similar_query_count: 0,
                pending: FlushDeltas::new(),
            }),
            config,
            metrics_store,
            closed: AtomicBool::new(false),
        }
    }

    /// Record one completed query. In-memory only, no I/O, so it is safe to
    /// call from the orchestrator's fire-and-forget path. A no-op once
    /// `close` has run.
    pub fn record(
        &self,
        query: &str,
        query_type: QueryType,
        latency: Duration,
        result_count: usize,
        embedding: Option<&[f32]>,
    ) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        let date = today();
        let query_type_label = format!("{query_type:?}");
        *state
            .per_day_query_types
            .entry(date.clone())
            .or_default()
            .entry(query_type_label.clone())
            .or_insert(0) += 1;
        *state
            .pending
            .query_types
            .entry((date.clone(), query_type_label))
            .or_insert(0) += 1;

        let bucket = LatencyBucket::for_latency(latency);
        *state
            .per_day_latency
            .entry(date.clone())
            .or_default()
            .entry(bucket)
            .or_insert(0) += 1;
        *state
            .pending
            .latency
            .entry((date, bucket))
            .or_insert(0) += 1;

        for term in tokenize_terms(query) {
            let count = state.top_terms.get(&term).copied().unwrap_or(0) + 1;
            state.top_terms.put(term.clone(), count);
            *state.pending.terms.entry(term).or_insert(0) += 1;
        }

        if result_count == 0 {
            let zero_cap = self.config.zero_results_capacity;
            if state.zero_result_buffer.len() >= zero_cap.max(1) {
                state.zero_result_buffer.pop_front();
            }
            state.zero_result_buffer.push_back(query.to_string());
            state.pending.zero_results.push(query.to_string());
        }

        state.total_queries += 1;

        let key = query.trim().to_lowercase();
        let is_repeat = state.recent_queries.contains(&key);
        if is_repeat {
            state.exact_repeat_count += 1;
        } else {
            state.unique_query_count += 1;
        }
        let recent_cap = self.config.recent_queries_capacity;
        if state.recent_queries.len() >= recent_cap.max(1) {
            state.recent_queries.pop_front();
        }
        state.recent_queries.push_back(key);

        if let Some(embedding) = embedding {
            if !embedding.is_empty() {
                let threshold = self.config.similarity_threshold;
                let is_similar = state
                    .recent_embeddings
                    .iter()
                    .any(|e| cosine_similarity(e, embedding) > threshold);
                if is_similar {
                    state.similar_query_count += 1;
                }
                let embed_cap = self.config.recent_embeddings_capacity;
                if state.recent_embeddings.len() >= embed_cap.max(1) {
                    state.recent_embeddings.pop_front();
                }
                state.recent_embeddings.push_back(embedding.to_vec());
            }
        }
    }

    /// Copy all counters into a fresh, independently readable snapshot.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let Ok(state) = self.state.lock() else {
            return TelemetrySnapshot::default();
        };
        TelemetrySnapshot {
            per_day_query_types: state.per_day_query_types.clone(),
            per_day_latency: state.per_day_latency.clone(),
            top_terms: state
                .top_terms
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            zero_result_queries: state.zero_result_buffer.iter().cloned().collect(),
            total_queries: state.total_queries,
            unique_query_count: state.unique_query_count,
            exact_repeat_count: state.exact_repeat_count,
            similar_query_count: state.similar_query_count,
        }
    }

    /// Drain accumulated deltas to the metrics store, if one is configured.
    /// A no-op (not an error) once closed.
    pub async fn flush(&self) -> crate::error::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        let Some(store) = &self.metrics_store else {
            return Ok(());
        };

        let deltas = {
            let Ok(mut state) = self.state.lock() else {
                return Ok(());
            };
            std::mem::replace(&mut state.pending, FlushDeltas::new())
        };

        for ((date, query_type), count) in deltas.query_types {
            store.incr_query_type(&date, &query_type, count).await?;
        }
        for ((date, bucket), count) in deltas.latency {
            store.incr_latency_bucket(&date, bucket.label(), count).await?;
        }
        for (term, count) in deltas.terms {
            store.incr_term(&term, count).await?;
        }
        for query in deltas.zero_results {
            store.record_zero_result(&query).await?;
        }
        Ok(())
    }

    /// Final flush, then mark the recorder closed. Any subsequent `record`
    /// is a silent no-op.
    pub async fn close(&self) -> crate::error::Result<()> {
        self.flush().await?;
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    pub fn flush_interval(&self) -> Option<Duration> {
        self.config.flush_interval()
    }
}
