//! Search orchestrator: the engine's single entry point, wiring
//! classification, retrieval, fusion, reranking, enrichment and shaping
//! into one `search` call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::classify::{HybridClassifier, QueryClassifier};
use crate::config::EngineConfig;
use crate::decompose::QueryDecomposer;
use crate::error::{Result, SearchError};
use crate::expand::QueryExpander;
use crate::filter;
use crate::fuse::{multi_query_fuse, rrf_fuse, SubQueryFusedResults};
use crate::rerank::{NoOpReranker, RerankDocument, Reranker};
use crate::shape::shape_score;
use crate::stores::{
    Bm25Store, Embedder, MetadataStore, MetricsStore, VectorStore, STATE_INDEX_DIMENSION,
};
use crate::telemetry::TelemetryCore;
use crate::types::{
    Chunk, ContentTypeFilter, ExplainInfo, FusedResult, MultiFusedResult, QueryType,
    SearchFilter, SearchOptions, SearchResult, SubQuery, Weights,
};

const ADJACENT_CONTEXT_TOP_N: usize = 5;

/// Builds a [`SearchEngine`], refusing to construct when a required
/// collaborator is missing (the "nil-dependency" error kind).
pub struct SearchEngineBuilder {
    config: EngineConfig,
    bm25_store: Option<Arc<dyn Bm25Store>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    embedder: Option<Arc<dyn Embedder>>,
    metadata_store: Option<Arc<dyn MetadataStore>>,
    classifier: Option<Arc<dyn QueryClassifier>>,
    reranker: Option<Arc<dyn Reranker>>,
    metrics_store: Option<Arc<dyn MetricsStore>>,
    instruction_prefix: String,
}

impl SearchEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            bm25_store: None,
            vector_store: None,
            embedder: None,
            metadata_store: None,
            classifier: None,
            reranker: None,
            metrics_store: None,
            instruction_prefix: String::new(),
        }
    }

    pub fn bm25_store(mut self, store: Arc<dyn Bm25Store>) -> Self {
        self.bm25_store = Some(store);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn metadata_store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.metadata_store = Some(store);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn QueryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn metrics_store(mut self, store: Arc<dyn MetricsStore>) -> Self {
        self.metrics_store = Some(store);
        self
    }

    /// Prefix prepended to the original query before embedding, for
    /// instruction-tuned embedding models (e.g. `"search_query: "`).
    pub fn instruction_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.instruction_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<SearchEngine> {
        let bm25_store = self
            .bm25_store
            .ok_or(SearchError::NilDependency("bm25_store"))?;
        let vector_store = self
            .vector_store
            .ok_or(SearchError::NilDependency("vector_store"))?;
        let embedder = self
            .embedder
            .ok_or(SearchError::NilDependency("embedder"))?;
        let metadata_store = self
            .metadata_store
            .ok_or(SearchError::NilDependency("metadata_store"))?;

        let classifier = self.classifier.unwrap_or_else(|| {
            Arc::new(HybridClassifier::new(None, self.config.classifier.cache_size))
        });
        let reranker = self
            .reranker
            .unwrap_or_else(|| Arc::new(NoOpReranker) as Arc<dyn Reranker>);
        let telemetry = Arc::new(TelemetryCore::new(
            self.config.telemetry.clone(),
            self.metrics_store,
        ));
        let expander = QueryExpander::new(&self.config.expander);
        let decomposer = QueryDecomposer::new();

        Ok(SearchEngine {
            config: self.config,
            bm25_store,
            vector_store,
            embedder,
            metadata_store,
            classifier,
            reranker,
            telemetry,
            expander,
            decomposer,
            instruction_prefix: self.instruction_prefix,
            index_lock: RwLock::new(()),
            flush_cancel: CancellationToken::new(),
        })
    }
}

/// The hybrid search engine. Holds an `Arc` to every collaborator, so it is
/// cheap to clone behind an `Arc<SearchEngine>` for concurrent callers.
pub struct SearchEngine {
    config: EngineConfig,
    bm25_store: Arc<dyn Bm25Store>,
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    metadata_store: Arc<dyn MetadataStore>,
    classifier: Arc<dyn QueryClassifier>,
    reranker: Arc<dyn Reranker>,
    telemetry: Arc<TelemetryCore>,
    expander: QueryExpander,
    decomposer: QueryDecomposer,
    instruction_prefix: String,
    index_lock: RwLock<()>,
    flush_cancel: CancellationToken,
}

impl SearchEngine {
    pub fn telemetry(&self) -> &TelemetryCore {
        &self.telemetry
    }

    /// Spawns the periodic telemetry flush ticker, if `telemetry.flush_interval_secs`
    /// is nonzero. Returns `None` when flushing is disabled, in which case
    /// there is nothing to await or cancel. Call once per engine instance;
    /// pair with [`SearchEngine::shutdown`] so the final flush isn't lost.
    pub fn start(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        let interval = self.telemetry.flush_interval()?;
        let engine = Arc::clone(self);
        let cancel = self.flush_cancel.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = engine.telemetry.flush().await {
                            tracing::warn!("periodic telemetry flush failed: {}", e);
                        }
                    }
                    _ = cancel.cancelled() => break,
                }
            }
        }))
    }

    /// Stops the flush ticker (if running) and performs telemetry's final
    /// flush. Safe to call even when [`SearchEngine::start`] was never
    /// invoked (flushing disabled, or the caller manages flushing itself).
    pub async fn shutdown(&self) -> Result<()> {
        self.flush_cancel.cancel();
        self.telemetry.close().await
    }

    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
        cancel: CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let _read_guard = self.index_lock.read().await;

        let weights_overridden = options.weights.is_some();
        let (query_type, weights) = match options.weights {
            Some(w) => (QueryType::Mixed, w),
            None => self.classifier.classify(trimmed).await,
        };

        let limit = if options.limit == 0 {
            self.config.default_limit
        } else {
            options.limit.clamp(1, self.config.max_limit)
        };

        let decomposable = self.decomposer.should_decompose(trimmed);

        let (fused, sub_queries, dimension_mismatch, filter_override, embedding) = if decomposable
        {
            self.multi_query_search(
                trimmed,
                weights,
                weights_overridden,
                limit,
                &options.filter,
                &cancel,
            )
            .await?
        } else {
            let (fused, mismatch, embedding) = self
                .single_query_search(trimmed, weights, weights_overridden, limit, &cancel)
                .await?;
            let multi_fused = fused
                .into_iter()
                .map(|f| MultiFusedResult {
                    fused: f,
                    sub_query_hits: 1,
                })
                .collect();
            (multi_fused, Vec::new(), mismatch, None, embedding)
        };

        let mut effective_options = options;
        if let Some(hint) = filter_override {
            effective_options.filter.content_type = hint;
        }

        let mut results = self
            .enrich(
                fused,
                &effective_options,
                &cancel,
                query_type,
                weights,
                limit,
                &sub_queries,
                dimension_mismatch,
                trimmed,
            )
            .await?;

        results.truncate(limit);

        let latency = started.elapsed();
        self.record_telemetry(trimmed, query_type, latency, results.len(), embedding.as_deref());

        Ok(results)
    }

    async fn single_query_search(
        &self,
        query: &str,
        weights: Weights,
        weights_overridden: bool,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<(Vec<FusedResult>, bool, Option<Vec<f32>>)> {
        let dimension_mismatch = self.dimension_mismatch(cancel).await;
        let bm25_only = dimension_mismatch;
        let effective_weights = if bm25_only && !weights_overridden {
            Weights::new(1.0, 0.0)
        } else {
            weights
        };

        let expanded = self.expander.expand(query);
        let bm25_limit = limit * 2;

        let (bm25_result, vector_result) = if bm25_only {
            let bm25_result = self.bm25_store.search(cancel, &expanded, bm25_limit).await;
            (bm25_result, Ok((Vec::new(), None)))
        } else {
            let embed_query = format!("{}{}", self.instruction_prefix, query);
            tokio::join!(
                self.bm25_store.search(cancel, &expanded, bm25_limit),
                self.vector_search(&embed_query, bm25_limit, cancel),
            )
        };

        let (bm25_candidates, (vector_candidates, embedding)) = match (bm25_result, vector_result)
        {
            (Ok(b), Ok(v)) => (b, v),
            (Ok(b), Err(_)) => (b, (Vec::new(), None)),
            (Err(_), Ok(v)) => (Vec::new(), v),
            (Err(be), Err(ve)) => {
                return Err(SearchError::BothSidesFailed {
                    bm25: be.to_string(),
                    vector: ve.to_string(),
                })
            }
        };

        let fused = rrf_fuse(
            &bm25_candidates,
            &vector_candidates,
            effective_weights,
            self.config.rrf_constant,
        );
        Ok((fused, dimension_mismatch, embedding))
    }

    /// Embeds `text` and searches the vector store with it, surfacing the
    /// embedding alongside the candidates so callers can feed it to
    /// telemetry's semantic-repetition tracker without a second embed call.
    async fn vector_search(
        &self,
        text: &str,
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<(Vec<crate::types::VectorCandidate>, Option<Vec<f32>>)> {
        let embedding = self.embedder.embed(cancel, text).await?;
        let candidates = self.vector_store.search(cancel, &embedding, k).await?;
        Ok((candidates, Some(embedding)))
    }

    async fn dimension_mismatch(&self, cancel: &CancellationToken) -> bool {
        let stored = self
            .metadata_store
            .get_state(cancel, STATE_INDEX_DIMENSION)
            .await
            .ok()
            .flatten();
        match stored.and_then(|s| s.parse::<usize>().ok()) {
            Some(stored_dim) => stored_dim != self.embedder.dimensions(),
            None => false,
        }
    }

    /// Returns the fused multi-query results, the sub-queries that were
    /// actually run, the dimension-mismatch flag, a content-type filter
    /// hint to apply downstream when the caller left their own filter at
    /// the default and at least one sub-query carried one, and the first
    /// sub-query embedding computed (used as the representative embedding
    /// for telemetry's semantic-repetition tracker, since no single
    /// embedding of the whole decomposed query ever gets computed).
    #[allow(clippy::too_many_arguments)]
    async fn multi_query_search(
        &self,
        query: &str,
        weights: Weights,
        weights_overridden: bool,
        limit: usize,
        caller_filter: &SearchFilter,
        cancel: &CancellationToken,
    ) -> Result<(
        Vec<MultiFusedResult>,
        Vec<SubQuery>,
        bool,
        Option<ContentTypeFilter>,
        Option<Vec<f32>>,
    )> {
        let mut sub_queries = self.decomposer.decompose(query);
        sub_queries.truncate(self.config.decomposer.max_sub_queries);

        let filter_override = if is_default_filter(caller_filter) {
            sub_queries
                .iter()
                .find_map(|s| s.filter_hint.as_deref())
                .map(ContentTypeFilter::from)
        } else {
            None
        };

        let dimension_mismatch = self.dimension_mismatch(cancel).await;
        let semaphore = Arc::new(Semaphore::new(self.config.decomposer.parallelism.max(1)));
        let raised_limit = limit.max(50);

        let tasks = sub_queries.clone().into_iter().map(|sub_query| {
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            async move {
                let _permit = semaphore.acquire().await;
                self.run_sub_query(sub_query, weights, weights_overridden, raised_limit, &cancel)
                    .await
            }
        });

        let outcomes: Vec<(SubQueryFusedResults, Option<Vec<f32>>)> =
            futures::future::join_all(tasks).await;

        let embedding = outcomes.iter().find_map(|(_, e)| e.clone());
        let sub_results: Vec<SubQueryFusedResults> =
            outcomes.into_iter().map(|(r, _)| r).collect();

        let multi_fused = multi_query_fuse(
            &sub_results,
            self.config.rrf_constant,
            self.config.multi_rrf.consensus_boost,
        );
        Ok((multi_fused, sub_queries, dimension_mismatch, filter_override, embedding))
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_sub_query(
        &self,
        sub_query: SubQuery,
        weights: Weights,
        weights_overridden: bool,
        limit: usize,
        cancel: &CancellationToken,
    ) -> (SubQueryFusedResults, Option<Vec<f32>>) {
        match self
            .single_query_search(&sub_query.text, weights, weights_overridden, limit, cancel)
            .await
        {
            Ok((fused, _, embedding)) => {
                (SubQueryFusedResults { sub_query, results: fused }, embedding)
            }
            Err(e) => {
                tracing::warn!("sub-query '{}' failed: {}", sub_query.text, e);
                (SubQueryFusedResults { sub_query, results: Vec::new() }, None)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn enrich(
        &self,
        fused: Vec<MultiFusedResult>,
        options: &SearchOptions,
        cancel: &CancellationToken,
        query_type: QueryType,
        weights: Weights,
        limit: usize,
        sub_queries: &[SubQuery],
        dimension_mismatch: bool,
        query: &str,
    ) -> Result<Vec<SearchResult>> {
        if fused.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = fused.iter().map(|f| f.fused.chunk_id.clone()).collect();
        let chunks = self.metadata_store.get_chunks(cancel, &ids).await?;
        let mut by_id: HashMap<String, Chunk> =
            chunks.into_iter().map(|c| (c.id.clone(), c)).collect();

        let bm25_count = fused.iter().filter(|f| f.fused.bm25.rank > 0).count();
        let vector_count = fused.iter().filter(|f| f.fused.vector.rank > 0).count();

        let rerank_candidates: Vec<RerankDocument> = fused
            .iter()
            .enumerate()
            .filter_map(|(i, f)| {
                by_id
                    .get(&f.fused.chunk_id)
                    .map(|c| RerankDocument { original_index: i, text: c.content.clone() })
            })
            .collect();

        let mut rrf_scores: Vec<f64> = fused.iter().map(|f| f.fused.rrf_score).collect();
        if rerank_candidates.len() >= 2 && self.reranker.available(cancel).await {
            let pool = self.config.reranker.pool_size.max(1);
            if let Ok(reranked) = self
                .reranker
                .rerank(cancel, query, &rerank_candidates, pool)
                .await
            {
                for doc in reranked {
                    if let Some(slot) = rrf_scores.get_mut(doc.original_index) {
                        *slot = doc.score;
                    }
                }
            }
        }

        let mut results: Vec<SearchResult> = fused
            .into_iter()
            .enumerate()
            .filter_map(|(i, multi)| {
                let chunk = by_id.remove(&multi.fused.chunk_id)?;
                let mut result = SearchResult::from_multi_fused(chunk, multi);
                result.rrf_score = rrf_scores[i];
                Some(result)
            })
            .collect();

        // Reflect the reranked order before picking the top N for adjacent
        // context, so enrichment runs on the post-rerank winners rather than
        // the original fuse order.
        results.sort_by(|a, b| b.rrf_score.partial_cmp(&a.rrf_score).unwrap_or(std::cmp::Ordering::Equal));

        if options.adjacent_chunks > 0 {
            for result in results.iter_mut().take(ADJACENT_CONTEXT_TOP_N) {
                let siblings = self
                    .metadata_store
                    .get_chunks_by_file(cancel, &result.chunk.path)
                    .await
                    .unwrap_or_default();
                let (before, after) = adjacent_context(
                    &result.chunk,
                    &siblings,
                    options.adjacent_chunks,
                );
                result.adjacent_before = before;
                result.adjacent_after = after;
            }
        }

        for result in &mut results {
            result.rrf_score = shape_score(&result.chunk.path, result.rrf_score);
        }
        results.sort_by(|a, b| b.rrf_score.partial_cmp(&a.rrf_score).unwrap_or(std::cmp::Ordering::Equal));

        results.retain(|r| filter::matches(&r.chunk, &options.filter));
        results.truncate(limit);

        if options.explain {
            if let Some(first) = results.first_mut() {
                first.explain = Some(ExplainInfo {
                    bm25_candidate_count: bm25_count,
                    vector_candidate_count: vector_count,
                    weights,
                    rrf_k: self.config.rrf_constant,
                    dimension_mismatch,
                    bm25_only: dimension_mismatch,
                    sub_queries: sub_queries.to_vec(),
                });
            }
        }

        Ok(results)
    }

    fn record_telemetry(
        &self,
        query: &str,
        query_type: QueryType,
        latency: Duration,
        result_count: usize,
        embedding: Option<&[f32]>,
    ) {
        self.telemetry.record(query, query_type, latency, result_count, embedding);
    }
}

fn is_default_filter(filter: &SearchFilter) -> bool {
    matches!(filter.content_type, ContentTypeFilter::All)
        && filter.language.is_none()
        && filter.symbol_type.is_none()
        && filter.scopes.is_empty()
}

/// Chunks from the same file strictly before/after `target`, nearest first,
/// capped to `cap` per side.
fn adjacent_context(target: &Chunk, siblings: &[Chunk], cap: usize) -> (Vec<Chunk>, Vec<Chunk>) {
    let mut before: Vec<&Chunk> = siblings
        .iter()
        .filter(|c| c.id != target.id && c.end_line < target.start_line)
        .collect();
    before.sort_by_key(|c| std::cmp::Reverse(c.end_line));
    before.truncate(cap);
    before.reverse();

    let mut after: Vec<&Chunk> = siblings
        .iter()
        .filter(|c| c.id != target.id && c.start_line > target.end_line)
        .collect();
    after.sort_by_key(|c| c.start_line);
    after.truncate(cap);

    (
        before.into_iter().cloned().collect(),
        after.into_iter().cloned().collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentType, Symbol};
    use std::collections::HashMap as Map;

    fn chunk(id: &str, start: u32, end: u32) -> Chunk {
        Chunk {
            id: id.to_string(),
            path: "pkg/file.go".to_string(),
            content_type: ContentType::Code,
            language: Some("go".to_string()),
            start_line: start,
            end_line: end,
            content: String::new(),
            symbols: Vec::<Symbol>::new(),
            metadata: Map::new(),
        }
    }

    #[test]
    fn adjacent_context_picks_nearest_on_each_side() {
        let target = chunk("b", 20, 30);
        let siblings = vec![
            chunk("a", 1, 10),
            chunk("a2", 11, 19),
            chunk("b", 20, 30),
            chunk("c", 31, 40),
            chunk("d", 41, 50),
        ];
        let (before, after) = adjacent_context(&target, &siblings, 1);
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].id, "a2");
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, "c");
    }

    #[test]
    fn default_filter_detection() {
        assert!(is_default_filter(&SearchFilter::default()));
        let mut f = SearchFilter::default();
        f.language = Some("go".to_string());
        assert!(!is_default_filter(&f));
    }
}
