//! Core data model: chunks, candidates, fused and enriched results.

use std::collections::HashMap;

/// Content-type tag of an indexed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Code,
    Markdown,
    Text,
}

/// A symbol extracted from a chunk (function, class, etc).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub symbol_type: String,
    pub name: String,
}

/// An indexed unit supplied by the metadata store collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub path: String,
    pub content_type: ContentType,
    pub language: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub content: String,
    pub symbols: Vec<Symbol>,
    /// Opaque annotations a caller wants carried through enrichment
    /// untouched; the engine never inspects these.
    pub metadata: HashMap<String, String>,
}

/// A lexical (BM25) hit, ordered by score descending, 1-indexed rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Bm25Candidate {
    pub chunk_id: String,
    pub score: f64,
    pub matched_terms: Vec<String>,
}

/// A dense-retrieval hit, ordered by similarity descending, 1-indexed rank.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorCandidate {
    pub chunk_id: String,
    pub score: f64,
}

/// One side's contribution after fusion: its preserved score and rank.
/// A rank of `0` means "not present in that list".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideScore {
    pub score: f64,
    pub rank: usize,
}

/// The result of reciprocal-rank-fusing a BM25 list and a vector list.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    pub chunk_id: String,
    pub rrf_score: f64,
    pub bm25: SideScore,
    pub vector: SideScore,
    pub in_both_lists: bool,
    pub matched_terms: Vec<String>,
}

impl FusedResult {
    pub fn bm25_score(&self) -> f64 {
        self.bm25.score
    }
}

/// A [`FusedResult`] extended with the number of sub-queries that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiFusedResult {
    pub fused: FusedResult,
    pub sub_query_hits: usize,
}

/// A contiguous run of highlighted text, byte offsets into `Chunk::content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
}

/// Structured per-query explanation attached to the first result only.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExplainInfo {
    pub bm25_candidate_count: usize,
    pub vector_candidate_count: usize,
    pub weights: Weights,
    pub rrf_k: f64,
    pub dimension_mismatch: bool,
    pub bm25_only: bool,
    pub sub_queries: Vec<SubQuery>,
}

/// Fused result enriched with its chunk, highlights, adjacent context and
/// (optionally) an explanation.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub rrf_score: f64,
    pub bm25: SideScore,
    pub vector: SideScore,
    pub in_both_lists: bool,
    pub matched_terms: Vec<String>,
    pub sub_query_hits: usize,
    pub highlights: Vec<HighlightRange>,
    pub adjacent_before: Vec<Chunk>,
    pub adjacent_after: Vec<Chunk>,
    pub explain: Option<ExplainInfo>,
}

impl SearchResult {
    pub fn from_fused(chunk: Chunk, fused: FusedResult) -> Self {
        Self {
            chunk,
            rrf_score: fused.rrf_score,
            bm25: fused.bm25,
            vector: fused.vector,
            in_both_lists: fused.in_both_lists,
            matched_terms: fused.matched_terms,
            sub_query_hits: 0,
            highlights: Vec::new(),
            adjacent_before: Vec::new(),
            adjacent_after: Vec::new(),
            explain: None,
        }
    }

    pub fn from_multi_fused(chunk: Chunk, multi: MultiFusedResult) -> Self {
        let mut result = Self::from_fused(chunk, multi.fused);
        result.sub_query_hits = multi.sub_query_hits;
        result
    }
}

/// Bm25/semantic weight pair. Not required to sum to 1; either side may be
/// disabled by setting its weight to 0.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Weights {
    pub bm25: f64,
    pub semantic: f64,
}

impl Weights {
    pub const fn new(bm25: f64, semantic: f64) -> Self {
        Self { bm25, semantic }
    }
}

/// Query classification, mapping to canonical weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum QueryType {
    Lexical,
    Semantic,
    Mixed,
}

impl QueryType {
    /// Canonical fusion weights for this classification.
    pub fn canonical_weights(self) -> Weights {
        match self {
            QueryType::Lexical => Weights::new(0.85, 0.15),
            QueryType::Semantic => Weights::new(0.20, 0.80),
            QueryType::Mixed => Weights::new(0.35, 0.65),
        }
    }
}

/// A weighted sub-query produced by the decomposer, optionally carrying a
/// content-type filter hint.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SubQuery {
    pub text: String,
    pub weight: f64,
    pub filter_hint: Option<String>,
}

impl SubQuery {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight,
            filter_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.filter_hint = Some(hint.into());
        self
    }
}

/// Caller-supplied search options. Defaults (limit clamping, weight
/// selection) are applied by the orchestrator, not here.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub weights: Option<Weights>,
    pub filter: SearchFilter,
    pub adjacent_chunks: usize,
    pub explain: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 0,
            weights: None,
            filter: SearchFilter::default(),
            adjacent_chunks: 0,
            explain: false,
        }
    }
}

/// AND-composed filter predicates.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub content_type: ContentTypeFilter,
    pub language: Option<String>,
    pub symbol_type: Option<String>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentTypeFilter {
    #[default]
    All,
    Code,
    Docs,
}

impl From<&str> for ContentTypeFilter {
    fn from(value: &str) -> Self {
        match value {
            "code" => ContentTypeFilter::Code,
            "docs" => ContentTypeFilter::Docs,
            _ => ContentTypeFilter::All,
        }
    }
}
