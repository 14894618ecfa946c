//! Multi-query fusion: merge several sub-queries' fused result lists
//! into one, rewarding chunks that surface under more than one sub-query.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{FusedResult, MultiFusedResult, SideScore, SubQuery};

/// One sub-query's fused result list, paired with the sub-query that
/// produced it.
#[derive(Debug, Clone)]
pub struct SubQueryFusedResults {
    pub sub_query: SubQuery,
    pub results: Vec<FusedResult>,
}

/// Merge sub-query result lists into one consensus-boosted, normalized,
/// deterministically ordered list.
pub fn multi_query_fuse(
    sub_results: &[SubQueryFusedResults],
    k: f64,
    consensus_boost: f64,
) -> Vec<MultiFusedResult> {
    if sub_results.iter().all(|s| s.results.is_empty()) {
        return Vec::new();
    }

    struct Entry {
        accum: f64,
        hits: usize,
        bm25: SideScore,
        vector: SideScore,
        in_both_lists: bool,
        matched_terms: Vec<String>,
    }

    let mut entries: HashMap<String, Entry> = HashMap::new();

    for sub in sub_results {
        let weight = if sub.sub_query.weight > 0.0 {
            sub.sub_query.weight
        } else {
            1.0
        };

        for (i, fused) in sub.results.iter().enumerate() {
            let rank = i + 1;
            let entry = entries
                .entry(fused.chunk_id.clone())
                .or_insert_with(|| Entry {
                    accum: 0.0,
                    hits: 0,
                    bm25: SideScore::default(),
                    vector: SideScore::default(),
                    in_both_lists: false,
                    matched_terms: Vec::new(),
                });

            entry.accum += weight / (k + rank as f64);
            entry.hits += 1;
            entry.in_both_lists |= fused.in_both_lists;

            if fused.bm25.rank > 0 {
                entry.bm25 = merge_side(entry.bm25, fused.bm25);
            }
            if fused.vector.rank > 0 {
                entry.vector = merge_side(entry.vector, fused.vector);
            }
            if entry.matched_terms.is_empty() {
                entry.matched_terms = fused.matched_terms.clone();
            }
        }
    }

    for entry in entries.values_mut() {
        entry.accum *= 1.0 + consensus_boost * (entry.hits as f64 - 1.0);
    }

    let max_score = entries.values().map(|e| e.accum).fold(0.0_f64, f64::max);

    let mut results: Vec<MultiFusedResult> = entries
        .into_iter()
        .map(|(chunk_id, entry)| MultiFusedResult {
            fused: FusedResult {
                chunk_id,
                rrf_score: if max_score > 0.0 {
                    entry.accum / max_score
                } else {
                    0.0
                },
                bm25: entry.bm25,
                vector: entry.vector,
                in_both_lists: entry.in_both_lists,
                matched_terms: entry.matched_terms,
            },
            sub_query_hits: entry.hits,
        })
        .collect();

    results.sort_by(compare_multi_fused);
    results
}

/// Take the maximum score, minimum non-zero rank.
fn merge_side(current: SideScore, incoming: SideScore) -> SideScore {
    let score = current.score.max(incoming.score);
    let rank = match (current.rank, incoming.rank) {
        (0, r) => r,
        (r, 0) => r,
        (a, b) => a.min(b),
    };
    SideScore { score, rank }
}

fn compare_multi_fused(a: &MultiFusedResult, b: &MultiFusedResult) -> Ordering {
    b.fused
        .rrf_score
        .partial_cmp(&a.fused.rrf_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.sub_query_hits.cmp(&a.sub_query_hits))
        .then_with(|| b.fused.in_both_lists.cmp(&a.fused.in_both_lists))
        .then_with(|| {
            b.fused
                .bm25_score()
                .partial_cmp(&a.fused.bm25_score())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.fused.chunk_id.cmp(&b.fused.chunk_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fused(id: &str, rrf_score: f64, bm25_rank: usize, vec_rank: usize) -> FusedResult {
        FusedResult {
            chunk_id: id.to_string(),
            rrf_score,
            bm25: SideScore {
                score: rrf_score,
                rank: bm25_rank,
            },
            vector: SideScore {
                score: rrf_score,
                rank: vec_rank,
            },
            in_both_lists: bm25_rank > 0 && vec_rank > 0,
            matched_terms: Vec::new(),
        }
    }

    #[test]
    fn all_empty_sub_results_return_empty_list() {
        let sub = SubQueryFusedResults {
            sub_query: SubQuery::new("x", 1.0),
            results: vec![],
        };
        assert!(multi_query_fuse(&[sub], 60.0, 0.1).is_empty());
    }

    #[test]
    fn chunk_appearing_in_more_sub_queries_ranks_higher() {
        let sub_a = SubQueryFusedResults {
            sub_query: SubQuery::new("a", 1.0),
            results: vec![fused("X", 1.0, 1, 1), fused("Y", 0.5, 2, 0)],
        };
        let sub_b = SubQueryFusedResults {
            sub_query: SubQuery::new("b", 1.0),
            results: vec![fused("X", 1.0, 1, 1)],
        };

        let merged = multi_query_fuse(&[sub_a, sub_b], 60.0, 0.1);
        let x = merged.iter().find(|r| r.fused.chunk_id == "X").unwrap();
        let y = merged.iter().find(|r| r.fused.chunk_id == "Y").unwrap();

        assert_eq!(x.sub_query_hits, 2);
        assert_eq!(y.sub_query_hits, 1);
        assert!(x.fused.rrf_score > y.fused.rrf_score);
        assert_eq!(merged[0].fused.chunk_id, "X");
    }

    #[test]
    fn non_positive_weight_defaults_to_one() {
        let sub = SubQueryFusedResults {
            sub_query: SubQuery::new("a", 0.0),
            results: vec![fused("X", 1.0, 1, 0)],
        };
        let merged = multi_query_fuse(&[sub], 60.0, 0.1);
        assert!((merged[0].fused.rrf_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn side_scores_merge_by_max_score_and_min_rank() {
        let sub_a = SubQueryFusedResults {
            sub_query: SubQuery::new("a", 1.0),
            results: vec![fused("X", 0.5, 3, 0)],
        };
        let sub_b = SubQueryFusedResults {
            sub_query: SubQuery::new("b", 1.0),
            results: vec![fused("X", 1.0, 1, 0)],
        };
        let merged = multi_query_fuse(&[sub_a, sub_b], 60.0, 0.1);
        let x = &merged[0].fused;
        assert_eq!(x.bm25.rank, 1);
        assert!((x.bm25.score - 1.0).abs() < 1e-9);
    }
}
