//! Reciprocal Rank Fusion.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{Bm25Candidate, FusedResult, SideScore, VectorCandidate, Weights};

/// Combine a BM25 list and a vector list into one fused, normalized,
/// deterministically ordered list.
///
/// Both inputs empty returns an empty `Vec`, never a null/absent value.
pub fn rrf_fuse(
    bm25: &[Bm25Candidate],
    vector: &[VectorCandidate],
    weights: Weights,
    k: f64,
) -> Vec<FusedResult> {
    if bm25.is_empty() && vector.is_empty() {
        return Vec::new();
    }

    let missing_rank = (bm25.len().max(vector.len()) + 1) as f64;

    struct Entry {
        accum: f64,
        bm25: SideScore,
        vector: SideScore,
        matched_terms: Vec<String>,
    }

    let mut entries: HashMap<String, Entry> = HashMap::new();

    for (i, cand) in bm25.iter().enumerate() {
        let rank = i + 1;
        let entry = entries.entry(cand.chunk_id.clone()).or_insert(Entry {
            accum: 0.0,
            bm25: SideScore::default(),
            vector: SideScore::default(),
            matched_terms: Vec::new(),
        });
        entry.bm25 = SideScore {
            score: cand.score,
            rank,
        };
        entry.matched_terms = cand.matched_terms.clone();
        entry.accum += weights.bm25 / (k + rank as f64);
    }

    for (i, cand) in vector.iter().enumerate() {
        let rank = i + 1;
        let entry = entries.entry(cand.chunk_id.clone()).or_insert(Entry {
            accum: 0.0,
            bm25: SideScore::default(),
            vector: SideScore::default(),
            matched_terms: Vec::new(),
        });
        entry.vector = SideScore {
            score: cand.score,
            rank,
        };
        entry.accum += weights.semantic / (k + rank as f64);
    }

    for entry in entries.values_mut() {
        let in_bm25 = entry.bm25.rank > 0;
        let in_vector = entry.vector.rank > 0;
        if in_bm25 && !in_vector {
            entry.accum += weights.semantic / (k + missing_rank);
        } else if in_vector && !in_bm25 {
            entry.accum += weights.bm25 / (k + missing_rank);
        }
    }

    let max_score = entries
        .values()
        .map(|e| e.accum)
        .fold(0.0_f64, f64::max);

    let mut results: Vec<FusedResult> = entries
        .into_iter()
        .map(|(chunk_id, entry)| FusedResult {
            chunk_id,
            rrf_score: if max_score > 0.0 {
                entry.accum / max_score
            } else {
                0.0
            },
            bm25: entry.bm25,
            vector: entry.vector,
            in_both_lists: entry.bm25.rank > 0 && entry.vector.rank > 0,
            matched_terms: entry.matched_terms,
        })
        .collect();

    results.sort_by(|a, b| compare_fused(a, b));
    results
}

/// Strict, antisymmetric, total order: higher rrf_score, then both-lists
/// membership, then higher bm25 score, then lexicographically smaller
/// chunk id.
pub fn compare_fused(a: &FusedResult, b: &FusedResult) -> Ordering {
    b.rrf_score
        .partial_cmp(&a.rrf_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.in_both_lists.cmp(&a.in_both_lists))
        .then_with(|| {
            b.bm25_score()
                .partial_cmp(&a.bm25_score())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bm25(id: &str, score: f64) -> Bm25Candidate {
        Bm25Candidate {
            chunk_id: id.to_string(),
            score,
            matched_terms: Vec::new(),
        }
    }

    fn vec_cand(id: &str, score: f64) -> VectorCandidate {
        VectorCandidate {
            chunk_id: id.to_string(),
            score,
        }
    }

    #[test]
    fn both_empty_returns_empty_list() {
        let result = rrf_fuse(&[], &[], Weights::new(0.35, 0.65), 60.0);
        assert!(result.is_empty());
    }

    #[test]
    fn deterministic_rrf_scenario() {
        let bm25_list = vec![bm25("A", 2.5), bm25("B", 2.0), bm25("C", 1.5)];
        let vec_list = vec![vec_cand("C", 0.95), vec_cand("A", 0.90), vec_cand("D", 0.85)];
        let weights = Weights::new(0.35, 0.65);

        let first = rrf_fuse(&bm25_list, &vec_list, weights, 60.0);
        let ids: std::collections::HashSet<&str> =
            first.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C", "D"].into_iter().collect());

        let a = first.iter().find(|r| r.chunk_id == "A").unwrap();
        let c = first.iter().find(|r| r.chunk_id == "C").unwrap();
        assert!(a.in_both_lists);
        assert!(c.in_both_lists);

        assert!((first[0].rrf_score - 1.0).abs() < 1e-9);

        for _ in 0..2 {
            let again = rrf_fuse(&bm25_list, &vec_list, weights, 60.0);
            let ids_a: Vec<&str> = first.iter().map(|r| r.chunk_id.as_str()).collect();
            let ids_b: Vec<&str> = again.iter().map(|r| r.chunk_id.as_str()).collect();
            assert_eq!(ids_a, ids_b);
        }
    }

    #[test]
    fn single_side_only_candidates_get_bounded_credit() {
        let bm25_list = vec![bm25("A", 1.0), bm25("B", 0.5)];
        let vec_list = vec![vec_cand("A", 0.9), vec_cand("D", 0.8)];
        let weights = Weights::new(0.35, 0.65);

        let fused = rrf_fuse(&bm25_list, &vec_list, weights, 60.0);
        let b = fused.iter().find(|r| r.chunk_id == "B").unwrap();
        let d = fused.iter().find(|r| r.chunk_id == "D").unwrap();

        assert_eq!(b.bm25.rank, 2);
        assert_eq!(b.vector.rank, 0);
        assert!(!b.in_both_lists);
        assert!(b.rrf_score > 0.0);

        assert_eq!(d.bm25.rank, 0);
        assert_eq!(d.vector.rank, 2);
        assert!(d.rrf_score > 0.0);
    }

    #[test]
    fn tie_break_is_stable_under_input_permutation() {
        let bm25_list = vec![bm25("X", 1.0), bm25("Y", 1.0)];
        let weights = Weights::new(1.0, 0.0);

        let forward = rrf_fuse(&bm25_list, &[], weights, 60.0);
        let reversed = rrf_fuse(&[bm25("Y", 1.0), bm25("X", 1.0)], &[], weights, 60.0);

        // Same rank and score for both in each run, so lexicographic id
        // decides and matches regardless of input order.
        assert_eq!(forward[0].chunk_id, reversed[0].chunk_id);
    }

    #[test]
    fn all_zero_contributions_stay_zero() {
        let weights = Weights::new(0.0, 0.0);
        let fused = rrf_fuse(&[bm25("A", 1.0)], &[], weights, 60.0);
        assert_eq!(fused[0].rrf_score, 0.0);
    }
}
