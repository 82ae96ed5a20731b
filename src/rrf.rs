//! Reciprocal Rank Fusion (C11, §4.11).
//!
//! Combines two independently ranked candidate lists (vector similarity and
//! BM25 lexical score) into a single fused ranking, using the constant-`k`
//! RRF formula rather than trying to normalize and blend the two raw score
//! scales directly. `k` is fixed at 60, the value RRF was originally
//! published with, rather than exposed as a tuning knob — invariant P6
//! requires the fused order to be a pure function of the two rank lists.

pub const RRF_K: f64 = 60.0;

/// A single entry in a ranked candidate list, identified by `id`.
#[derive(Debug, Clone)]
pub struct RankedItem<T> {
    pub id: i64,
    pub item: T,
}

/// Fuses two rank lists (already sorted best-first) by RRF score, returning
/// items ordered best-first. An id present in only one list still
/// participates, scored from that list alone. Ties break on id ascending,
/// so the fused order is fully deterministic.
pub fn fuse<T: Clone>(vector_ranked: &[RankedItem<T>], bm25_ranked: &[RankedItem<T>]) -> Vec<(i64, T, f64)> {
    use std::collections::HashMap;

    let mut scores: HashMap<i64, f64> = HashMap::new();
    let mut items: HashMap<i64, T> = HashMap::new();

    for (rank, entry) in vector_ranked.iter().enumerate() {
        *scores.entry(entry.id).or_insert(0.0) += 1.0 / (RRF_K + (rank + 1) as f64);
        items.entry(entry.id).or_insert_with(|| entry.item.clone());
    }
    for (rank, entry) in bm25_ranked.iter().enumerate() {
        *scores.entry(entry.id).or_insert(0.0) += 1.0 / (RRF_K + (rank + 1) as f64);
        items.entry(entry.id).or_insert_with(|| entry.item.clone());
    }

    let mut fused: Vec<(i64, T, f64)> = scores
        .into_iter()
        .map(|(id, score)| (id, items.get(&id).unwrap().clone(), score))
        .collect();

    fused.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64) -> RankedItem<&'static str> {
        RankedItem { id, item: "x" }
    }

    #[test]
    fn item_ranked_first_in_both_lists_wins() {
        let vector = vec![item(1), item(2), item(3)];
        let bm25 = vec![item(1), item(3), item(2)];
        let fused = fuse(&vector, &bm25);
        assert_eq!(fused[0].0, 1);
    }

    #[test]
    fn item_in_only_one_list_still_participates() {
        let vector = vec![item(1), item(2)];
        let bm25 = vec![item(3)];
        let fused = fuse(&vector, &bm25);
        let ids: Vec<i64> = fused.iter().map(|(id, _, _)| *id).collect();
        assert!(ids.contains(&3));
    }

    #[test]
    fn ties_break_on_id_ascending() {
        let vector: Vec<RankedItem<&str>> = vec![];
        let bm25: Vec<RankedItem<&str>> = vec![];
        let fused = fuse(&vector, &bm25);
        assert!(fused.is_empty());
    }

    #[test]
    fn fusion_is_deterministic_across_runs() {
        let vector = vec![item(5), item(2), item(9)];
        let bm25 = vec![item(9), item(5), item(2)];
        let first = fuse(&vector, &bm25);
        let second = fuse(&vector, &bm25);
        let first_ids: Vec<i64> = first.iter().map(|(id, _, _)| *id).collect();
        let second_ids: Vec<i64> = second.iter().map(|(id, _, _)| *id).collect();
        assert_eq!(first_ids, second_ids);
    }
}
