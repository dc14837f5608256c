use std::collections::HashMap;

use hadith_core::types::ScoredResult;

/// Merge per-collection hit lists into one ranking.
///
/// Non-finite scores are dropped. A `(collection, hadith_id)` seen twice keeps
/// its higher score. Ties on score order by collection name, then id, so the
/// output does not depend on the order collections finished in.
pub fn merge_ranked(per_collection: Vec<Vec<ScoredResult>>, top_k: usize) -> Vec<ScoredResult> {
    let mut by_key: HashMap<(String, i64), ScoredResult> = HashMap::new();
    for hit in per_collection.into_iter().flatten().filter(|h| h.score.is_finite()) {
        let key = (hit.passage.collection.clone(), hit.passage.hadith_id);
        by_key
            .entry(key)
            .and_modify(|old| {
                if hit.score > old.score {
                    *old = hit.clone();
                }
            })
            .or_insert(hit);
    }
    let mut merged: Vec<ScoredResult> = by_key.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.passage.collection.cmp(&b.passage.collection))
            .then_with(|| a.passage.hadith_id.cmp(&b.passage.hadith_id))
    });
    merged.truncate(top_k);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use hadith_core::types::PassageRecord;

    fn hit(collection: &str, id: i64, score: f32) -> ScoredResult {
        ScoredResult::new(PassageRecord { collection: collection.into(), hadith_id: id, ..Default::default() }, score)
    }

    fn keys(results: &[ScoredResult]) -> Vec<(&str, i64)> {
        results.iter().map(|r| r.passage.key()).collect()
    }

    #[test]
    fn ties_break_by_collection_then_id() {
        let merged = merge_ranked(
            vec![
                vec![hit("hadith-muslim", 2, 0.5), hit("hadith-muslim", 1, 0.5)],
                vec![hit("hadith-bukhari", 9, 0.5), hit("hadith-bukhari", 3, 0.9)],
            ],
            10,
        );
        assert_eq!(
            keys(&merged),
            vec![("hadith-bukhari", 3), ("hadith-bukhari", 9), ("hadith-muslim", 1), ("hadith-muslim", 2)]
        );
    }

    #[test]
    fn duplicates_keep_higher_score_and_nan_is_dropped() {
        let merged = merge_ranked(
            vec![vec![hit("a", 1, 0.2), hit("a", 2, f32::NAN)], vec![hit("a", 1, 0.7), hit("b", 1, f32::INFINITY)]],
            10,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 0.7);
    }

    #[test]
    fn truncates_after_merging() {
        let merged = merge_ranked(vec![vec![hit("a", 1, 0.1), hit("a", 2, 0.2)], vec![hit("b", 1, 0.9)]], 2);
        assert_eq!(keys(&merged), vec![("b", 1), ("a", 2)]);
    }
}
