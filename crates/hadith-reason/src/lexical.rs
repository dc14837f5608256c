//! Offline event clustering by shared wording.
//!
//! Passages narrating the same event through different chains tend to share
//! long runs of wording. Each text becomes a set of word trigrams; any pair
//! whose Jaccard overlap reaches the threshold is joined, and the joined
//! groups become clusters.
use std::collections::HashSet;

use async_trait::async_trait;
use hadith_core::error::ExternalResult;
use hadith_core::traits::Cluster;
use hadith_core::types::{EventCluster, ScoredResult};
use tracing::debug;

use crate::offline::normalize_words;

const TITLE_WORDS: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct LexicalClusterer {
    threshold: f32,
}

impl LexicalClusterer {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn cluster_sync(&self, results: &[ScoredResult]) -> Vec<EventCluster> {
        if results.len() < 2 {
            return Vec::new();
        }
        let shingles: Vec<HashSet<String>> = results.iter().map(|r| shingles(body(&r.passage.text))).collect();
        let mut sets = DisjointSet::new(results.len());
        for i in 0..results.len() {
            for j in (i + 1)..results.len() {
                let sim = jaccard(&shingles[i], &shingles[j]);
                if sim >= self.threshold {
                    debug!(i, j, sim, "Joined passages");
                    sets.union(i, j);
                }
            }
        }
        // Members come out ascending, so the first is the best-ranked.
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..results.len() {
            let root = sets.find(i);
            match groups.iter_mut().find(|g| sets.find_const(g[0]) == root) {
                Some(group) => group.push(i),
                None => groups.push(vec![i]),
            }
        }
        groups
            .into_iter()
            .filter(|g| g.len() >= 2)
            .map(|members| {
                let primary = members[0];
                EventCluster {
                    event_title: title(&results[primary].passage.text),
                    primary_index: primary,
                    hadith_indices: members,
                    reasoning: Some(format!("shared wording at or above {:.2} trigram overlap", self.threshold)),
                }
            })
            .collect()
    }
}

#[async_trait]
impl Cluster for LexicalClusterer {
    async fn cluster(&self, results: &[ScoredResult]) -> ExternalResult<Vec<EventCluster>> {
        Ok(self.cluster_sync(results))
    }
}

/// Text after the narrator line, when there is one.
fn body(text: &str) -> &str {
    match text.split_once('\n') {
        Some((_, rest)) if !rest.trim().is_empty() => rest,
        _ => text,
    }
}

fn shingles(text: &str) -> HashSet<String> {
    let words = normalize_words(text);
    if words.len() < 3 {
        return std::iter::once(words.join(" ")).filter(|s| !s.is_empty()).collect();
    }
    words.windows(3).map(|w| w.join(" ")).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

fn title(text: &str) -> String {
    let words: Vec<&str> = body(text).split_whitespace().collect();
    let mut title = words.iter().take(TITLE_WORDS).copied().collect::<Vec<_>>().join(" ");
    if words.len() > TITLE_WORDS {
        title.push_str("...");
    }
    title
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        let root = self.find_const(x);
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn find_const(&self, mut x: usize) -> usize {
        while self.parent[x] != x {
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // keep the smaller index as root
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_set_joins_transitively() {
        let mut s = DisjointSet::new(4);
        s.union(3, 1);
        s.union(1, 2);
        assert_eq!(s.find(3), 1);
        assert_eq!(s.find(2), 1);
        assert_eq!(s.find(0), 0);
    }

    #[test]
    fn jaccard_of_identical_and_disjoint_sets() {
        let a = shingles("dip it and then take it out");
        let b = shingles("a completely different sentence about prayer");
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &b), 0.0);
        assert_eq!(jaccard(&HashSet::new(), &HashSet::new()), 0.0);
    }
}
