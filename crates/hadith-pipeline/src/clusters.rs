use std::collections::HashSet;

use hadith_core::types::EventCluster;

/// Check clusterer output against the final result list.
///
/// Any out-of-range index, primary outside its cluster, repeated index or
/// overlap between clusters rejects the whole set. Clusters with fewer than
/// two members are dropped.
pub fn validate_clusters(clusters: Vec<EventCluster>, result_count: usize) -> Result<Vec<EventCluster>, String> {
    let mut claimed: HashSet<usize> = HashSet::new();
    for (n, cluster) in clusters.iter().enumerate() {
        let mut members: HashSet<usize> = HashSet::new();
        for &idx in &cluster.hadith_indices {
            if idx >= result_count {
                return Err(format!("cluster {} references index {} but there are {} results", n, idx, result_count));
            }
            if !members.insert(idx) {
                return Err(format!("cluster {} lists index {} twice", n, idx));
            }
            if !claimed.insert(idx) {
                return Err(format!("index {} appears in more than one cluster", idx));
            }
        }
        if !members.contains(&cluster.primary_index) {
            return Err(format!("cluster {} primary index {} is not a member", n, cluster.primary_index));
        }
    }
    Ok(clusters.into_iter().filter(|c| c.hadith_indices.len() >= 2).collect())
}
