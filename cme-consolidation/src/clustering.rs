//! Pure clustering math: cosine similarity matrix, greedy near-clique
//! clustering, and centroid/topic selection. No storage or I/O here so
//! this stays unit-testable without a database.

use std::collections::BTreeSet;

use cme_core::memory::{Memory, Metadata};

/// One candidate memory fed into clustering: its id, semantic embedding,
/// and enough of its own data to pick a centroid and a topic afterward.
pub struct ClusterCandidate<'a> {
    pub memory: &'a Memory,
    pub metadata: Option<&'a Metadata>,
    pub embedding: &'a [f32],
}

pub struct Cluster {
    pub member_indices: Vec<usize>,
    pub centroid_index: usize,
    pub mean_similarity: f64,
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

/// Upper-triangular cosine similarity matrix over `candidates`, keyed by
/// sorted index pair `(min, max)`. Built in parallel over the upper
/// triangle since pairwise cosine is the dominant cost for large batches.
pub fn similarity_matrix(candidates: &[ClusterCandidate]) -> std::collections::HashMap<(usize, usize), f64> {
    use rayon::prelude::*;

    let n = candidates.len();
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();

    pairs
        .into_par_iter()
        .map(|(i, j)| {
            let sim = cosine(candidates[i].embedding, candidates[j].embedding);
            ((i, j), sim)
        })
        .collect()
}

/// Greedy near-clique clustering: rank candidates by neighbour count
/// (descending), then grow each unused seed's cluster by admitting only
/// candidates similar to *every* current member — producing near-cliques
/// rather than chains. Clusters smaller than `min_cluster_size` are
/// dropped and their members remain unused (eligible for a later run).
pub fn cluster(
    candidates: &[ClusterCandidate],
    similarities: &std::collections::HashMap<(usize, usize), f64>,
    threshold: f64,
    min_cluster_size: usize,
) -> Vec<Cluster> {
    let sim = |i: usize, j: usize| -> f64 {
        if i == j {
            return 1.0;
        }
        let key = if i < j { (i, j) } else { (j, i) };
        similarities.get(&key).copied().unwrap_or(0.0)
    };

    let n = candidates.len();
    let mut neighbour_count: Vec<(usize, usize)> = (0..n)
        .map(|i| {
            let count = (0..n).filter(|&j| j != i && sim(i, j) >= threshold).count();
            (i, count)
        })
        .collect();
    neighbour_count.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut used = vec![false; n];
    let mut clusters = Vec::new();

    for &(seed, _) in &neighbour_count {
        if used[seed] {
            continue;
        }
        let mut members = vec![seed];
        for j in 0..n {
            if j == seed || used[j] || members.contains(&j) {
                continue;
            }
            if members.iter().all(|&m| sim(m, j) >= threshold) {
                members.push(j);
            }
        }

        if members.len() < min_cluster_size {
            continue;
        }

        for &m in &members {
            used[m] = true;
        }

        let mut best_centroid = members[0];
        let mut best_mean = f64::MIN;
        let mut cluster_mean_total = 0.0;
        let mut pair_count = 0usize;

        for &m in &members {
            let mean_to_others: f64 = members
                .iter()
                .filter(|&&other| other != m)
                .map(|&other| sim(m, other))
                .sum::<f64>()
                / (members.len() - 1).max(1) as f64;
            if mean_to_others > best_mean {
                best_mean = mean_to_others;
                best_centroid = m;
            }
        }
        for a in 0..members.len() {
            for b in (a + 1)..members.len() {
                cluster_mean_total += sim(members[a], members[b]);
                pair_count += 1;
            }
        }
        let mean_similarity = if pair_count > 0 { cluster_mean_total / pair_count as f64 } else { 1.0 };

        clusters.push(Cluster {
            member_indices: members,
            centroid_index: best_centroid,
            mean_similarity,
        });
    }

    clusters
}

/// A short topic string for a cluster: the centroid's top metadata
/// keywords if it has any, otherwise its first handful of content words.
pub fn extract_topic(centroid: &ClusterCandidate) -> String {
    if let Some(metadata) = centroid.metadata {
        let top: BTreeSet<&String> = metadata.keywords.iter().take(5).collect();
        if !top.is_empty() {
            return top.into_iter().cloned().collect::<Vec<_>>().join(", ");
        }
    }
    centroid
        .memory
        .content
        .split_whitespace()
        .take(6)
        .collect::<Vec<_>>()
        .join(" ")
}
