//! Waypoint-link proposal and depth-bounded BFS graph-view assembly (C5).
//! SQLite (via `cme-storage`) is the system of record for `memory_links`;
//! this crate never holds a live graph, only the one it assembles
//! transiently from rows fetched hop-by-hop.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;

use cme_core::config::GraphConfig;
use cme_core::errors::CortexResult;
use cme_core::memory::{Link, LinkType};

/// Nodes and edges reachable from the seed set, assembled by `bfs_graph`.
#[derive(Debug, Clone, Default)]
pub struct GraphView {
    pub nodes: Vec<String>,
    pub edges: Vec<Link>,
}

/// Propose up to `config.max_waypoints_per_memory` outgoing links from a
/// newly written memory to its most similar/temporally-adjacent
/// candidates, above `config.waypoint_similarity_threshold`. Never
/// proposes a self-loop.
pub fn propose_waypoint_links(
    new_id: &str,
    created_at: DateTime<Utc>,
    candidates: &[(String, f64)],
    config: &GraphConfig,
) -> Vec<Link> {
    let mut scored: Vec<&(String, f64)> = candidates
        .iter()
        .filter(|(id, score)| id != new_id && *score >= config.waypoint_similarity_threshold)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(config.max_waypoints_per_memory);

    scored
        .into_iter()
        .map(|(id, score)| Link {
            source_id: new_id.to_string(),
            target_id: id.clone(),
            link_type: LinkType::Semantic,
            weight: score.clamp(0.0, 1.0),
            created_at,
            traversal_count: 0,
        })
        .collect()
}

/// Symmetric `consolidation` edges of `config.consolidation_link_weight`
/// between a newly created summary and each of its originals.
pub fn consolidation_links(
    summary_id: &str,
    original_ids: &[String],
    created_at: DateTime<Utc>,
    config: &GraphConfig,
) -> Vec<Link> {
    let mut links = Vec::with_capacity(original_ids.len() * 2);
    for id in original_ids {
        if id == summary_id {
            continue;
        }
        links.push(Link {
            source_id: summary_id.to_string(),
            target_id: id.clone(),
            link_type: LinkType::Consolidation,
            weight: config.consolidation_link_weight,
            created_at,
            traversal_count: 0,
        });
        links.push(Link {
            source_id: id.clone(),
            target_id: summary_id.to_string(),
            link_type: LinkType::Consolidation,
            weight: config.consolidation_link_weight,
            created_at,
            traversal_count: 0,
        });
    }
    links
}

/// Depth-bounded BFS from `seeds`, expanding one hop at a time via
/// `fetch_outgoing` (backed by `cme-storage::queries::link_ops` in
/// practice). Assembles a transient `petgraph::graphmap::DiGraphMap` over
/// interned node ids so the traversal is cycle-safe without petgraph ever
/// becoming the system of record. `type_filter`, if set, restricts which
/// edges are followed and kept.
pub fn bfs_graph(
    seeds: &[String],
    depth: usize,
    config: &GraphConfig,
    type_filter: Option<&[LinkType]>,
    mut fetch_outgoing: impl FnMut(&[String]) -> CortexResult<Vec<Link>>,
) -> CortexResult<GraphView> {
    let depth = depth.min(config.max_graph_depth);

    let mut interner: HashMap<String, u32> = HashMap::new();
    let mut names: Vec<String> = Vec::new();
    let mut intern = |id: &str, interner: &mut HashMap<String, u32>, names: &mut Vec<String>| -> u32 {
        if let Some(&idx) = interner.get(id) {
            return idx;
        }
        let idx = names.len() as u32;
        names.push(id.to_string());
        interner.insert(id.to_string(), idx);
        idx
    };

    let mut graph: DiGraphMap<u32, f64> = DiGraphMap::new();
    let mut kept_edges: Vec<Link> = Vec::new();
    let mut edge_seen: HashSet<(String, String)> = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();

    for seed in seeds {
        let idx = intern(seed, &mut interner, &mut names);
        graph.add_node(idx);
        visited.insert(seed.clone());
    }

    let mut frontier: Vec<String> = seeds.to_vec();

    for _ in 0..depth {
        if frontier.is_empty() {
            break;
        }
        let links = fetch_outgoing(&frontier)?;
        let mut next_frontier = Vec::new();

        for link in links {
            if let Some(allowed) = type_filter {
                if !allowed.contains(&link.link_type) {
                    continue;
                }
            }
            let key = (link.source_id.clone(), link.target_id.clone());
            if !edge_seen.insert(key) {
                continue;
            }

            let src_idx = intern(&link.source_id, &mut interner, &mut names);
            let dst_idx = intern(&link.target_id, &mut interner, &mut names);
            graph.add_edge(src_idx, dst_idx, link.weight);
            kept_edges.push(link.clone());

            if visited.insert(link.target_id.clone()) {
                next_frontier.push(link.target_id.clone());
            }
        }
        frontier = next_frontier;
    }

    // Walk the assembled graph with petgraph's own BFS from every seed to
    // confirm reachability order is cycle-safe; the node set is already
    // exactly `visited`, this just exercises the traversal the way a
    // live graph consumer would.
    let mut reachable: Vec<String> = Vec::new();
    let mut seen_in_order: HashSet<u32> = HashSet::new();
    for seed in seeds {
        let Some(&start) = interner.get(seed) else { continue };
        let mut bfs = Bfs::new(&graph, start);
        while let Some(node_idx) = bfs.next(&graph) {
            if seen_in_order.insert(node_idx) {
                reachable.push(names[node_idx as usize].clone());
            }
        }
    }

    Ok(GraphView {
        nodes: reachable,
        edges: kept_edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoint_links_exclude_self_and_below_threshold() {
        let config = GraphConfig::default();
        let candidates = vec![
            ("new".to_string(), 0.99),
            ("a".to_string(), 0.8),
            ("b".to_string(), 0.1),
        ];
        let links = propose_waypoint_links("new", Utc::now(), &candidates, &config);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_id, "a");
    }

    #[test]
    fn waypoint_links_capped_at_max() {
        let mut config = GraphConfig::default();
        config.max_waypoints_per_memory = 2;
        config.waypoint_similarity_threshold = 0.0;
        let candidates: Vec<(String, f64)> =
            (0..10).map(|i| (format!("m{i}"), 1.0 - i as f64 * 0.01)).collect();
        let links = propose_waypoint_links("new", Utc::now(), &candidates, &config);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target_id, "m0");
    }

    #[test]
    fn consolidation_links_are_symmetric() {
        let config = GraphConfig::default();
        let links = consolidation_links("summary", &["a".to_string(), "b".to_string()], Utc::now(), &config);
        assert_eq!(links.len(), 4);
        assert!(links.iter().any(|l| l.source_id == "summary" && l.target_id == "a"));
        assert!(links.iter().any(|l| l.source_id == "a" && l.target_id == "summary"));
    }

    #[test]
    fn bfs_respects_depth_bound_and_cycles() {
        let config = GraphConfig::default();
        // a -> b -> c -> a (cycle); depth 1 from "a" should only reach "b".
        let all_links = vec![
            Link {
                source_id: "a".into(),
                target_id: "b".into(),
                link_type: LinkType::Semantic,
                weight: 0.5,
                created_at: Utc::now(),
                traversal_count: 0,
            },
            Link {
                source_id: "b".into(),
                target_id: "c".into(),
                link_type: LinkType::Semantic,
                weight: 0.5,
                created_at: Utc::now(),
                traversal_count: 0,
            },
            Link {
                source_id: "c".into(),
                target_id: "a".into(),
                link_type: LinkType::Semantic,
                weight: 0.5,
                created_at: Utc::now(),
                traversal_count: 0,
            },
        ];

        let view = bfs_graph(&["a".to_string()], 1, &config, None, |frontier| {
            Ok(all_links
                .iter()
                .filter(|l| frontier.contains(&l.source_id))
                .cloned()
                .collect())
        })
        .unwrap();

        assert!(view.nodes.contains(&"a".to_string()));
        assert!(view.nodes.contains(&"b".to_string()));
        assert!(!view.nodes.contains(&"c".to_string()));
    }

    #[test]
    fn bfs_terminates_on_full_cycle_without_infinite_loop() {
        let config = GraphConfig::default();
        let all_links = vec![
            Link {
                source_id: "a".into(),
                target_id: "b".into(),
                link_type: LinkType::Semantic,
                weight: 0.5,
                created_at: Utc::now(),
                traversal_count: 0,
            },
            Link {
                source_id: "b".into(),
                target_id: "a".into(),
                link_type: LinkType::Semantic,
                weight: 0.5,
                created_at: Utc::now(),
                traversal_count: 0,
            },
        ];

        let view = bfs_graph(&["a".to_string()], 5, &config, None, |frontier| {
            Ok(all_links
                .iter()
                .filter(|l| frontier.contains(&l.source_id))
                .cloned()
                .collect())
        })
        .unwrap();

        assert_eq!(view.nodes.len(), 2);
    }
}
