//! Graph metrics over the concept graph
//!
//! Unweighted, undirected definitions throughout; edge weights only matter
//! for ranking relationships, not for centrality.

use super::concept_graph::ConceptGraph;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Degree / (n - 1) for every node. A lone node scores 1.
pub fn degree_centrality(graph: &ConceptGraph) -> BTreeMap<String, f64> {
    let n = graph.node_count();
    graph
        .nodes()
        .map(|node| {
            let score = if n <= 1 {
                1.0
            } else {
                graph.degree(&node.key) as f64 / (n - 1) as f64
            };
            (node.key.clone(), score)
        })
        .collect()
}

/// Normalised betweenness centrality (Brandes).
///
/// The accumulated dependency over all ordered source/target pairs is
/// divided by (n - 1)(n - 2), which equals the fraction of unordered pairs
/// whose shortest paths pass through the node.
pub fn betweenness_centrality(graph: &ConceptGraph) -> BTreeMap<String, f64> {
    let keys: Vec<&str> = graph.nodes().map(|n| n.key.as_str()).collect();
    let mut centrality: HashMap<&str, f64> = keys.iter().map(|k| (*k, 0.0)).collect();

    for &source in &keys {
        let mut stack: Vec<&str> = Vec::new();
        let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut sigma: HashMap<&str, f64> = HashMap::new();
        let mut distance: HashMap<&str, usize> = HashMap::new();

        sigma.insert(source, 1.0);
        distance.insert(source, 0);
        let mut queue = VecDeque::from([source]);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = distance[v];
            let sv = sigma[v];
            for w in graph.neighbors(v) {
                if !distance.contains_key(w) {
                    distance.insert(w, dv + 1);
                    queue.push_back(w);
                }
                if distance[w] == dv + 1 {
                    *sigma.entry(w).or_insert(0.0) += sv;
                    predecessors.entry(w).or_default().push(v);
                }
            }
        }

        let mut delta: HashMap<&str, f64> = HashMap::new();
        while let Some(w) = stack.pop() {
            let dw = delta.get(w).copied().unwrap_or(0.0);
            if let Some(preds) = predecessors.get(w) {
                for &v in preds {
                    let share = sigma[v] / sigma[w] * (1.0 + dw);
                    *delta.entry(v).or_insert(0.0) += share;
                }
            }
            if w != source {
                if let Some(c) = centrality.get_mut(w) {
                    *c += dw;
                }
            }
        }
    }

    let n = keys.len();
    let scale = if n > 2 {
        1.0 / ((n - 1) * (n - 2)) as f64
    } else {
        0.0
    };
    centrality
        .into_iter()
        .map(|(k, c)| (k.to_string(), c * scale))
        .collect()
}

/// Fraction of a node's neighbour pairs that are themselves connected
pub fn clustering(graph: &ConceptGraph, key: &str) -> f64 {
    let neighbors: Vec<&str> = graph.neighbors(key).collect();
    let k = neighbors.len();
    if k < 2 {
        return 0.0;
    }
    let mut links = 0;
    for i in 0..k {
        for j in (i + 1)..k {
            if graph.edge(neighbors[i], neighbors[j]).is_some() {
                links += 1;
            }
        }
    }
    2.0 * links as f64 / (k * (k - 1)) as f64
}

/// Mean clustering coefficient over all nodes
pub fn average_clustering(graph: &ConceptGraph) -> f64 {
    let n = graph.node_count();
    if n == 0 {
        return 0.0;
    }
    graph
        .nodes()
        .map(|node| clustering(graph, &node.key))
        .sum::<f64>()
        / n as f64
}

/// Edges present / edges possible
pub fn density(graph: &ConceptGraph) -> f64 {
    pair_density(graph.edge_count(), graph.node_count())
}

/// Density of the subgraph induced by `members`
pub fn subgraph_density(graph: &ConceptGraph, members: &BTreeSet<String>) -> f64 {
    let edges = graph
        .edges()
        .filter(|e| members.contains(&e.a) && members.contains(&e.b))
        .count();
    pair_density(edges, members.len())
}

fn pair_density(edges: usize, nodes: usize) -> f64 {
    if nodes < 2 {
        0.0
    } else {
        2.0 * edges as f64 / (nodes * (nodes - 1)) as f64
    }
}

/// Connected components, each as a sorted key set, in order of their
/// smallest key.
pub fn connected_components(graph: &ConceptGraph) -> Vec<BTreeSet<String>> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut components = Vec::new();

    for node in graph.nodes() {
        if !seen.insert(node.key.as_str()) {
            continue;
        }
        let mut component = BTreeSet::new();
        let mut queue = VecDeque::from([node.key.as_str()]);
        while let Some(current) = queue.pop_front() {
            component.insert(current.to_string());
            for neighbor in graph.neighbors(current) {
                if seen.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        components.push(component);
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// a - b - c path plus an isolated d
    fn path_graph() -> ConceptGraph {
        let mut g = ConceptGraph::new();
        g.add_episode("e1", &["a", "b"]);
        g.add_episode("e2", &["b", "c"]);
        g.add_episode("e3", &["d"]);
        g
    }

    fn triangle_with_tail() -> ConceptGraph {
        let mut g = ConceptGraph::new();
        g.add_episode("e1", &["a", "b", "c"]);
        g.add_episode("e2", &["c", "d"]);
        g
    }

    #[test]
    fn degree_centrality_normalises_by_n_minus_one() {
        let dc = degree_centrality(&path_graph());
        assert!(close(dc["b"], 2.0 / 3.0));
        assert!(close(dc["a"], 1.0 / 3.0));
        assert!(close(dc["d"], 0.0));

        let mut single = ConceptGraph::new();
        single.add_episode("e", &["x"]);
        assert!(close(degree_centrality(&single)["x"], 1.0));
    }

    #[test]
    fn betweenness_of_path_middle() {
        let mut g = ConceptGraph::new();
        g.add_episode("e1", &["a", "b"]);
        g.add_episode("e2", &["b", "c"]);
        let bc = betweenness_centrality(&g);
        // b lies on the only a-c path: 1 of 1 unordered pair
        assert!(close(bc["b"], 1.0));
        assert!(close(bc["a"], 0.0));
    }

    #[test]
    fn betweenness_with_tail() {
        let bc = betweenness_centrality(&triangle_with_tail());
        // c bridges d to a and b: 2 of 3 unordered pairs not involving c
        assert!(close(bc["c"], 2.0 / 3.0));
        assert!(close(bc["a"], 0.0));
        assert!(close(bc["d"], 0.0));
    }

    #[test]
    fn betweenness_splits_between_equal_paths() {
        // square a-b-d, a-c-d
        let mut g = ConceptGraph::new();
        g.add_episode("e1", &["a", "b"]);
        g.add_episode("e2", &["b", "d"]);
        g.add_episode("e3", &["a", "c"]);
        g.add_episode("e4", &["c", "d"]);
        let bc = betweenness_centrality(&g);
        // b carries half of the a-d pair: 0.5 / 3 pairs
        assert!(close(bc["b"], 0.5 / 3.0));
        assert!(close(bc["b"], bc["c"]));
    }

    #[test]
    fn clustering_coefficients() {
        let g = triangle_with_tail();
        assert!(close(clustering(&g, "a"), 1.0));
        // c has neighbours a, b, d: only a-b linked, 1 of 3 pairs
        assert!(close(clustering(&g, "c"), 1.0 / 3.0));
        assert!(close(clustering(&g, "d"), 0.0));
        assert!(close(average_clustering(&g), (1.0 + 1.0 + 1.0 / 3.0) / 4.0));
        assert!(close(average_clustering(&ConceptGraph::new()), 0.0));
    }

    #[test]
    fn density_and_components() {
        let g = path_graph();
        // 2 edges of 6 possible
        assert!(close(density(&g), 1.0 / 3.0));

        let components = connected_components(&g);
        assert_eq!(components.len(), 2);
        assert_eq!(
            components[0],
            ["a", "b", "c"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<String>>()
        );
        assert!(close(subgraph_density(&g, &components[0]), 2.0 / 3.0));
        assert!(close(subgraph_density(&g, &components[1]), 0.0));
    }
}
