//! Path finding over the concept graph

use super::concept_graph::ConceptGraph;
use std::collections::{HashMap, VecDeque};

/// Shortest path between two concept keys (BFS, fewest hops).
///
/// Neighbours are visited in key order so ties resolve deterministically.
/// Returns `None` when either key is unknown or no path exists; a key to
/// itself is a single-node path.
pub fn shortest_path(graph: &ConceptGraph, source: &str, target: &str) -> Option<Vec<String>> {
    graph.node(source)?;
    graph.node(target)?;
    if source == target {
        return Some(vec![source.to_string()]);
    }

    let mut predecessors: HashMap<&str, &str> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::from([source]);
    predecessors.insert(source, source);

    while let Some(current) = queue.pop_front() {
        for neighbor in graph.neighbors(current) {
            if predecessors.contains_key(neighbor) {
                continue;
            }
            predecessors.insert(neighbor, current);
            if neighbor == target {
                return Some(reconstruct(&predecessors, source, target));
            }
            queue.push_back(neighbor);
        }
    }

    None
}

fn reconstruct(predecessors: &HashMap<&str, &str>, source: &str, target: &str) -> Vec<String> {
    let mut path = vec![target.to_string()];
    let mut current = target;
    while current != source {
        match predecessors.get(current) {
            Some(&prev) => {
                current = prev;
                path.push(current.to_string());
            }
            None => break,
        }
    }
    path.reverse();
    path
}
