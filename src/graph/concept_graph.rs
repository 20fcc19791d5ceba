//! Concept co-occurrence graph

use crate::analysis::concept_key;
use crate::data::Episode;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A concept and the episodes that mention it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptNode {
    /// Case-insensitive identity
    pub key: String,
    /// First spelling seen
    pub label: String,
    /// Supporting episodes in insertion order, never empty
    pub episodes: Vec<String>,
}

impl ConceptNode {
    pub fn occurrences(&self) -> usize {
        self.episodes.len()
    }
}

/// Undirected co-occurrence between two concepts.
///
/// Endpoints are canonical: `a < b` by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptEdge {
    pub a: String,
    pub b: String,
    /// Number of episodes in which both concepts appear
    pub weight: usize,
    pub episodes: Vec<String>,
}

/// Undirected weighted graph of concepts keyed by `concept_key`.
///
/// Nodes only come into existence with a supporting episode, so no node
/// has zero episodes. Ordered maps keep every traversal deterministic.
#[derive(Debug, Clone, Default)]
pub struct ConceptGraph {
    nodes: BTreeMap<String, ConceptNode>,
    edges: BTreeMap<(String, String), ConceptEdge>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

fn canonical(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl ConceptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the valid episodes among `episodes`.
    pub fn from_episodes<'a, I>(episodes: I) -> Self
    where
        I: IntoIterator<Item = &'a Episode>,
    {
        let mut graph = Self::new();
        for episode in episodes.into_iter().filter(|e| e.is_valid()) {
            let names: Vec<&str> = episode.concept_names().collect();
            graph.add_episode(&episode.id, &names);
        }
        graph
    }

    /// Record one episode's concepts. Duplicate spellings within the
    /// episode count once.
    pub fn add_episode(&mut self, episode_id: &str, concepts: &[&str]) {
        let mut keys: Vec<String> = Vec::new();
        for name in concepts {
            let key = concept_key(name);
            if key.is_empty() || keys.contains(&key) {
                continue;
            }
            let node = self
                .nodes
                .entry(key.clone())
                .or_insert_with(|| ConceptNode {
                    key: key.clone(),
                    label: name.trim().to_string(),
                    episodes: Vec::new(),
                });
            node.episodes.push(episode_id.to_string());
            self.adjacency.entry(key.clone()).or_default();
            keys.push(key);
        }

        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                let (a, b) = canonical(&keys[i], &keys[j]);
                let edge = self
                    .edges
                    .entry((a.clone(), b.clone()))
                    .or_insert_with(|| ConceptEdge {
                        a: a.clone(),
                        b: b.clone(),
                        weight: 0,
                        episodes: Vec::new(),
                    });
                edge.weight += 1;
                edge.episodes.push(episode_id.to_string());

                self.adjacency.entry(a.clone()).or_default().insert(b.clone());
                self.adjacency.entry(b).or_default().insert(a);
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, key: &str) -> Option<&ConceptNode> {
        self.nodes.get(key)
    }

    /// Case-insensitive lookup by display name
    pub fn find(&self, name: &str) -> Option<&ConceptNode> {
        self.nodes.get(&concept_key(name))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ConceptNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &ConceptEdge> {
        self.edges.values()
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&ConceptEdge> {
        self.edges.get(&canonical(a, b))
    }

    /// Neighbour keys in sorted order
    pub fn neighbors(&self, key: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(key)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn degree(&self, key: &str) -> usize {
        self.adjacency.get(key).map_or(0, BTreeSet::len)
    }

    /// Display label for a key, falling back to the key itself
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.nodes.get(key).map_or(key, |n| n.label.as_str())
    }
}
