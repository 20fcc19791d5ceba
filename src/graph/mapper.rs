//! Concept maps derived from analyzed episodes

use super::concept_graph::ConceptGraph;
use super::metrics;
use super::path::shortest_path;
use crate::analysis::concept_key;
use crate::data::Episode;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

const RELATED_LIMIT: usize = 10;
const TOP_LIMIT: usize = 20;
const CLUSTER_LIMIT: usize = 10;
const MIN_CLUSTER_SIZE: usize = 3;
/// Graphs smaller than this are not partitioned into clusters
const MIN_NODES_FOR_CLUSTERS: usize = 5;
const STRONG_CONNECTION_WEIGHT: usize = 3;

/// How one episode treats a concept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptOccurrence {
    pub episode_id: String,
    pub title: String,
    pub definition: Option<String>,
    pub application: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedConcept {
    pub concept: String,
    pub strength: usize,
    pub shared_episodes: Vec<String>,
}

/// Everything known about one concept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptDetail {
    pub concept: String,
    pub occurrences: usize,
    pub episodes: Vec<ConceptOccurrence>,
    /// Strongest first
    pub related_concepts: Vec<RelatedConcept>,
    pub centrality: f64,
    pub clustering_coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptCount {
    pub concept: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptScore {
    pub concept: String,
    pub score: f64,
}

/// A connected group of at least three concepts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptCluster {
    pub size: usize,
    pub concepts: Vec<String>,
    pub central_concept: String,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrongConnection {
    pub concepts: [String; 2],
    pub strength: usize,
    pub episodes: Vec<String>,
}

/// Whole-corpus view of the concept graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptOverview {
    pub total_concepts: usize,
    pub total_relationships: usize,
    pub top_by_frequency: Vec<ConceptCount>,
    pub top_by_centrality: Vec<ConceptScore>,
    pub top_by_betweenness: Vec<ConceptScore>,
    pub clusters: Vec<ConceptCluster>,
    pub strong_connections: Vec<StrongConnection>,
    pub density: f64,
    pub average_clustering: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathHop {
    pub from: String,
    pub to: String,
    pub shared_episodes: Vec<String>,
    pub strength: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptPath {
    pub from: String,
    pub to: String,
    /// Concept labels from `from` to `to` inclusive
    pub path: Vec<String>,
    pub length: usize,
    pub hops: Vec<PathHop>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationNode {
    pub id: String,
    pub label: String,
    /// Number of supporting episodes
    pub size: usize,
    pub episodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationEdge {
    pub source: String,
    pub target: String,
    pub weight: usize,
}

/// Node/edge lists ready for a graph renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisualizationGraph {
    pub nodes: Vec<VisualizationNode>,
    pub edges: Vec<VisualizationEdge>,
}

/// Read-only concept analytics over a set of episodes
#[derive(Debug, Clone, Default)]
pub struct ConceptMapper {
    graph: ConceptGraph,
    occurrences: HashMap<String, Vec<ConceptOccurrence>>,
}

impl ConceptMapper {
    /// Build the concept graph from the valid episodes among `episodes`.
    pub fn build<'a, I>(episodes: I) -> Self
    where
        I: IntoIterator<Item = &'a Episode>,
    {
        let valid: Vec<&Episode> = episodes.into_iter().filter(|e| e.is_valid()).collect();
        let graph = ConceptGraph::from_episodes(valid.iter().copied());

        let mut occurrences: HashMap<String, Vec<ConceptOccurrence>> = HashMap::new();
        for episode in &valid {
            let mut seen = Vec::new();
            for concept in &episode.analysis.findings.concepts {
                let key = concept.key();
                if key.is_empty() || seen.contains(&key) {
                    continue;
                }
                occurrences
                    .entry(key.clone())
                    .or_default()
                    .push(ConceptOccurrence {
                        episode_id: episode.id.clone(),
                        title: episode.title.clone(),
                        definition: concept.definition.clone(),
                        application: concept.application.clone(),
                    });
                seen.push(key);
            }
        }

        info!(
            concepts = graph.node_count(),
            relationships = graph.edge_count(),
            "built concept graph"
        );
        Self { graph, occurrences }
    }

    pub fn graph(&self) -> &ConceptGraph {
        &self.graph
    }

    /// Case-insensitive lookup of one concept
    pub fn concept(&self, name: &str) -> Option<ConceptDetail> {
        let node = self.graph.find(name)?;
        let key = node.key.as_str();

        let mut related: Vec<RelatedConcept> = self
            .graph
            .neighbors(key)
            .filter_map(|other| {
                let edge = self.graph.edge(key, other)?;
                Some(RelatedConcept {
                    concept: self.graph.label(other).to_string(),
                    strength: edge.weight,
                    shared_episodes: edge.episodes.clone(),
                })
            })
            .collect();
        related.sort_by(|a, b| b.strength.cmp(&a.strength).then_with(|| a.concept.cmp(&b.concept)));
        related.truncate(RELATED_LIMIT);

        let n = self.graph.node_count();
        let centrality = if n <= 1 {
            1.0
        } else {
            self.graph.degree(key) as f64 / (n - 1) as f64
        };

        Some(ConceptDetail {
            concept: node.label.clone(),
            occurrences: node.occurrences(),
            episodes: self.occurrences.get(key).cloned().unwrap_or_default(),
            related_concepts: related,
            centrality,
            clustering_coefficient: metrics::clustering(&self.graph, key),
        })
    }

    pub fn overview(&self) -> ConceptOverview {
        let mut by_frequency: Vec<ConceptCount> = self
            .graph
            .nodes()
            .map(|n| ConceptCount {
                concept: n.label.clone(),
                count: n.occurrences(),
            })
            .collect();
        by_frequency.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.concept.cmp(&b.concept)));
        by_frequency.truncate(TOP_LIMIT);

        let mut strong: Vec<StrongConnection> = self
            .graph
            .edges()
            .filter(|e| e.weight >= STRONG_CONNECTION_WEIGHT)
            .map(|e| StrongConnection {
                concepts: [
                    self.graph.label(&e.a).to_string(),
                    self.graph.label(&e.b).to_string(),
                ],
                strength: e.weight,
                episodes: e.episodes.clone(),
            })
            .collect();
        strong.sort_by(|a, b| b.strength.cmp(&a.strength));
        strong.truncate(TOP_LIMIT);

        ConceptOverview {
            total_concepts: self.graph.node_count(),
            total_relationships: self.graph.edge_count(),
            top_by_frequency: by_frequency,
            top_by_centrality: self.top_scores(metrics::degree_centrality(&self.graph)),
            top_by_betweenness: self.top_scores(metrics::betweenness_centrality(&self.graph)),
            clusters: self.clusters(),
            strong_connections: strong,
            density: metrics::density(&self.graph),
            average_clustering: metrics::average_clustering(&self.graph),
        }
    }

    fn top_scores(&self, scores: BTreeMap<String, f64>) -> Vec<ConceptScore> {
        let mut ranked: Vec<ConceptScore> = scores
            .into_iter()
            .map(|(key, score)| ConceptScore {
                concept: self.graph.label(&key).to_string(),
                score,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked.truncate(TOP_LIMIT);
        ranked
    }

    fn clusters(&self) -> Vec<ConceptCluster> {
        if self.graph.node_count() < MIN_NODES_FOR_CLUSTERS {
            return Vec::new();
        }

        let mut clusters: Vec<ConceptCluster> = metrics::connected_components(&self.graph)
            .into_iter()
            .filter(|c| c.len() >= MIN_CLUSTER_SIZE)
            .map(|members| {
                // Every neighbour of a member is inside the component, so the
                // full-graph degree is the subgraph degree.
                let central = members
                    .iter()
                    .max_by(|a, b| {
                        self.graph
                            .degree(a)
                            .cmp(&self.graph.degree(b))
                            .then_with(|| b.cmp(a))
                    })
                    .map(|k| self.graph.label(k).to_string())
                    .unwrap_or_default();
                ConceptCluster {
                    size: members.len(),
                    density: metrics::subgraph_density(&self.graph, &members),
                    concepts: members
                        .iter()
                        .map(|k| self.graph.label(k).to_string())
                        .collect(),
                    central_concept: central,
                }
            })
            .collect();

        clusters.sort_by(|a, b| b.size.cmp(&a.size));
        clusters.truncate(CLUSTER_LIMIT);
        clusters
    }

    /// Shortest chain of co-occurrences linking two concepts.
    pub fn path(&self, from: &str, to: &str) -> Option<ConceptPath> {
        let from_key = concept_key(from);
        let to_key = concept_key(to);
        let keys = shortest_path(&self.graph, &from_key, &to_key)?;

        let hops = keys
            .windows(2)
            .filter_map(|pair| {
                let edge = self.graph.edge(&pair[0], &pair[1])?;
                Some(PathHop {
                    from: self.graph.label(&pair[0]).to_string(),
                    to: self.graph.label(&pair[1]).to_string(),
                    shared_episodes: edge.episodes.clone(),
                    strength: edge.weight,
                })
            })
            .collect();

        Some(ConceptPath {
            from: self.graph.label(&from_key).to_string(),
            to: self.graph.label(&to_key).to_string(),
            length: keys.len() - 1,
            path: keys.iter().map(|k| self.graph.label(k).to_string()).collect(),
            hops,
        })
    }

    pub fn export_for_visualization(&self) -> VisualizationGraph {
        VisualizationGraph {
            nodes: self
                .graph
                .nodes()
                .map(|n| VisualizationNode {
                    id: n.label.clone(),
                    label: n.label.clone(),
                    size: n.occurrences(),
                    episodes: n.episodes.clone(),
                })
                .collect(),
            edges: self
                .graph
                .edges()
                .map(|e| VisualizationEdge {
                    source: self.graph.label(&e.a).to_string(),
                    target: self.graph.label(&e.b).to_string(),
                    weight: e.weight,
                })
                .collect(),
        }
    }
}
