//! Concept graph and the analytics built on it

mod concept_graph;
mod mapper;
pub mod metrics;
mod path;

pub use concept_graph::{ConceptEdge, ConceptGraph, ConceptNode};
pub use mapper::{
    ConceptCluster, ConceptCount, ConceptDetail, ConceptMapper, ConceptOccurrence,
    ConceptOverview, ConceptPath, ConceptScore, PathHop, RelatedConcept, StrongConnection,
    VisualizationEdge, VisualizationGraph, VisualizationNode,
};
pub use path::shortest_path;
