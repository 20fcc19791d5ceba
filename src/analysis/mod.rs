//! Transcript analysis pipeline
//!
//! A transcript is split into overlapping chunks; each configured pass
//! (topics, concepts, wisdom, connections) runs over every chunk through the
//! LLM client and reply cache; per-chunk findings are merged into one
//! [`EpisodeAnalysis`]. Depths configured for it end with a single
//! meta-analysis call over the merged findings.
//!
//! # Architecture
//!
//! - **Chunker**: whitespace-token windows with overlap
//! - **prompts**: versioned templates and lenient reply parsing
//! - **PhilosophicalAnalyzer**: runs (chunk, pass) units with caching and
//!   failure bookkeeping
//! - **ResultMerger**: unions and concatenates findings across chunks
//!
//! # Example
//!
//! ```ignore
//! use simone::analysis::{AnalysisDepth, PhilosophicalAnalyzer};
//!
//! let analyzer = PhilosophicalAnalyzer::new(client, cache, "gpt-4o-mini");
//! let analysis = analyzer.analyze(&transcript, AnalysisDepth::Deep).await?;
//! println!("{} concepts", analysis.findings.concepts.len());
//! ```

mod analyzer;
mod chunker;
mod merger;
pub mod prompts;
mod types;

pub use analyzer::PhilosophicalAnalyzer;
pub use chunker::{Chunk, Chunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
pub use merger::ResultMerger;
pub use types::{
    concept_key, AnalysisDepth, AnalysisError, AnalysisPass, AnalysisStatus, Argument,
    ComplexityLevel, ConceptMention, Contradiction, DepthLevels, EpisodeAnalysis,
    EpisodeMetrics, FailureKind, Findings, MetaAnalysis, UnitFailure,
};
