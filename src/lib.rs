//! Simone: philosophical analysis of podcast transcripts
//!
//! Transcripts are split into chunks and sent through one to four LLM
//! analysis passes; the merged findings are stored as one JSON record per
//! episode and explored through concept graphs, cross-episode insights,
//! question answering and exports.
//!
//! # Core Concepts
//!
//! - **Episodes**: one analyzed transcript with its findings and status
//! - **Passes**: topics, concepts, wisdom and connections extraction,
//!   selected by depth, optionally followed by a meta-analysis
//! - **Concept graph**: concepts linked by shared episodes
//!
//! # Example
//!
//! ```no_run
//! use simone::{AnalysisDepth, Config, SimoneEngine, TranscriptInput};
//!
//! # async fn run() -> simone::SimoneResult<()> {
//! let config = Config::load(None)?;
//! let engine = SimoneEngine::from_config(&config)?;
//! let input = TranscriptInput::new("ep-01", "On Virtue", "...");
//! let episode = engine.analyze_transcript(input, AnalysisDepth::Standard).await?;
//! println!("{}: {}", episode.id, episode.analysis.status.as_str());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod data;
mod engine;
mod error;
pub mod graph;
pub mod insights;
pub mod llm;
pub mod qa;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use analysis::{
    AnalysisDepth, AnalysisStatus, EpisodeAnalysis, Findings, MetaAnalysis, PhilosophicalAnalyzer,
};
pub use cache::{FileCache, NullCache, ResponseCache};
pub use config::Config;
pub use data::{DataManager, Episode, SearchField, Statistics, TranscriptInput};
pub use engine::{ConceptMap, ExportFormat, SimoneEngine};
pub use error::{SimoneError, SimoneResult};
pub use graph::{ConceptGraph, ConceptMapper};
pub use insights::{CrossEpisodeInsights, InsightGenerator};
pub use llm::{LlmClient, LlmError};
pub use qa::Answer;
pub use storage::{EpisodeStore, JsonEpisodeStore, MemoryEpisodeStore, OpenStore, StorageError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
