//! Crate-level error type

use crate::analysis::AnalysisError;
use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::llm::LlmError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur in Simone operations
#[derive(Debug, Error)]
pub enum SimoneError {
    #[error("API error: {0}")]
    Api(#[from] LlmError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Episode not found: {0}")]
    EpisodeNotFound(String),

    #[error("Concept not found: {0}")]
    ConceptNotFound(String),

    #[error("Reanalysis of '{id}' produced no findings, stored record kept: {reason}")]
    ReanalysisFailed { id: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result type for Simone operations
pub type SimoneResult<T> = Result<T, SimoneError>;
