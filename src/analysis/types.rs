//! Core types for transcript analysis

use crate::llm::LlmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One extraction focus run over every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPass {
    /// Primary topic, summary, thesis, topics and themes
    Topics,
    /// Concepts, philosophers, traditions and arguments
    Concepts,
    /// Insights, practical advice and contradictions
    Wisdom,
    /// Works cited, historical examples and cross-cultural references
    Connections,
}

impl AnalysisPass {
    pub const ALL: [AnalysisPass; 4] = [
        Self::Topics,
        Self::Concepts,
        Self::Wisdom,
        Self::Connections,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topics => "topics",
            Self::Concepts => "concepts",
            Self::Wisdom => "wisdom",
            Self::Connections => "connections",
        }
    }
}

impl fmt::Display for AnalysisPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How thoroughly to analyze a transcript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDepth {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl AnalysisDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Standard => "standard",
            Self::Deep => "deep",
        }
    }
}

impl fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            "deep" => Ok(Self::Deep),
            other => Err(format!(
                "unknown depth '{}' (expected quick, standard or deep)",
                other
            )),
        }
    }
}

/// Pass set run at each depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthLevels {
    pub quick: Vec<AnalysisPass>,
    pub standard: Vec<AnalysisPass>,
    pub deep: Vec<AnalysisPass>,
    /// Depths that finish with an episode-level meta-analysis
    pub meta_analysis: Vec<AnalysisDepth>,
}

impl Default for DepthLevels {
    fn default() -> Self {
        Self {
            quick: vec![AnalysisPass::Concepts],
            standard: vec![AnalysisPass::Topics, AnalysisPass::Concepts],
            deep: AnalysisPass::ALL.to_vec(),
            meta_analysis: vec![AnalysisDepth::Deep],
        }
    }
}

impl DepthLevels {
    pub fn passes_for(&self, depth: AnalysisDepth) -> &[AnalysisPass] {
        match depth {
            AnalysisDepth::Quick => &self.quick,
            AnalysisDepth::Standard => &self.standard,
            AnalysisDepth::Deep => &self.deep,
        }
    }

    pub fn runs_meta(&self, depth: AnalysisDepth) -> bool {
        self.meta_analysis.contains(&depth)
    }
}

/// Case-insensitive identity for concept and philosopher names
pub fn concept_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A concept as discussed in one episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptMention {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl ConceptMention {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> String {
        concept_key(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argument {
    pub claim: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub premises: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<String>,
}

/// A contradiction, paradox or tension raised in discussion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contradiction {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Structured fields extracted from model replies.
///
/// Produced per (chunk, pass) and merged into one record per episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Findings {
    pub primary_topic: Option<String>,
    pub summary: Option<String>,
    pub main_thesis: Option<String>,
    pub topics: Vec<String>,
    pub themes: Vec<String>,
    pub concepts: Vec<ConceptMention>,
    pub philosophers: Vec<String>,
    pub traditions: Vec<String>,
    pub arguments: Vec<Argument>,
    pub insights: Vec<String>,
    pub practical_advice: Vec<String>,
    pub contradictions: Vec<Contradiction>,
    pub works_cited: Vec<String>,
    pub historical_examples: Vec<String>,
    pub cross_cultural: Vec<String>,
}

impl Findings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Episode-level assessment of the merged findings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaAnalysis {
    /// Overall philosophical approach or style
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approach: Option<String>,
    /// surface, medium or deep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pedagogical_effectiveness: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blindspots: Vec<String>,
}

impl MetaAnalysis {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Every (chunk, pass) unit succeeded
    Complete,
    /// Some units failed, at least one succeeded
    Partial,
    /// No unit succeeded
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl ComplexityLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 3.0 {
            Self::Beginner
        } else if score < 6.0 {
            Self::Intermediate
        } else {
            Self::Advanced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeMetrics {
    pub concepts_count: usize,
    pub arguments_count: usize,
    pub insights_count: usize,
    pub practical_advice_count: usize,
    pub contradictions_count: usize,
    /// 0 to 10
    pub complexity_score: f64,
    pub complexity_level: ComplexityLevel,
}

impl EpisodeMetrics {
    pub fn from_findings(findings: &Findings) -> Self {
        let concepts = findings.concepts.len();
        let arguments = findings.arguments.len();
        let contradictions = findings.contradictions.len();

        let raw = 0.5 * concepts as f64 + 0.3 * arguments as f64 + 0.2 * contradictions as f64;
        let complexity_score = (raw.min(10.0) * 100.0).round() / 100.0;

        Self {
            concepts_count: concepts,
            arguments_count: arguments,
            insights_count: findings.insights.len(),
            practical_advice_count: findings.practical_advice.len(),
            contradictions_count: contradictions,
            complexity_score,
            complexity_level: ComplexityLevel::from_score(complexity_score),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The model call failed after retries
    Api,
    /// The reply could not be parsed into findings
    Parse,
}

/// A (chunk, pass) unit that produced nothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub chunk_index: usize,
    pub pass: AnalysisPass,
    pub kind: FailureKind,
    pub message: String,
}

/// Episode-level analysis record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeAnalysis {
    pub status: AnalysisStatus,
    pub depth: AnalysisDepth,
    pub model: String,
    pub passes: Vec<AnalysisPass>,
    pub chunk_count: usize,
    #[serde(flatten)]
    pub findings: Findings,
    #[serde(default)]
    pub metrics: EpisodeMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaAnalysis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<UnitFailure>,
}

impl EpisodeAnalysis {
    /// True when the record has usable content for aggregation
    pub fn is_valid(&self) -> bool {
        self.status != AnalysisStatus::Failed
            && (self.findings.summary.is_some()
                || self.findings.primary_topic.is_some()
                || !self.findings.concepts.is_empty())
    }
}

/// Errors that abort an analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Transcript is empty")]
    EmptyTranscript,

    #[error("Invalid chunking: {0}")]
    InvalidChunking(String),

    #[error("API error: {0}")]
    Api(#[from] LlmError),
}
