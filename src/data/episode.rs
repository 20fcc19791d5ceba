//! Episode record

use crate::analysis::EpisodeAnalysis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a transcript came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
}

/// One analyzed podcast episode, persisted as `<id>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub source: EpisodeSource,
    pub processed_at: DateTime<Utc>,
    pub analysis: EpisodeAnalysis,
    #[serde(default)]
    pub transcript: String,
}

impl Episode {
    pub fn is_valid(&self) -> bool {
        self.analysis.is_valid()
    }

    /// Concept names in first-seen order
    pub fn concept_names(&self) -> impl Iterator<Item = &str> {
        self.analysis
            .findings
            .concepts
            .iter()
            .map(|c| c.name.as_str())
    }
}

/// A transcript submitted for analysis
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptInput {
    pub id: String,
    pub title: String,
    pub transcript: String,
    pub source: EpisodeSource,
}

impl TranscriptInput {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            transcript: transcript.into(),
            source: EpisodeSource::default(),
        }
    }

    pub fn with_source(mut self, source: EpisodeSource) -> Self {
        self.source = source;
        self
    }
}

/// Lowercase ASCII slug: alphanumerics kept, runs of anything else become
/// a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
