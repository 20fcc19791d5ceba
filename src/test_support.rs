//! Fixtures shared by unit tests

use crate::analysis::{
    AnalysisDepth, AnalysisPass, AnalysisStatus, ConceptMention, EpisodeAnalysis, EpisodeMetrics,
    Findings,
};
use crate::data::{Episode, EpisodeSource};
use chrono::{TimeZone, Utc};

pub fn analysis_from(findings: Findings) -> EpisodeAnalysis {
    EpisodeAnalysis {
        status: AnalysisStatus::Complete,
        depth: AnalysisDepth::Standard,
        model: "test-model".to_string(),
        passes: vec![AnalysisPass::Topics, AnalysisPass::Concepts],
        chunk_count: 1,
        metrics: EpisodeMetrics::from_findings(&findings),
        meta: None,
        findings,
        failures: Vec::new(),
    }
}

pub fn episode_with(id: &str, title: &str, findings: Findings) -> Episode {
    Episode {
        id: id.to_string(),
        title: title.to_string(),
        source: EpisodeSource::default(),
        processed_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        analysis: analysis_from(findings),
        transcript: format!("Transcript of {}", title),
    }
}

/// Complete episode whose primary topic is its title
pub fn sample_episode(id: &str, title: &str, concepts: &[&str]) -> Episode {
    episode_with(
        id,
        title,
        Findings {
            primary_topic: Some(title.to_string()),
            concepts: concepts.iter().map(|c| ConceptMention::named(*c)).collect(),
            ..Default::default()
        },
    )
}
