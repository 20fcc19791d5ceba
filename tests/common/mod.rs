//! Shared helpers for integration tests
//!
//! The scripted replies are derived from the transcript excerpt in each
//! prompt, so different chunks yield different findings: words tagged
//! `c_` become concepts and the first word of the excerpt becomes the
//! topic.

#![allow(dead_code)]

use serde_json::json;
use simone::llm::{LlmError, ScriptedClient};
use simone::Config;
use std::path::Path;
use std::sync::Arc;

pub const MODEL: &str = "test-model";

/// Transcript text following the excerpt marker of an analysis prompt
pub fn excerpt(prompt: &str) -> &str {
    prompt
        .split_once("Transcript excerpt:\n")
        .map(|(_, text)| text)
        .unwrap_or("")
}

/// Words tagged `c_`, without the tag
pub fn tagged_concepts(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter_map(|w| w.strip_prefix("c_"))
        .map(str::to_string)
        .collect()
}

pub fn scripted_reply(prompt: &str) -> Result<String, LlmError> {
    let text = excerpt(prompt);
    let first = text.split_whitespace().next().unwrap_or("nothing");

    let reply = if prompt.starts_with("Identify what") {
        json!({
            "primary_topic": first,
            "summary": format!("A discussion starting with {}", first),
            "themes": [first],
        })
    } else if prompt.starts_with("Extract the philosophical") {
        let concepts: Vec<_> = tagged_concepts(text)
            .into_iter()
            .map(|name| json!({ "name": name, "definition": format!("{} as discussed", name) }))
            .collect();
        json!({ "concepts": concepts, "philosophers": ["Seneca"] })
    } else if prompt.starts_with("Extract practical wisdom") {
        json!({
            "insights": [format!("Insight about {}", first)],
            "practical_advice": ["Reflect daily"],
        })
    } else if prompt.starts_with("Trace the connections") {
        json!({ "works_cited": [format!("Letters on {}", first)] })
    } else if prompt.starts_with("Assess") {
        json!({ "approach": "conversational", "depth": "medium" })
    } else {
        json!({})
    };
    Ok(format!("```json\n{}\n```", reply))
}

pub fn scripted_client() -> Arc<ScriptedClient> {
    Arc::new(ScriptedClient::responding_with(scripted_reply))
}

/// `count` words with every `every`th word tagged as a distinct concept
pub fn transcript(count: usize, every: usize) -> String {
    (0..count)
        .map(|i| {
            if i % every == 0 {
                format!("c_idea{}", i / every)
            } else {
                format!("word{}", i)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Small chunks so short transcripts span several of them; all paths
/// under `root`.
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.api.models.analysis = MODEL.to_string();
    config.api.models.qa = MODEL.to_string();
    config.paths.transcripts = root.join("transcripts");
    config.paths.episodes = root.join("episodes");
    config.paths.cache = root.join("cache");
    config.paths.exports = root.join("exports");
    config.analysis.chunk_size = 20;
    config.analysis.overlap = 5;
    config.analysis.max_retries = 2;
    config.analysis.initial_backoff_ms = 0;
    config.analysis.max_backoff_ms = 0;
    config.analysis.workers = 2;
    config
}
