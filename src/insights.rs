//! Cross-episode insight synthesis
//!
//! Each section is one model call over a compact JSON digest of the
//! episodes. A reply that fails to parse, or a transient API failure,
//! degrades that section to a locally derived value; fatal API errors
//! abort generation.

use crate::analysis::concept_key;
use crate::data::Episode;
use crate::error::{SimoneError, SimoneResult};
use crate::llm::{extract_json, CompletionParams, LlmClient};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Episodes included in prompt digests
const DIGEST_LIMIT: usize = 10;
/// Items per list included in prompt digests
const ITEM_LIMIT: usize = 20;
const CONTRIBUTIONS_PER_EPISODE: usize = 2;
const TOP_THEMES: usize = 5;

const SYSTEM_PROMPT: &str = "You synthesize ideas across episodes of a philosophy podcast. \
Answer only with the JSON requested.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionPoint {
    pub theme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evolution_type: Option<String>,
    pub episodes_involved: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizedWisdom {
    pub core_principles: Vec<String>,
    pub key_practices: Vec<String>,
    #[serde(alias = "common_pitfalls")]
    pub pitfalls: Vec<String>,
    pub integration_strategies: Vec<String>,
}

impl SynthesizedWisdom {
    fn is_empty(&self) -> bool {
        self.core_principles.is_empty() && self.key_practices.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhilosophicalPattern {
    pub pattern_type: String,
    pub description: String,
    #[serde(alias = "examples")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossContradiction {
    /// contradiction, tension, paradox or dialectic
    #[serde(rename = "type")]
    pub kind: String,
    pub episodes_involved: Vec<String>,
    pub description: String,
    #[serde(
        alias = "philosophical_significance",
        skip_serializing_if = "Option::is_none"
    )]
    pub significance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueContribution {
    pub insight: String,
    pub episode: String,
    pub context: Option<String>,
}

/// Synthesis across a set of episodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossEpisodeInsights {
    pub topic: String,
    pub episode_count: usize,
    pub thematic_evolution: Vec<EvolutionPoint>,
    pub synthesized_wisdom: SynthesizedWisdom,
    pub patterns: Vec<PhilosophicalPattern>,
    pub contradictions: Vec<CrossContradiction>,
    pub unique_contributions: Vec<UniqueContribution>,
    pub meta_insights: Vec<String>,
}

pub struct InsightGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    params: CompletionParams,
}

impl InsightGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            params: CompletionParams::default().with_system(SYSTEM_PROMPT),
        }
    }

    pub fn with_params(mut self, params: CompletionParams) -> Self {
        let system = params.system.clone().or(self.params.system.take());
        self.params = CompletionParams { system, ..params };
        self
    }

    /// Synthesize insights across `episodes`, optionally focused on `topic`.
    pub async fn generate(
        &self,
        episodes: &[&Episode],
        topic: Option<&str>,
    ) -> SimoneResult<CrossEpisodeInsights> {
        if episodes.is_empty() {
            return Err(SimoneError::InvalidInput(
                "no episodes to generate insights from".to_string(),
            ));
        }
        info!(episodes = episodes.len(), topic = topic.unwrap_or("all"), "generating insights");

        let mut chronological = episodes.to_vec();
        chronological.sort_by_key(|e| e.processed_at);

        let thematic_evolution = self.thematic_evolution(&chronological, topic).await?;
        let synthesized_wisdom = self.synthesize_wisdom(episodes, topic).await?;
        let patterns = self.patterns(episodes).await?;
        let contradictions = self.contradictions(episodes).await?;
        let unique_contributions = unique_contributions(episodes);

        let mut insights = CrossEpisodeInsights {
            topic: topic.unwrap_or("General Philosophy").to_string(),
            episode_count: episodes.len(),
            thematic_evolution,
            synthesized_wisdom,
            patterns,
            contradictions,
            unique_contributions,
            meta_insights: Vec::new(),
        };
        insights.meta_insights = self.meta_insights(&insights).await?;
        Ok(insights)
    }

    /// One model call parsed into `T`; `None` when the reply is unusable or
    /// the failure is transient.
    async fn query<T: DeserializeOwned>(&self, section: &str, prompt: String) -> SimoneResult<Option<T>> {
        let reply = match self.client.complete(&prompt, &self.model, &self.params).await {
            Ok(reply) => reply,
            Err(e) if e.is_fatal() => return Err(SimoneError::Api(e)),
            Err(e) => {
                warn!(section, error = %e, "insight request failed, using local fallback");
                return Ok(None);
            }
        };

        let parsed = extract_json(&reply).and_then(|v| serde_json::from_value::<T>(v).ok());
        if parsed.is_none() {
            warn!(section, "insight reply did not parse, using local fallback");
        }
        Ok(parsed)
    }

    async fn thematic_evolution(
        &self,
        chronological: &[&Episode],
        topic: Option<&str>,
    ) -> SimoneResult<Vec<EvolutionPoint>> {
        let digest: Vec<Value> = chronological
            .iter()
            .take(DIGEST_LIMIT)
            .map(|e| {
                json!({
                    "title": e.title,
                    "date": e.processed_at.to_rfc3339(),
                    "topic": e.analysis.findings.primary_topic,
                    "key_concepts": e.concept_names().take(3).collect::<Vec<_>>(),
                })
            })
            .collect();

        let prompt = format!(
            "Analyze how philosophical themes evolve across these episodes:\n{}\n{}\n\
Identify how understanding deepens, new perspectives introduced, shifts in emphasis, \
and complex ideas built from simple ones.\n\
Respond with a JSON array of objects with keys: theme, evolution_type, episodes_involved, description.",
            pretty(&digest),
            focus_line(topic),
        );

        let points: Option<Vec<EvolutionPoint>> = self.query("thematic_evolution", prompt).await?;
        Ok(points.filter(|p| !p.is_empty()).unwrap_or_else(|| {
            vec![EvolutionPoint {
                theme: topic.unwrap_or("Philosophy").to_string(),
                evolution_type: None,
                episodes_involved: chronological.iter().map(|e| e.title.clone()).collect(),
                description: format!("Themes traced across {} episodes", chronological.len()),
            }]
        }))
    }

    async fn synthesize_wisdom(
        &self,
        episodes: &[&Episode],
        topic: Option<&str>,
    ) -> SimoneResult<SynthesizedWisdom> {
        let advice = collect(episodes, |e| &e.analysis.findings.practical_advice);
        let insights = collect(episodes, |e| &e.analysis.findings.insights);

        let prompt = format!(
            "Synthesize this practical wisdom from multiple philosophical discussions.\n\n\
Practical advice:\n{}\n\nInsights:\n{}\n{}\n\
Respond with a JSON object with keys: core_principles (3-5), key_practices (3-5), \
pitfalls, integration_strategies. Each is a list of strings.",
            pretty(&advice),
            pretty(&insights),
            focus_line(topic),
        );

        let wisdom: Option<SynthesizedWisdom> = self.query("synthesized_wisdom", prompt).await?;
        Ok(wisdom.filter(|w| !w.is_empty()).unwrap_or_else(|| SynthesizedWisdom {
            core_principles: advice.into_iter().take(5).collect(),
            key_practices: insights.into_iter().take(5).collect(),
            ..Default::default()
        }))
    }

    async fn patterns(&self, episodes: &[&Episode]) -> SimoneResult<Vec<PhilosophicalPattern>> {
        let mut patterns = Vec::new();

        let claims: Vec<String> = episodes
            .iter()
            .flat_map(|e| e.analysis.findings.arguments.iter().map(|a| a.claim.clone()))
            .collect();
        if !claims.is_empty() {
            patterns.push(PhilosophicalPattern {
                pattern_type: "argument_structure".to_string(),
                description: format!("{} arguments made across episodes", claims.len()),
                items: claims.into_iter().take(3).collect(),
            });
        }

        let themes = recurring_themes(episodes);
        if !themes.is_empty() {
            patterns.push(PhilosophicalPattern {
                pattern_type: "thematic_recurrence".to_string(),
                description: "Themes that appear across multiple episodes".to_string(),
                items: themes
                    .into_iter()
                    .map(|(theme, count)| format!("{} ({})", theme, count))
                    .collect(),
            });
        }

        let concept_sample: Vec<&str> = episodes
            .iter()
            .take(DIGEST_LIMIT)
            .flat_map(|e| e.concept_names().take(2))
            .collect();
        if !concept_sample.is_empty() {
            let prompt = format!(
                "Identify philosophical patterns in these concepts:\n{}\n\
Look for conceptual hierarchies, opposing pairs, cultural influences and traditions.\n\
Respond with a JSON array of objects with keys: pattern_type, description, items.",
                pretty(&concept_sample),
            );
            let found: Option<Vec<PhilosophicalPattern>> = self.query("patterns", prompt).await?;
            patterns.extend(found.unwrap_or_default());
        }

        Ok(patterns)
    }

    async fn contradictions(&self, episodes: &[&Episode]) -> SimoneResult<Vec<CrossContradiction>> {
        let positions: Vec<Value> = episodes
            .iter()
            .take(DIGEST_LIMIT)
            .map(|e| {
                let f = &e.analysis.findings;
                json!({
                    "episode": e.title,
                    "summary": f.summary,
                    "thesis": f.main_thesis,
                })
            })
            .collect();

        let prompt = format!(
            "Analyze these philosophical positions for contradictions, tensions or paradoxes:\n{}\n\
Identify direct contradictions between episodes, tensions, evolving views and dialectical oppositions.\n\
Respond with a JSON array of objects with keys: type (contradiction, tension, paradox or dialectic), \
episodes_involved, description, significance.",
            pretty(&positions),
        );

        let found: Option<Vec<CrossContradiction>> = self.query("contradictions", prompt).await?;
        Ok(found.unwrap_or_else(|| {
            episodes
                .iter()
                .flat_map(|e| {
                    e.analysis
                        .findings
                        .contradictions
                        .iter()
                        .map(move |c| CrossContradiction {
                            kind: "paradox".to_string(),
                            episodes_involved: vec![e.title.clone()],
                            description: c.description.clone(),
                            significance: c.resolution.clone(),
                        })
                })
                .collect()
        }))
    }

    async fn meta_insights(&self, insights: &CrossEpisodeInsights) -> SimoneResult<Vec<String>> {
        let prompt = format!(
            "Based on this philosophical analysis across {} episodes:\n\
Thematic evolution: {} points identified\n\
Philosophical patterns: {} patterns found\n\
Contradictions: {} tensions identified\n\
Unique contributions: {} novel insights\n\n\
Generate 3-5 meta-insights about the podcast's overall philosophical approach, \
its contributions to discourse, its practical value and areas for deeper exploration.\n\
Respond with a JSON array of strings.",
            insights.episode_count,
            insights.thematic_evolution.len(),
            insights.patterns.len(),
            insights.contradictions.len(),
            insights.unique_contributions.len(),
        );

        let meta: Option<Vec<String>> = self.query("meta_insights", prompt).await?;
        Ok(meta.filter(|m| !m.is_empty()).unwrap_or_else(|| {
            vec![
                format!(
                    "{} episodes analyzed with {} recurring patterns",
                    insights.episode_count,
                    insights.patterns.len()
                ),
                format!(
                    "{} contradictions or tensions surfaced across episodes",
                    insights.contradictions.len()
                ),
            ]
        }))
    }
}

/// First insights of each episode, in input order
fn unique_contributions(episodes: &[&Episode]) -> Vec<UniqueContribution> {
    episodes
        .iter()
        .flat_map(|e| {
            e.analysis
                .findings
                .insights
                .iter()
                .take(CONTRIBUTIONS_PER_EPISODE)
                .map(move |insight| UniqueContribution {
                    insight: insight.clone(),
                    episode: e.title.clone(),
                    context: e.analysis.findings.primary_topic.clone(),
                })
        })
        .collect()
}

/// Themes appearing in more than one episode, most frequent first
fn recurring_themes(episodes: &[&Episode]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, (String, usize)> = HashMap::new();
    for episode in episodes {
        let mut seen = Vec::new();
        for theme in &episode.analysis.findings.themes {
            let key = concept_key(theme);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            counts.entry(key.clone()).or_insert_with(|| (theme.clone(), 0)).1 += 1;
            seen.push(key);
        }
    }

    let mut recurring: Vec<(String, usize)> = counts
        .into_values()
        .filter(|(_, count)| *count > 1)
        .collect();
    recurring.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    recurring.truncate(TOP_THEMES);
    recurring
}

fn collect<'a>(episodes: &[&'a Episode], field: impl Fn(&'a Episode) -> &'a Vec<String>) -> Vec<String> {
    episodes
        .iter()
        .flat_map(|e| field(e).iter().cloned())
        .take(ITEM_LIMIT)
        .collect()
}

fn focus_line(topic: Option<&str>) -> String {
    topic.map(|t| format!("Focus on topic: {}\n", t)).unwrap_or_default()
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
