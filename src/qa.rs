//! Question answering over analyzed episodes
//!
//! Relevance is plain keyword overlap: each query word (three letters or
//! more) is checked against an episode's title, summary, concepts, themes,
//! insights and advice, with concept names weighted highest.

use crate::data::Episode;
use serde::Serialize;

/// Episodes passed to the model as context
pub const CONTEXT_LIMIT: usize = 5;
/// Matching snippets kept per episode
const EXCERPT_LINES: usize = 3;
const SNIPPET_CHARS: usize = 150;
const MIN_WORD_LEN: usize = 3;

pub const SYSTEM_PROMPT: &str = "You are a philosophical guide to a podcast archive. \
Answer using the episode excerpts provided and cite episodes by title. \
If the excerpts do not cover the question, say so.";

/// An episode matched against a question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevantEpisode {
    pub episode_id: String,
    pub title: String,
    pub score: u32,
    /// Matching snippets, one per line
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<RelevantEpisode>,
    /// Whether `answer` came from the model rather than the local fallback
    pub generated: bool,
}

fn query_words(query: &str) -> Vec<String> {
    let mut words: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(str::to_lowercase)
        .collect();
    words.sort();
    words.dedup();
    words
}

fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Score one episode against a question. `None` when nothing matches.
pub fn score_episode(episode: &Episode, query: &str) -> Option<RelevantEpisode> {
    let words = query_words(query);
    if words.is_empty() {
        return None;
    }
    let matches = |text: &str| {
        let text = text.to_lowercase();
        words.iter().any(|w| text.contains(w.as_str()))
    };

    let f = &episode.analysis.findings;
    let mut score = 0;
    let mut lines = Vec::new();

    if matches(&episode.title) {
        score += 3;
        lines.push(format!("Title: {}", episode.title));
    }
    if let Some(summary) = f.summary.as_deref().filter(|s| matches(s)) {
        score += 2;
        lines.push(format!("Summary: {}", snippet(summary)));
    }
    for concept in &f.concepts {
        let definition = concept.definition.as_deref().unwrap_or_default();
        if matches(&concept.name) {
            score += 5;
        } else if matches(definition) {
            score += 2;
        } else {
            continue;
        }
        lines.push(format!("Concept: {} - {}", concept.name, snippet(definition)));
    }
    for theme in f.themes.iter().chain(&f.topics).filter(|t| matches(t)) {
        score += 3;
        lines.push(format!("Theme: {}", theme));
    }
    for insight in f.insights.iter().take(3).filter(|i| matches(i)) {
        score += 2;
        lines.push(format!("Insight: \"{}\"", snippet(insight)));
    }
    for advice in f.practical_advice.iter().take(2).filter(|a| matches(a)) {
        score += 2;
        lines.push(format!("Takeaway: {}", snippet(advice)));
    }

    (score > 0).then(|| RelevantEpisode {
        episode_id: episode.id.clone(),
        title: episode.title.clone(),
        score,
        excerpt: lines
            .into_iter()
            .take(EXCERPT_LINES)
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// Best-matching episodes, highest score first, ties by id.
pub fn find_relevant<'a, I>(episodes: I, query: &str, limit: usize) -> Vec<RelevantEpisode>
where
    I: IntoIterator<Item = &'a Episode>,
{
    let mut found: Vec<RelevantEpisode> = episodes
        .into_iter()
        .filter_map(|e| score_episode(e, query))
        .collect();
    found.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.episode_id.cmp(&b.episode_id))
    });
    found.truncate(limit);
    found
}

/// Context excerpt for one episode, used when the question targets it
/// explicitly.
pub fn episode_context(episode: &Episode) -> RelevantEpisode {
    let f = &episode.analysis.findings;
    let mut lines = Vec::new();
    if let Some(topic) = &f.primary_topic {
        lines.push(format!("Topic: {}", topic));
    }
    if let Some(summary) = &f.summary {
        lines.push(format!("Summary: {}", summary));
    }
    if let Some(thesis) = &f.main_thesis {
        lines.push(format!("Thesis: {}", thesis));
    }
    if !f.concepts.is_empty() {
        let names: Vec<&str> = episode.concept_names().collect();
        lines.push(format!("Concepts: {}", names.join(", ")));
    }
    for insight in &f.insights {
        lines.push(format!("Insight: \"{}\"", insight));
    }
    RelevantEpisode {
        episode_id: episode.id.clone(),
        title: episode.title.clone(),
        score: 0,
        excerpt: lines.join("\n"),
    }
}

pub fn render_prompt(question: &str, sources: &[RelevantEpisode]) -> String {
    let mut prompt = String::new();
    if sources.is_empty() {
        prompt.push_str("No episode matched this question.\n");
    } else {
        prompt.push_str("Relevant episode content:\n");
        for source in sources {
            prompt.push_str(&format!("\n**{}**\n{}\n---", source.title, source.excerpt));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!("\nQuestion: {}", question));
    prompt
}

/// Answer assembled from excerpts alone, for when the model is unreachable.
pub fn fallback_answer(sources: &[RelevantEpisode]) -> String {
    if sources.is_empty() {
        return "No episodes discuss that topic. Try asking about a concept, \
a philosopher or a tradition."
            .to_string();
    }
    let mut answer = String::from("Based on the episode content:\n\n");
    for source in sources.iter().take(3) {
        answer.push_str(&format!("**{}**\n{}\n\n", source.title, source.excerpt));
    }
    answer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ConceptMention, Findings};
    use crate::test_support::{episode_with, sample_episode};

    #[test]
    fn concept_names_outweigh_titles() {
        let by_title = sample_episode("a", "Stoic mornings", &["Habit"]);
        let by_concept = sample_episode("b", "Episode two", &["Stoicism"]);

        let found = find_relevant([&by_title, &by_concept], "stoic ideas", 5);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].episode_id, "b");
        assert_eq!(found[0].score, 5);
        assert_eq!(found[1].score, 3);
    }

    #[test]
    fn short_words_are_ignored() {
        let ep = sample_episode("a", "Is it so", &["Being"]);
        assert!(score_episode(&ep, "is it so").is_none());
    }

    #[test]
    fn excerpt_keeps_first_three_matches() {
        let ep = episode_with(
            "a",
            "Freedom",
            Findings {
                summary: Some("On freedom".into()),
                concepts: vec![ConceptMention {
                    definition: Some("Negative freedom".into()),
                    ..ConceptMention::named("Liberty")
                }],
                themes: vec!["Freedom of will".into()],
                ..Default::default()
            },
        );
        let found = score_episode(&ep, "freedom").unwrap();
        assert_eq!(found.score, 3 + 2 + 2 + 3);
        assert_eq!(found.excerpt.lines().count(), 3);
        assert!(found.excerpt.starts_with("Title: Freedom"));
    }

    #[test]
    fn limit_and_fallback() {
        let eps: Vec<_> = (0..8)
            .map(|i| sample_episode(&format!("ep{}", i), "Virtue", &[]))
            .collect();
        let found = find_relevant(&eps, "virtue", CONTEXT_LIMIT);
        assert_eq!(found.len(), CONTEXT_LIMIT);
        assert_eq!(found[0].episode_id, "ep0");

        assert!(fallback_answer(&found).contains("**Virtue**"));
        assert!(fallback_answer(&[]).starts_with("No episodes"));
    }

    #[test]
    fn prompt_lists_sources_before_question() {
        let ep = sample_episode("a", "Virtue", &["Arete"]);
        let prompt = render_prompt("What is arete?", &[episode_context(&ep)]);
        assert!(prompt.contains("**Virtue**"));
        assert!(prompt.contains("Concepts: Arete"));
        assert!(prompt.ends_with("Question: What is arete?"));
    }
}
