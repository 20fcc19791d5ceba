//! Prompt templates and lenient reply parsing for each analysis pass

use super::types::{AnalysisPass, Argument, ConceptMention, Contradiction, Findings, MetaAnalysis};
use crate::llm::extract_json;
use serde_json::{Map, Value};

/// Bump when any template below changes so cached replies are not reused.
pub const TEMPLATE_VERSION: &str = "v1";

pub const SYSTEM_PROMPT: &str = "You are a careful analyst of philosophical conversations. \
You extract ideas faithfully from transcripts and always answer with a single JSON object.";

/// Serialized findings beyond this many characters are cut from the
/// meta-analysis prompt
const META_INPUT_CHARS: usize = 4000;

/// Identifier hashed into cache keys, e.g. `concepts@v1`
pub fn template_id(pass: AnalysisPass) -> String {
    format!("{}@{}", pass.as_str(), TEMPLATE_VERSION)
}

pub fn meta_template_id() -> String {
    format!("meta@{}", TEMPLATE_VERSION)
}

/// Format the prompt for one pass over one chunk
pub fn render(pass: AnalysisPass, chunk_text: &str) -> String {
    let instructions = match pass {
        AnalysisPass::Topics => {
            r#"Identify what this excerpt of a philosophical podcast is about.

Respond with a JSON object with these keys:
- "primary_topic": the main subject, a short phrase
- "summary": two or three sentences
- "main_thesis": the central claim argued for, if any
- "topics": list of subjects discussed
- "themes": list of recurring themes"#
        }
        AnalysisPass::Concepts => {
            r#"Extract the philosophical concepts, thinkers and arguments in this excerpt of a philosophical podcast.

Respond with a JSON object with these keys:
- "concepts": list of objects {"name", "definition", "application", "examples": [..]}
  where definition is how the speakers explain it and application is its real-world use
- "philosophers": list of philosophers mentioned or referenced
- "traditions": list of philosophical schools or traditions
- "arguments": list of objects {"claim", "premises": [..], "structure"}
  where structure is deductive, inductive or abductive"#
        }
        AnalysisPass::Wisdom => {
            r#"Extract practical wisdom from this excerpt of a philosophical podcast.

Respond with a JSON object with these keys:
- "insights": list of unique or surprising insights
- "practical_advice": list of actionable takeaways
- "contradictions": list of objects {"description", "resolution"} for paradoxes or tensions raised"#
        }
        AnalysisPass::Connections => {
            r#"Trace the connections this excerpt of a philosophical podcast draws to other thinkers, works and cultures.

Respond with a JSON object with these keys:
- "philosophers": list of philosophers mentioned or referenced
- "traditions": list of philosophical schools or traditions
- "works_cited": list of books or works cited
- "historical_examples": list of historical events or figures used as examples
- "cross_cultural": list of references to other cultures or traditions of thought"#
        }
    };

    format!("{}\n\nTranscript excerpt:\n{}", instructions, chunk_text)
}

/// Parse a reply into findings for `pass`.
///
/// Returns `None` when the reply holds no JSON object. Field names are
/// matched loosely since models drift between synonyms.
pub fn parse_findings(pass: AnalysisPass, reply: &str) -> Option<Findings> {
    let value = extract_json(reply)?;
    let obj = value.as_object()?;
    let mut findings = Findings::default();

    match pass {
        AnalysisPass::Topics => {
            findings.primary_topic = text_field(obj, &["primary_topic", "topic", "main_topic"]);
            findings.summary = summary_field(obj);
            findings.main_thesis = text_field(obj, &["main_thesis", "thesis"]);
            findings.topics = list_field(obj, &["topics", "subjects"]);
            findings.themes = list_field(obj, &["themes"]);
        }
        AnalysisPass::Concepts => {
            findings.concepts = lookup(obj, &["concepts", "concepts_explored"])
                .map(concepts_from)
                .unwrap_or_default();
            findings.philosophers =
                list_field(obj, &["philosophers", "philosophers_mentioned", "thinkers"]);
            findings.traditions = list_field(obj, &["traditions", "schools"]);
            findings.arguments = lookup(obj, &["arguments"])
                .map(arguments_from)
                .unwrap_or_default();
        }
        AnalysisPass::Wisdom => {
            findings.insights = list_field(obj, &["insights", "unique_insights", "key_insights"]);
            findings.practical_advice =
                list_field(obj, &["practical_advice", "life_advice", "takeaways"]);
            findings.contradictions = lookup(obj, &["contradictions", "paradoxes", "tensions"])
                .map(contradictions_from)
                .unwrap_or_default();
        }
        AnalysisPass::Connections => {
            findings.philosophers =
                list_field(obj, &["philosophers", "philosophers_mentioned", "thinkers"]);
            findings.traditions = list_field(obj, &["traditions", "schools"]);
            findings.works_cited = list_field(obj, &["works_cited", "books", "works", "books_cited"]);
            findings.historical_examples =
                list_field(obj, &["historical_examples", "historical_references"]);
            findings.cross_cultural =
                list_field(obj, &["cross_cultural", "cross_cultural_references"]);
        }
    }

    Some(findings)
}

/// Prompt assessing an episode's merged findings as a whole
pub fn render_meta(findings: &Findings) -> String {
    let data = serde_json::to_string_pretty(findings).unwrap_or_default();
    let data = match data.char_indices().nth(META_INPUT_CHARS) {
        Some((idx, _)) => format!("{}...", &data[..idx]),
        None => data,
    };

    format!(
        r#"Assess the philosophical analysis below as a whole.

Respond with a JSON object with these keys:
- "approach": the overall philosophical approach or style of the discussion
- "depth": surface, medium or deep
- "originality": how original the insights are
- "pedagogical_effectiveness": how well the ideas are taught
- "blindspots": list of potential blindspots or biases

Analysis data:
{}"#,
        data
    )
}

/// Parse a meta-analysis reply. `None` when the reply holds no JSON object.
pub fn parse_meta(reply: &str) -> Option<MetaAnalysis> {
    let value = extract_json(reply)?;
    let obj = value.as_object()?;
    Some(MetaAnalysis {
        approach: text_field(obj, &["approach", "philosophical_approach", "style"]),
        depth: text_field(obj, &["depth", "depth_of_analysis", "analysis_depth"]),
        originality: text_field(obj, &["originality", "originality_of_insights"]),
        pedagogical_effectiveness: text_field(obj, &["pedagogical_effectiveness", "pedagogy"]),
        blindspots: list_field(obj, &["blindspots", "potential_blindspots", "biases"]),
    })
}

fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn clean(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    lookup(obj, keys).and_then(Value::as_str).and_then(clean)
}

/// Summary may arrive as a string or as `{"brief", "detailed"}`
fn summary_field(obj: &Map<String, Value>) -> Option<String> {
    match lookup(obj, &["summary"])? {
        Value::String(s) => clean(s),
        Value::Object(inner) => text_field(inner, &["brief", "short", "detailed"]),
        _ => None,
    }
}

fn list_field(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    lookup(obj, keys).map(strings_from).unwrap_or_default()
}

/// Accepts a list of strings, a list of objects with a name-like key, or a
/// single string.
fn strings_from(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => clean(s).into_iter().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => clean(s),
                Value::Object(inner) => {
                    text_field(inner, &["name", "text", "description", "advice", "insight"])
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn concepts_from(value: &Value) -> Vec<ConceptMention> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => clean(s).map(ConceptMention::named),
            Value::Object(inner) => {
                let name = text_field(inner, &["name", "concept"])?;
                Some(ConceptMention {
                    name,
                    definition: text_field(inner, &["definition", "definition_given"]),
                    application: text_field(inner, &["application", "practical_application"]),
                    examples: lookup(inner, &["examples", "examples_used"])
                        .map(strings_from)
                        .unwrap_or_default(),
                })
            }
            _ => None,
        })
        .collect()
}

fn arguments_from(value: &Value) -> Vec<Argument> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => clean(s).map(|claim| Argument {
                claim,
                ..Default::default()
            }),
            Value::Object(inner) => Some(Argument {
                claim: text_field(inner, &["claim", "main_claim", "argument"])?,
                premises: lookup(inner, &["premises", "supporting_premises"])
                    .map(strings_from)
                    .unwrap_or_default(),
                structure: text_field(inner, &["structure", "logical_structure"]),
            }),
            _ => None,
        })
        .collect()
}

fn contradictions_from(value: &Value) -> Vec<Contradiction> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => clean(s).map(|description| Contradiction {
                description,
                resolution: None,
            }),
            Value::Object(inner) => Some(Contradiction {
                description: text_field(inner, &["description", "contradiction", "paradox"])?,
                resolution: text_field(inner, &["resolution", "how_addressed"]),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_ids_carry_version() {
        assert_eq!(template_id(AnalysisPass::Concepts), "concepts@v1");
    }

    #[test]
    fn prompt_embeds_chunk() {
        let prompt = render(AnalysisPass::Wisdom, "the unexamined life");
        assert!(prompt.ends_with("the unexamined life"));
        assert!(prompt.contains("practical_advice"));
    }

    #[test]
    fn parses_topics_with_nested_summary() {
        let reply = r#"```json
{"primary_topic": "Stoicism", "summary": {"brief": "On control.", "detailed": "Long"},
 "topics": ["control", "  ", "virtue"], "themes": "acceptance"}
```"#;
        let f = parse_findings(AnalysisPass::Topics, reply).unwrap();
        assert_eq!(f.primary_topic.as_deref(), Some("Stoicism"));
        assert_eq!(f.summary.as_deref(), Some("On control."));
        assert_eq!(f.topics, vec!["control", "virtue"]);
        assert_eq!(f.themes, vec!["acceptance"]);
        assert!(f.concepts.is_empty());
    }

    #[test]
    fn parses_concepts_in_either_shape() {
        let reply = r#"{
            "concepts_explored": [
                {"concept": "Amor fati", "definition_given": "love of fate", "examples_used": ["Nietzsche"]},
                "Dichotomy of control",
                {"definition": "missing name"}
            ],
            "philosophers_mentioned": [{"name": "Epictetus"}, "Seneca"],
            "arguments": [{"main_claim": "Virtue suffices", "premises": ["a", "b"]}]
        }"#;
        let f = parse_findings(AnalysisPass::Concepts, reply).unwrap();
        assert_eq!(f.concepts.len(), 2);
        assert_eq!(f.concepts[0].name, "Amor fati");
        assert_eq!(f.concepts[0].definition.as_deref(), Some("love of fate"));
        assert_eq!(f.concepts[0].examples, vec!["Nietzsche"]);
        assert_eq!(f.philosophers, vec!["Epictetus", "Seneca"]);
        assert_eq!(f.arguments[0].premises.len(), 2);
    }

    #[test]
    fn parses_wisdom() {
        let reply = r#"{"insights": ["i1"], "life_advice": ["do x"],
            "paradoxes": [{"description": "freedom through limits"}]}"#;
        let f = parse_findings(AnalysisPass::Wisdom, reply).unwrap();
        assert_eq!(f.insights, vec!["i1"]);
        assert_eq!(f.practical_advice, vec!["do x"]);
        assert_eq!(f.contradictions[0].description, "freedom through limits");
    }

    #[test]
    fn parses_connections() {
        let reply = r#"{"philosophers_mentioned": ["Confucius"], "books": ["Meditations", ""],
            "historical_examples": "the fall of Rome", "cross_cultural_references": [{"name": "Zen"}],
            "insights": ["ignored here"]}"#;
        let f = parse_findings(AnalysisPass::Connections, reply).unwrap();
        assert_eq!(f.philosophers, vec!["Confucius"]);
        assert_eq!(f.works_cited, vec!["Meditations"]);
        assert_eq!(f.historical_examples, vec!["the fall of Rome"]);
        assert_eq!(f.cross_cultural, vec!["Zen"]);
        assert!(f.insights.is_empty());
    }

    #[test]
    fn meta_prompt_carries_findings() {
        let findings = Findings {
            primary_topic: Some("Stoicism".into()),
            ..Default::default()
        };
        let prompt = render_meta(&findings);
        assert!(prompt.starts_with("Assess"));
        assert!(prompt.contains("\"primary_topic\": \"Stoicism\""));

        let huge = Findings {
            insights: vec!["x".repeat(10_000)],
            ..Default::default()
        };
        assert!(render_meta(&huge).len() < 6000);
    }

    #[test]
    fn parses_meta_with_synonyms() {
        let reply = r#"Here you go: {"style": "Socratic dialogue", "depth_of_analysis": "deep",
            "potential_blindspots": ["Western canon only"]}"#;
        let meta = parse_meta(reply).unwrap();
        assert_eq!(meta.approach.as_deref(), Some("Socratic dialogue"));
        assert_eq!(meta.depth.as_deref(), Some("deep"));
        assert_eq!(meta.blindspots, vec!["Western canon only"]);
        assert!(meta.originality.is_none());

        assert!(parse_meta("no idea").is_none());
        assert!(parse_meta("{}").unwrap().is_empty());
    }

    #[test]
    fn pass_only_reads_its_own_fields() {
        let reply = r#"{"primary_topic": "X", "concepts": ["Y"]}"#;
        let f = parse_findings(AnalysisPass::Topics, reply).unwrap();
        assert!(f.concepts.is_empty());
    }

    #[test]
    fn prose_reply_does_not_parse() {
        assert!(parse_findings(AnalysisPass::Topics, "I cannot help with that.").is_none());
        assert!(parse_findings(AnalysisPass::Topics, r#"["not", "an object"]"#).is_none());
    }
}
