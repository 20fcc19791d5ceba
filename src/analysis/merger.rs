//! Result merger for combining per-chunk findings
//!
//! Handles deduplication across chunks: list fields are unioned by
//! case-insensitive key, insights are concatenated, scalar fields take the
//! first chunk that supplies them.

use super::types::{concept_key, ConceptMention, Findings};
use std::collections::{HashMap, HashSet};

/// Merges per-(chunk, pass) findings into one episode-level record
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultMerger;

impl ResultMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge findings in chunk order.
    pub fn merge(&self, parts: Vec<Findings>) -> Findings {
        let mut merged = Findings::default();
        let mut concept_index: HashMap<String, usize> = HashMap::new();
        let mut seen: SeenKeys = SeenKeys::default();

        for part in parts {
            merged.primary_topic = merged.primary_topic.or(part.primary_topic);
            merged.summary = merged.summary.or(part.summary);
            merged.main_thesis = merged.main_thesis.or(part.main_thesis);

            union_into(&mut merged.topics, part.topics, &mut seen.topics);
            union_into(&mut merged.themes, part.themes, &mut seen.themes);
            union_into(&mut merged.philosophers, part.philosophers, &mut seen.philosophers);
            union_into(&mut merged.traditions, part.traditions, &mut seen.traditions);
            union_into(
                &mut merged.practical_advice,
                part.practical_advice,
                &mut seen.advice,
            );
            union_into(&mut merged.works_cited, part.works_cited, &mut seen.works);
            union_into(
                &mut merged.historical_examples,
                part.historical_examples,
                &mut seen.historical,
            );
            union_into(
                &mut merged.cross_cultural,
                part.cross_cultural,
                &mut seen.cross_cultural,
            );

            for concept in part.concepts {
                merge_concept(&mut merged.concepts, &mut concept_index, concept);
            }

            for argument in part.arguments {
                if seen.arguments.insert(concept_key(&argument.claim)) {
                    merged.arguments.push(argument);
                }
            }
            for contradiction in part.contradictions {
                if seen.contradictions.insert(concept_key(&contradiction.description)) {
                    merged.contradictions.push(contradiction);
                }
            }

            merged.insights.extend(part.insights);
        }

        merged
    }
}

#[derive(Default)]
struct SeenKeys {
    topics: HashSet<String>,
    themes: HashSet<String>,
    philosophers: HashSet<String>,
    traditions: HashSet<String>,
    advice: HashSet<String>,
    works: HashSet<String>,
    historical: HashSet<String>,
    cross_cultural: HashSet<String>,
    arguments: HashSet<String>,
    contradictions: HashSet<String>,
}

fn union_into(target: &mut Vec<String>, items: Vec<String>, seen: &mut HashSet<String>) {
    for item in items {
        if seen.insert(concept_key(&item)) {
            target.push(item);
        }
    }
}

/// First spelling wins; later mentions fill in missing detail.
fn merge_concept(
    concepts: &mut Vec<ConceptMention>,
    index: &mut HashMap<String, usize>,
    concept: ConceptMention,
) {
    let key = concept.key();
    if key.is_empty() {
        return;
    }
    match index.get(&key) {
        Some(&i) => {
            let existing = &mut concepts[i];
            if existing.definition.is_none() {
                existing.definition = concept.definition;
            }
            if existing.application.is_none() {
                existing.application = concept.application;
            }
            for example in concept.examples {
                if !existing.examples.contains(&example) {
                    existing.examples.push(example);
                }
            }
        }
        None => {
            index.insert(key, concepts.len());
            concepts.push(concept);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::Argument;

    fn concepts(names: &[&str]) -> Findings {
        Findings {
            concepts: names.iter().map(|n| ConceptMention::named(*n)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn concepts_are_unioned_case_insensitively() {
        let merged = ResultMerger::new().merge(vec![
            concepts(&["Virtue", "Logos"]),
            concepts(&["virtue ", "Eudaimonia"]),
        ]);
        let names: Vec<_> = merged.concepts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Virtue", "Logos", "Eudaimonia"]);
    }

    #[test]
    fn later_chunks_fill_missing_concept_detail() {
        let mut second = concepts(&["VIRTUE"]);
        second.concepts[0].definition = Some("excellence".into());
        second.concepts[0].examples = vec!["Socrates".into()];

        let merged = ResultMerger::new().merge(vec![concepts(&["Virtue"]), second]);
        assert_eq!(merged.concepts.len(), 1);
        assert_eq!(merged.concepts[0].name, "Virtue");
        assert_eq!(merged.concepts[0].definition.as_deref(), Some("excellence"));
        assert_eq!(merged.concepts[0].examples, vec!["Socrates"]);
    }

    #[test]
    fn scalars_take_first_supplier_and_insights_concatenate() {
        let first = Findings {
            insights: vec!["same".into()],
            ..Default::default()
        };
        let second = Findings {
            primary_topic: Some("Death".into()),
            insights: vec!["same".into()],
            ..Default::default()
        };
        let third = Findings {
            primary_topic: Some("Time".into()),
            ..Default::default()
        };

        let merged = ResultMerger::new().merge(vec![first, second, third]);
        assert_eq!(merged.primary_topic.as_deref(), Some("Death"));
        assert_eq!(merged.insights.len(), 2);
    }

    #[test]
    fn arguments_dedupe_by_claim() {
        let part = || Findings {
            arguments: vec![Argument {
                claim: "Virtue is sufficient".into(),
                ..Default::default()
            }],
            philosophers: vec!["Zeno".into()],
            ..Default::default()
        };
        let merged = ResultMerger::new().merge(vec![part(), part()]);
        assert_eq!(merged.arguments.len(), 1);
        assert_eq!(merged.philosophers, vec!["Zeno"]);
    }

    #[test]
    fn connections_union_across_chunks() {
        let part = |works: &[&str], cultures: &[&str]| Findings {
            works_cited: works.iter().map(|w| w.to_string()).collect(),
            cross_cultural: cultures.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        };
        let merged = ResultMerger::new().merge(vec![
            part(&["Meditations", "Enchiridion"], &["Buddhism"]),
            part(&["meditations"], &["Buddhism", "Taoism"]),
        ]);
        assert_eq!(merged.works_cited, vec!["Meditations", "Enchiridion"]);
        assert_eq!(merged.cross_cultural, vec!["Buddhism", "Taoism"]);
        assert!(merged.historical_examples.is_empty());
    }

    #[test]
    fn empty_input_merges_to_empty() {
        assert!(ResultMerger::new().merge(vec![]).is_empty());
    }
}
