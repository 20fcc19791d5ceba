//! In-memory view over stored episodes

use super::episode::Episode;
use super::export::write_csv;
use crate::analysis::concept_key;
use crate::storage::{EpisodeStore, StorageResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Which text `search` looks in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchField {
    #[default]
    All,
    Title,
    Transcript,
    Concepts,
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "title" => Ok(Self::Title),
            "transcript" => Ok(Self::Transcript),
            "concepts" => Ok(Self::Concepts),
            other => Err(format!(
                "unknown search field '{}' (expected all, title, transcript or concepts)",
                other
            )),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Title => "title",
            Self::Transcript => "transcript",
            Self::Concepts => "concepts",
        })
    }
}

/// A name and the number of valid episodes mentioning it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frequency {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_episodes: usize,
    pub valid_episodes: usize,
    pub failed_episodes: usize,
    pub unique_concepts: usize,
    pub unique_philosophers: usize,
    /// Mean over valid episodes
    pub average_complexity: f64,
    /// Mean over valid episodes
    pub average_concepts_per_episode: f64,
}

/// Loads every episode from a store and answers read queries over them.
///
/// Episodes are kept sorted by id so every listing is deterministic.
pub struct DataManager {
    store: Arc<dyn EpisodeStore>,
    episodes: BTreeMap<String, Episode>,
}

impl DataManager {
    /// Load all readable episodes from `store`.
    pub fn load(store: Arc<dyn EpisodeStore>) -> StorageResult<Self> {
        let mut manager = Self {
            store,
            episodes: BTreeMap::new(),
        };
        manager.reload()?;
        Ok(manager)
    }

    /// Re-read every episode from the store.
    pub fn reload(&mut self) -> StorageResult<()> {
        self.episodes = self
            .store
            .load_all()?
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();
        info!(
            total = self.episodes.len(),
            valid = self.episodes.values().filter(|e| e.is_valid()).count(),
            "loaded episodes"
        );
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn EpisodeStore> {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn get_episode(&self, id: &str) -> Option<&Episode> {
        self.episodes.get(id)
    }

    pub fn all_episodes(&self, valid_only: bool) -> Vec<&Episode> {
        self.episodes
            .values()
            .filter(|e| !valid_only || e.is_valid())
            .collect()
    }

    fn valid(&self) -> impl Iterator<Item = &Episode> {
        self.episodes.values().filter(|e| e.is_valid())
    }

    /// Case-insensitive substring search over every episode.
    pub fn search(&self, query: &str, field: SearchField) -> Vec<&Episode> {
        let needle = query.to_lowercase();
        let wants = |f: SearchField| field == SearchField::All || field == f;

        self.episodes
            .values()
            .filter(|e| {
                (wants(SearchField::Title) && e.title.to_lowercase().contains(&needle))
                    || (wants(SearchField::Transcript)
                        && e.transcript.to_lowercase().contains(&needle))
                    || (wants(SearchField::Concepts)
                        && e.concept_names()
                            .any(|c| c.to_lowercase().contains(&needle)))
            })
            .collect()
    }

    /// Concepts across valid episodes, most frequent first.
    pub fn concept_frequencies(&self) -> Vec<Frequency> {
        frequencies(self.valid().map(|e| e.concept_names().collect::<Vec<_>>()))
    }

    /// Philosophers across valid episodes, most frequent first.
    pub fn philosopher_frequencies(&self) -> Vec<Frequency> {
        frequencies(self.valid().map(|e| {
            e.analysis
                .findings
                .philosophers
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
        }))
    }

    /// Valid episodes with a concept whose name contains `concept`
    /// (case-insensitive).
    pub fn episodes_by_concept(&self, concept: &str) -> Vec<&Episode> {
        let needle = concept_key(concept);
        self.valid()
            .filter(|e| e.concept_names().any(|c| c.to_lowercase().contains(&needle)))
            .collect()
    }

    /// Valid episodes mentioning a philosopher whose name contains
    /// `philosopher` (case-insensitive).
    pub fn episodes_by_philosopher(&self, philosopher: &str) -> Vec<&Episode> {
        let needle = concept_key(philosopher);
        self.valid()
            .filter(|e| {
                e.analysis
                    .findings
                    .philosophers
                    .iter()
                    .any(|p| p.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn statistics(&self) -> Statistics {
        let valid: Vec<&Episode> = self.valid().collect();
        let mean = |f: fn(&Episode) -> f64| {
            if valid.is_empty() {
                0.0
            } else {
                let avg = valid.iter().map(|e| f(e)).sum::<f64>() / valid.len() as f64;
                (avg * 100.0).round() / 100.0
            }
        };

        Statistics {
            total_episodes: self.episodes.len(),
            valid_episodes: valid.len(),
            failed_episodes: self.episodes.len() - valid.len(),
            unique_concepts: self.concept_frequencies().len(),
            unique_philosophers: self.philosopher_frequencies().len(),
            average_complexity: mean(|e| e.analysis.metrics.complexity_score),
            average_concepts_per_episode: mean(|e| e.analysis.findings.concepts.len() as f64),
        }
    }

    /// Persist an episode and update the in-memory view.
    pub fn save_episode(&mut self, episode: Episode) -> StorageResult<()> {
        self.store.save(&episode)?;
        self.episodes.insert(episode.id.clone(), episode);
        Ok(())
    }

    /// Write a CSV summary of every episode to `path`, returning the row count.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> StorageResult<usize> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        let rows = write_csv(writer, self.episodes.values())?;
        info!(rows, path = %path.display(), "exported CSV");
        Ok(rows)
    }
}

/// Count each name once per episode, keyed case-insensitively, labelled
/// with the first spelling seen. Ties break alphabetically by key.
fn frequencies<'a, I>(per_episode: I) -> Vec<Frequency>
where
    I: Iterator<Item = Vec<&'a str>>,
{
    let mut counts: HashMap<String, (String, usize)> = HashMap::new();
    for names in per_episode {
        let mut seen = std::collections::HashSet::new();
        for name in names {
            let key = concept_key(name);
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            counts
                .entry(key)
                .or_insert_with(|| (name.trim().to_string(), 0))
                .1 += 1;
        }
    }

    let mut ranked: Vec<(String, Frequency)> = counts
        .into_iter()
        .map(|(key, (name, count))| (key, Frequency { name, count }))
        .collect();
    ranked.sort_by(|(ka, a), (kb, b)| b.count.cmp(&a.count).then_with(|| ka.cmp(kb)));
    ranked.into_iter().map(|(_, f)| f).collect()
}
