//! Top-level engine tying storage, analysis, concept maps, insights and
//! question answering together.

use crate::analysis::{AnalysisDepth, AnalysisStatus, PhilosophicalAnalyzer};
use crate::cache::{CacheStats, FileCache, NullCache, ResponseCache};
use crate::config::Config;
use crate::data::{
    slugify, DataManager, Episode, EpisodeSource, Frequency, SearchField, Statistics,
    TranscriptInput,
};
use crate::error::{SimoneError, SimoneResult};
use crate::graph::{ConceptDetail, ConceptMapper, ConceptOverview, ConceptPath, VisualizationGraph};
use crate::insights::{CrossEpisodeInsights, InsightGenerator};
use crate::llm::{CompletionParams, LlmClient, OpenAiClient, RetryingClient};
use crate::qa::{self, Answer};
use crate::storage::{validate_id, EpisodeStore, JsonEpisodeStore, OpenStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Ranked concept and philosopher lists in a JSON export stop here
const EXPORT_TOP_LIMIT: usize = 20;

/// Either the whole-corpus overview or a single concept
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConceptMap {
    Overview(ConceptOverview),
    Concept(ConceptDetail),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format '{}' (expected json or csv)", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Everything written by a JSON export
#[derive(Serialize)]
struct ExportBundle<'a> {
    version: &'static str,
    exported_at: DateTime<Utc>,
    statistics: Statistics,
    top_concepts: Vec<Frequency>,
    top_philosophers: Vec<Frequency>,
    concept_overview: ConceptOverview,
    concept_graph: VisualizationGraph,
    #[serde(skip_serializing_if = "Option::is_none")]
    cross_episode_insights: Option<CrossEpisodeInsights>,
    episodes: Vec<&'a Episode>,
}

pub struct SimoneEngine {
    analyzer: Arc<PhilosophicalAnalyzer>,
    insights: InsightGenerator,
    client: Arc<dyn LlmClient>,
    cache: Arc<dyn ResponseCache>,
    data: RwLock<DataManager>,
    qa_model: String,
    qa_params: CompletionParams,
    workers: usize,
    exports_dir: PathBuf,
}

impl SimoneEngine {
    /// Build the production stack: HTTP client with retries, file cache
    /// (unless disabled) and the JSON episode store.
    pub fn from_config(config: &Config) -> SimoneResult<Self> {
        // Without a key, read-only commands still work; model calls fail
        // with a fatal authentication error.
        if config.api_key().is_none() {
            debug!("no API key configured");
        }
        let http = OpenAiClient::new(
            config.api.base_url.as_str(),
            config.api_key().unwrap_or_default(),
            config.request_timeout(),
        )?;
        let client: Arc<dyn LlmClient> = Arc::new(RetryingClient::new(Arc::new(http), config.retry_policy()));

        let cache: Arc<dyn ResponseCache> = if config.analysis.cache_enabled {
            Arc::new(FileCache::open(&config.paths.cache)?)
        } else {
            Arc::new(NullCache)
        };
        let store: Arc<dyn EpisodeStore> = Arc::new(JsonEpisodeStore::open(&config.paths.episodes)?);

        Self::with_components(client, cache, store, config)
    }

    /// Assemble an engine from explicit parts. Settings other than paths to
    /// the cache and store still come from `config`.
    pub fn with_components(
        client: Arc<dyn LlmClient>,
        cache: Arc<dyn ResponseCache>,
        store: Arc<dyn EpisodeStore>,
        config: &Config,
    ) -> SimoneResult<Self> {
        config.validate()?;
        let params = config.completion_params();

        let analyzer = PhilosophicalAnalyzer::new(
            Arc::clone(&client),
            Arc::clone(&cache),
            config.api.models.analysis.as_str(),
        )
        .with_chunker(config.chunker()?)
        .with_params(params.clone())
        .with_depth_levels(config.analysis.depth_levels.clone());

        let insights = InsightGenerator::new(Arc::clone(&client), config.api.models.analysis.as_str())
            .with_params(params.clone());

        Ok(Self {
            analyzer: Arc::new(analyzer),
            insights,
            client,
            cache,
            data: RwLock::new(DataManager::load(store)?),
            qa_model: config.api.models.qa.clone(),
            qa_params: params.with_system(qa::SYSTEM_PROMPT),
            workers: config.analysis.workers,
            exports_dir: config.paths.exports.clone(),
        })
    }

    /// Analyze one transcript and persist the resulting episode, replacing
    /// any earlier record with the same id.
    pub async fn analyze_transcript(
        &self,
        input: TranscriptInput,
        depth: AnalysisDepth,
    ) -> SimoneResult<Episode> {
        let episode = analyze_input(&self.analyzer, input, depth).await?;
        self.persist(episode).await
    }

    async fn persist(&self, episode: Episode) -> SimoneResult<Episode> {
        self.data.write().await.save_episode(episode.clone())?;
        info!(id = %episode.id, status = episode.analysis.status.as_str(), "episode saved");
        Ok(episode)
    }

    /// Run analysis again over a stored episode's transcript.
    ///
    /// A run that produces no findings at all does not replace a valid
    /// stored record; the record is kept and the call fails.
    pub async fn reanalyze_episode(&self, id: &str, depth: AnalysisDepth) -> SimoneResult<Episode> {
        let (input, had_valid) = {
            let data = self.data.read().await;
            let episode = data
                .get_episode(id)
                .ok_or_else(|| SimoneError::EpisodeNotFound(id.to_string()))?;
            if episode.transcript.trim().is_empty() {
                return Err(SimoneError::InvalidInput(format!(
                    "episode '{}' has no stored transcript",
                    id
                )));
            }
            let input = TranscriptInput::new(&episode.id, &episode.title, &episode.transcript)
                .with_source(episode.source.clone());
            (input, episode.is_valid())
        };

        let episode = analyze_input(&self.analyzer, input, depth).await?;
        if had_valid && episode.analysis.status == AnalysisStatus::Failed {
            let reason = episode
                .analysis
                .failures
                .first()
                .map(|f| f.message.clone())
                .unwrap_or_else(|| "no analysis unit succeeded".to_string());
            warn!(id, %reason, "reanalysis failed, keeping stored record");
            return Err(SimoneError::ReanalysisFailed {
                id: id.to_string(),
                reason,
            });
        }
        self.persist(episode).await
    }

    /// Analyze several transcripts with at most `analysis.workers` running
    /// at once. Results are in input order; one failure does not stop the
    /// others.
    pub async fn analyze_batch(
        &self,
        inputs: Vec<TranscriptInput>,
        depth: AnalysisDepth,
    ) -> SimoneResult<Vec<SimoneResult<Episode>>> {
        let total = inputs.len();
        info!(total, workers = self.workers, %depth, "starting batch analysis");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for (index, input) in inputs.into_iter().enumerate() {
            let analyzer = Arc::clone(&self.analyzer);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, analyze_input(&analyzer, input, depth).await)
            });
        }

        let mut slots: Vec<Option<SimoneResult<Episode>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| SimoneError::Task(e.to_string()))?;
            slots[index] = Some(result);
        }

        let mut data = self.data.write().await;
        let mut results = Vec::with_capacity(total);
        for slot in slots {
            let result = match slot {
                Some(Ok(episode)) => data
                    .save_episode(episode.clone())
                    .map(|_| episode)
                    .map_err(SimoneError::from),
                Some(Err(e)) => Err(e),
                None => Err(SimoneError::Task("analysis task produced no result".into())),
            };
            if let Err(e) = &result {
                warn!(error = %e, "batch item failed");
            }
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        info!(succeeded, failed = total - succeeded, "batch analysis finished");
        Ok(results)
    }

    /// Analyze every `*.txt` file in `dir`. The episode id is the slugified
    /// file stem and the title is the stem itself.
    pub async fn analyze_directory(
        &self,
        dir: &Path,
        depth: AnalysisDepth,
    ) -> SimoneResult<Vec<SimoneResult<Episode>>> {
        let inputs = read_transcripts(dir)?;
        info!(dir = %dir.display(), files = inputs.len(), "found transcripts");
        self.analyze_batch(inputs, depth).await
    }

    /// Overview of the concept graph, or detail for one concept.
    pub async fn concept_map(&self, concept: Option<&str>) -> SimoneResult<ConceptMap> {
        let mapper = self.mapper().await;
        match concept {
            None => Ok(ConceptMap::Overview(mapper.overview())),
            Some(name) => mapper
                .concept(name)
                .map(ConceptMap::Concept)
                .ok_or_else(|| SimoneError::ConceptNotFound(name.to_string())),
        }
    }

    /// Shortest co-occurrence path between two concepts; `None` when both
    /// exist but are not connected.
    pub async fn concept_path(&self, from: &str, to: &str) -> SimoneResult<Option<ConceptPath>> {
        let mapper = self.mapper().await;
        for name in [from, to] {
            if mapper.graph().find(name).is_none() {
                return Err(SimoneError::ConceptNotFound(name.to_string()));
            }
        }
        Ok(mapper.path(from, to))
    }

    pub async fn visualization(&self) -> VisualizationGraph {
        self.mapper().await.export_for_visualization()
    }

    async fn mapper(&self) -> ConceptMapper {
        let data = self.data.read().await;
        ConceptMapper::build(data.all_episodes(true))
    }

    /// Cross-episode insights over the given episodes, or every valid
    /// episode when `ids` is `None`.
    pub async fn generate_insights(
        &self,
        topic: Option<&str>,
        ids: Option<&[String]>,
    ) -> SimoneResult<CrossEpisodeInsights> {
        let episodes: Vec<Episode> = {
            let data = self.data.read().await;
            match ids {
                Some(ids) => ids
                    .iter()
                    .map(|id| {
                        data.get_episode(id)
                            .cloned()
                            .ok_or_else(|| SimoneError::EpisodeNotFound(id.clone()))
                    })
                    .collect::<SimoneResult<_>>()?,
                None => data.all_episodes(true).into_iter().cloned().collect(),
            }
        };
        let refs: Vec<&Episode> = episodes.iter().collect();
        self.insights.generate(&refs, topic).await
    }

    /// Answer a question from episode content, optionally restricted to one
    /// episode.
    ///
    /// Transient API failures fall back to an answer built from the matched
    /// excerpts; fatal ones surface.
    pub async fn ask(&self, question: &str, episode: Option<&str>) -> SimoneResult<Answer> {
        if question.trim().is_empty() {
            return Err(SimoneError::InvalidInput("question is empty".to_string()));
        }

        let sources = {
            let data = self.data.read().await;
            match episode {
                Some(id) => {
                    let episode = data
                        .get_episode(id)
                        .ok_or_else(|| SimoneError::EpisodeNotFound(id.to_string()))?;
                    vec![qa::episode_context(episode)]
                }
                None => qa::find_relevant(data.all_episodes(true), question, qa::CONTEXT_LIMIT),
            }
        };
        debug!(sources = sources.len(), "answering question");

        let prompt = qa::render_prompt(question, &sources);
        let (answer, generated) = match self
            .client
            .complete(&prompt, &self.qa_model, &self.qa_params)
            .await
        {
            Ok(reply) => (reply.trim().to_string(), true),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "question answering failed, using excerpts");
                (qa::fallback_answer(&sources), false)
            }
        };

        Ok(Answer {
            question: question.to_string(),
            answer,
            sources,
            generated,
        })
    }

    pub async fn search(&self, query: &str, field: SearchField) -> Vec<Episode> {
        let data = self.data.read().await;
        data.search(query, field).into_iter().cloned().collect()
    }

    pub async fn get_episode(&self, id: &str) -> Option<Episode> {
        self.data.read().await.get_episode(id).cloned()
    }

    pub async fn statistics(&self) -> Statistics {
        self.data.read().await.statistics()
    }

    /// Write every episode to `path`, or to a timestamped file in the
    /// exports directory. Returns the path written.
    ///
    /// `with_insights` adds cross-episode insights to a JSON export, which
    /// costs model calls; CSV exports ignore it.
    pub async fn export(
        &self,
        format: ExportFormat,
        path: Option<&Path>,
        with_insights: bool,
    ) -> SimoneResult<PathBuf> {
        let insights = match format {
            ExportFormat::Json if with_insights => {
                if self.statistics().await.valid_episodes == 0 {
                    warn!("no valid episodes, exporting without insights");
                    None
                } else {
                    Some(self.generate_insights(None, None).await?)
                }
            }
            ExportFormat::Csv if with_insights => {
                debug!("insights are not part of CSV exports");
                None
            }
            _ => None,
        };

        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.exports_dir.join(format!(
                "simone_export_{}.{}",
                Utc::now().format("%Y%m%d_%H%M%S"),
                format.extension()
            )),
        };

        let data = self.data.read().await;
        match format {
            ExportFormat::Csv => {
                data.export_csv(&path)?;
            }
            ExportFormat::Json => {
                let episodes = data.all_episodes(false);
                let mapper = ConceptMapper::build(episodes.iter().copied());
                let mut top_concepts = data.concept_frequencies();
                top_concepts.truncate(EXPORT_TOP_LIMIT);
                let mut top_philosophers = data.philosopher_frequencies();
                top_philosophers.truncate(EXPORT_TOP_LIMIT);

                let bundle = ExportBundle {
                    version: crate::VERSION,
                    exported_at: Utc::now(),
                    statistics: data.statistics(),
                    top_concepts,
                    top_philosophers,
                    concept_overview: mapper.overview(),
                    concept_graph: mapper.export_for_visualization(),
                    cross_episode_insights: insights,
                    episodes,
                };
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let writer = BufWriter::new(File::create(&path)?);
                serde_json::to_writer_pretty(writer, &bundle)?;
                info!(path = %path.display(), episodes = bundle.episodes.len(), "exported JSON");
            }
        }
        Ok(path)
    }

    pub fn cache_stats(&self) -> SimoneResult<CacheStats> {
        Ok(self.cache.stats()?)
    }

    pub fn clear_cache(&self) -> SimoneResult<usize> {
        let removed = self.cache.clear()?;
        info!(removed, "cache cleared");
        Ok(removed)
    }
}

/// Validate, analyze and wrap one transcript as an unsaved episode.
async fn analyze_input(
    analyzer: &PhilosophicalAnalyzer,
    input: TranscriptInput,
    depth: AnalysisDepth,
) -> SimoneResult<Episode> {
    validate_id(&input.id)?;
    info!(id = %input.id, title = %input.title, "analyzing episode");
    let analysis = analyzer.analyze(&input.transcript, depth).await?;
    Ok(Episode {
        id: input.id,
        title: input.title,
        source: input.source,
        processed_at: Utc::now(),
        analysis,
        transcript: input.transcript,
    })
}

/// Load `*.txt` transcripts from `dir`, sorted by file name.
fn read_transcripts(dir: &Path) -> SimoneResult<Vec<TranscriptInput>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut id = slugify(&stem);
            if id.is_empty() {
                id = uuid::Uuid::new_v4().to_string();
            }
            let transcript = std::fs::read_to_string(&path)?;
            let source = EpisodeSource {
                filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
                ..Default::default()
            };
            Ok(TranscriptInput::new(id, stem, transcript).with_source(source))
        })
        .collect()
}
