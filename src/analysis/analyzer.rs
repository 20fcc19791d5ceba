//! Multi-pass transcript analyzer

use super::chunker::{Chunk, Chunker};
use super::merger::ResultMerger;
use super::prompts;
use super::types::{
    AnalysisDepth, AnalysisError, AnalysisPass, AnalysisStatus, DepthLevels, EpisodeAnalysis,
    EpisodeMetrics, FailureKind, Findings, MetaAnalysis, UnitFailure,
};
use crate::cache::{cache_key, CacheEntry, ResponseCache};
use crate::llm::{CompletionParams, LlmClient, LlmError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs the configured passes over every chunk of a transcript and merges
/// the results.
///
/// Units run sequentially; parallelism lives one level up, across episodes.
/// Replies are cached only once they parse, so a malformed reply is
/// requested again on the next run. Cache keys cover the model, template,
/// prompt and sampling parameters.
pub struct PhilosophicalAnalyzer {
    client: Arc<dyn LlmClient>,
    cache: Arc<dyn ResponseCache>,
    chunker: Chunker,
    model: String,
    params: CompletionParams,
    depth_levels: DepthLevels,
    merger: ResultMerger,
}

/// Outcome of a unit that produced no findings
enum UnitError {
    /// Aborts the whole analysis
    Fatal(LlmError),
    Failed(FailureKind, String),
}

impl PhilosophicalAnalyzer {
    pub fn new(
        client: Arc<dyn LlmClient>,
        cache: Arc<dyn ResponseCache>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            cache,
            chunker: Chunker::default(),
            model: model.into(),
            params: CompletionParams::default().with_system(prompts::SYSTEM_PROMPT),
            depth_levels: DepthLevels::default(),
            merger: ResultMerger::new(),
        }
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Replace sampling parameters. The analysis system prompt is kept
    /// unless `params` carries its own.
    pub fn with_params(mut self, params: CompletionParams) -> Self {
        let system = params.system.clone().or(self.params.system.take());
        self.params = CompletionParams { system, ..params };
        self
    }

    pub fn with_depth_levels(mut self, depth_levels: DepthLevels) -> Self {
        self.depth_levels = depth_levels;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Analyze one transcript at the given depth.
    ///
    /// Non-fatal unit failures are recorded on the result and downgrade its
    /// status; fatal API errors (authentication, quota, unknown model)
    /// abort and surface to the caller.
    pub async fn analyze(
        &self,
        transcript: &str,
        depth: AnalysisDepth,
    ) -> Result<EpisodeAnalysis, AnalysisError> {
        let chunks = self.chunker.split(transcript);
        if chunks.is_empty() {
            return Err(AnalysisError::EmptyTranscript);
        }
        let passes = self.depth_levels.passes_for(depth).to_vec();

        info!(
            chunks = chunks.len(),
            passes = passes.len(),
            %depth,
            model = %self.model,
            "analyzing transcript"
        );

        let mut parts = Vec::with_capacity(chunks.len() * passes.len());
        let mut failures = Vec::new();

        for chunk in &chunks {
            for &pass in &passes {
                match self.run_unit(chunk, pass).await {
                    Ok(findings) => parts.push(findings),
                    Err(UnitError::Fatal(e)) => {
                        warn!(chunk = chunk.index, %pass, error = %e, "fatal API error, aborting analysis");
                        return Err(AnalysisError::Api(e));
                    }
                    Err(UnitError::Failed(kind, message)) => {
                        warn!(chunk = chunk.index, %pass, ?kind, %message, "analysis unit failed");
                        failures.push(UnitFailure {
                            chunk_index: chunk.index,
                            pass,
                            kind,
                            message,
                        });
                    }
                }
            }
        }

        let status = if parts.is_empty() {
            AnalysisStatus::Failed
        } else if failures.is_empty() {
            AnalysisStatus::Complete
        } else {
            AnalysisStatus::Partial
        };

        let findings = self.merger.merge(parts);
        let metrics = EpisodeMetrics::from_findings(&findings);
        let meta = if !findings.is_empty() && self.depth_levels.runs_meta(depth) {
            self.meta_analyze(&findings).await?
        } else {
            None
        };

        info!(
            ?status,
            concepts = findings.concepts.len(),
            failures = failures.len(),
            "analysis finished"
        );

        Ok(EpisodeAnalysis {
            status,
            depth,
            model: self.model.clone(),
            passes,
            chunk_count: chunks.len(),
            findings,
            metrics,
            meta,
            failures,
        })
    }

    async fn run_unit(&self, chunk: &Chunk, pass: AnalysisPass) -> Result<Findings, UnitError> {
        let prompt = prompts::render(pass, &chunk.text);
        debug!(chunk = chunk.index, %pass, "running analysis unit");
        self.cached_request(&prompts::template_id(pass), &prompt, |reply| {
            prompts::parse_findings(pass, reply)
        })
        .await
    }

    /// One call over the merged findings. Only fatal errors propagate; any
    /// other failure leaves the episode without a meta-analysis.
    async fn meta_analyze(&self, findings: &Findings) -> Result<Option<MetaAnalysis>, AnalysisError> {
        let prompt = prompts::render_meta(findings);
        match self
            .cached_request(&prompts::meta_template_id(), &prompt, prompts::parse_meta)
            .await
        {
            Ok(meta) => Ok((!meta.is_empty()).then_some(meta)),
            Err(UnitError::Fatal(e)) => {
                warn!(error = %e, "fatal API error during meta-analysis");
                Err(AnalysisError::Api(e))
            }
            Err(UnitError::Failed(kind, message)) => {
                warn!(?kind, %message, "meta-analysis failed");
                Ok(None)
            }
        }
    }

    /// Serve `prompt` from the cache or the client, caching the reply only
    /// once `parse` accepts it.
    async fn cached_request<T>(
        &self,
        template: &str,
        prompt: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, UnitError> {
        let variant = format!("{}|{}", template, self.params.fingerprint());
        let key = cache_key(&self.model, &variant, prompt);

        if let Some(entry) = self.cache.get(&key) {
            match parse(&entry.response) {
                Some(parsed) => {
                    debug!(template, "using cached reply");
                    return Ok(parsed);
                }
                None => warn!(template, "cached reply does not parse, re-requesting"),
            }
        }

        let reply = self
            .client
            .complete(prompt, &self.model, &self.params)
            .await
            .map_err(|e| {
                if e.is_fatal() {
                    UnitError::Fatal(e)
                } else {
                    UnitError::Failed(FailureKind::Api, e.to_string())
                }
            })?;

        let parsed = parse(&reply).ok_or_else(|| {
            UnitError::Failed(
                FailureKind::Parse,
                "reply did not contain a JSON object".to_string(),
            )
        })?;

        let entry = CacheEntry::new(key, reply, self.model.as_str(), template);
        if let Err(e) = self.cache.set(&entry) {
            warn!(error = %e, "failed to cache reply");
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FileCache, NullCache};
    use crate::llm::ScriptedClient;
    use tempfile::tempdir;

    fn reply_for(prompt: &str) -> Result<String, LlmError> {
        if prompt.starts_with("Identify what") {
            Ok(r#"{"primary_topic": "Stoicism", "summary": "About control."}"#.to_string())
        } else if prompt.starts_with("Extract the philosophical") {
            Ok(r#"{"concepts": [{"name": "Virtue"}], "philosophers": ["Epictetus"]}"#.to_string())
        } else if prompt.starts_with("Trace the connections") {
            Ok(r#"{"works_cited": ["Discourses"], "philosophers": ["epictetus"]}"#.to_string())
        } else if prompt.starts_with("Assess") {
            Ok(r#"{"approach": "practical Stoicism", "depth": "medium"}"#.to_string())
        } else {
            Ok(r#"{"insights": ["Focus on what you control"]}"#.to_string())
        }
    }

    fn analyzer(client: Arc<ScriptedClient>, cache: Arc<dyn ResponseCache>) -> PhilosophicalAnalyzer {
        PhilosophicalAnalyzer::new(client, cache, "test-model")
            .with_chunker(Chunker::new(6, 2).unwrap())
    }

    const TRANSCRIPT: &str = "one two three four five six seven eight nine ten";

    #[tokio::test]
    async fn deep_analysis_runs_every_pass_on_every_chunk() {
        let client = Arc::new(ScriptedClient::responding_with(reply_for));
        let result = analyzer(client.clone(), Arc::new(NullCache))
            .analyze(TRANSCRIPT, AnalysisDepth::Deep)
            .await
            .unwrap();

        // 10 words, size 6, overlap 2: windows [0,6) [4,10); four passes
        // each, then one meta-analysis call
        assert_eq!(result.chunk_count, 2);
        assert_eq!(client.call_count(), 9);
        assert_eq!(result.status, AnalysisStatus::Complete);
        assert_eq!(result.findings.concepts.len(), 1);
        assert_eq!(result.findings.insights.len(), 2);
        assert_eq!(result.findings.primary_topic.as_deref(), Some("Stoicism"));
        assert_eq!(result.findings.philosophers, vec!["Epictetus"]);
        assert_eq!(result.findings.works_cited, vec!["Discourses"]);
        assert_eq!(result.metrics.concepts_count, 1);

        let meta = result.meta.unwrap();
        assert_eq!(meta.approach.as_deref(), Some("practical Stoicism"));
        assert_eq!(meta.depth.as_deref(), Some("medium"));
    }

    #[tokio::test]
    async fn meta_analysis_only_at_configured_depths() {
        let client = Arc::new(ScriptedClient::responding_with(reply_for));
        let result = analyzer(client.clone(), Arc::new(NullCache))
            .analyze(TRANSCRIPT, AnalysisDepth::Standard)
            .await
            .unwrap();
        assert!(result.meta.is_none());
        assert_eq!(client.call_count(), 4);
        assert!(client.prompts().iter().all(|p| !p.starts_with("Assess")));
    }

    #[tokio::test]
    async fn failed_meta_analysis_keeps_episode_complete() {
        let client = Arc::new(ScriptedClient::responding_with(|prompt| {
            if prompt.starts_with("Assess") {
                Err(LlmError::Server {
                    status: 502,
                    message: "bad gateway".into(),
                })
            } else {
                reply_for(prompt)
            }
        }));
        let result = analyzer(client, Arc::new(NullCache))
            .analyze(TRANSCRIPT, AnalysisDepth::Deep)
            .await
            .unwrap();
        assert_eq!(result.status, AnalysisStatus::Complete);
        assert!(result.meta.is_none());
        assert!(result.failures.is_empty());
    }

    #[tokio::test]
    async fn sampling_params_are_part_of_the_cache_key() {
        let dir = tempdir().unwrap();
        let cache: Arc<dyn ResponseCache> = Arc::new(FileCache::open(dir.path()).unwrap());

        let first = Arc::new(ScriptedClient::responding_with(reply_for));
        analyzer(first.clone(), cache.clone())
            .analyze(TRANSCRIPT, AnalysisDepth::Quick)
            .await
            .unwrap();
        assert_eq!(first.call_count(), 2);

        let warmer = Arc::new(ScriptedClient::responding_with(reply_for));
        analyzer(warmer.clone(), cache.clone())
            .with_params(CompletionParams::default().with_temperature(0.9))
            .analyze(TRANSCRIPT, AnalysisDepth::Quick)
            .await
            .unwrap();
        assert_eq!(warmer.call_count(), 2);

        let same = Arc::new(ScriptedClient::new());
        analyzer(same.clone(), cache)
            .analyze(TRANSCRIPT, AnalysisDepth::Quick)
            .await
            .unwrap();
        assert_eq!(same.call_count(), 0);
    }

    #[tokio::test]
    async fn cached_units_issue_no_calls() {
        let dir = tempdir().unwrap();
        let cache: Arc<dyn ResponseCache> = Arc::new(FileCache::open(dir.path()).unwrap());

        let first = Arc::new(ScriptedClient::responding_with(reply_for));
        let a = analyzer(first.clone(), cache.clone())
            .analyze(TRANSCRIPT, AnalysisDepth::Standard)
            .await
            .unwrap();
        assert_eq!(first.call_count(), 4);

        let second = Arc::new(ScriptedClient::new());
        let b = analyzer(second.clone(), cache)
            .analyze(TRANSCRIPT, AnalysisDepth::Standard)
            .await
            .unwrap();
        assert_eq!(second.call_count(), 0);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn unparseable_reply_marks_partial_and_is_not_cached() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(FileCache::open(dir.path()).unwrap());
        let client = Arc::new(
            ScriptedClient::responding_with(reply_for).with_reply("Sorry, no JSON today."),
        );

        let result = analyzer(client, cache.clone())
            .analyze("short transcript", AnalysisDepth::Standard)
            .await
            .unwrap();

        assert_eq!(result.status, AnalysisStatus::Partial);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].kind, FailureKind::Parse);
        assert_eq!(result.failures[0].pass, AnalysisPass::Topics);
        assert_eq!(cache.stats().unwrap().entries, 1);
    }

    #[tokio::test]
    async fn all_units_failing_yields_failed_status() {
        let client = Arc::new(ScriptedClient::responding_with(|_| {
            Err(LlmError::Server {
                status: 503,
                message: "down".into(),
            })
        }));
        let result = analyzer(client, Arc::new(NullCache))
            .analyze("short transcript", AnalysisDepth::Quick)
            .await
            .unwrap();
        assert_eq!(result.status, AnalysisStatus::Failed);
        assert!(!result.is_valid());
        assert_eq!(result.failures[0].kind, FailureKind::Api);
    }

    #[tokio::test]
    async fn fatal_error_aborts() {
        let client = Arc::new(
            ScriptedClient::responding_with(reply_for)
                .with_error(LlmError::Authentication("bad key".into())),
        );
        let err = analyzer(client.clone(), Arc::new(NullCache))
            .analyze(TRANSCRIPT, AnalysisDepth::Deep)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Api(LlmError::Authentication(_))));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn invalid_request_aborts() {
        let client = Arc::new(
            ScriptedClient::responding_with(reply_for)
                .with_error(LlmError::InvalidRequest("context_length_exceeded".into())),
        );
        let err = analyzer(client.clone(), Arc::new(NullCache))
            .analyze(TRANSCRIPT, AnalysisDepth::Standard)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Api(LlmError::InvalidRequest(_))));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_transcript_is_rejected() {
        let client = Arc::new(ScriptedClient::new());
        let err = analyzer(client, Arc::new(NullCache))
            .analyze("   ", AnalysisDepth::Quick)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyTranscript));
    }

    #[test]
    fn custom_params_keep_system_prompt() {
        let client = Arc::new(ScriptedClient::new());
        let analyzer = PhilosophicalAnalyzer::new(client, Arc::new(NullCache), "m")
            .with_params(CompletionParams::default().with_temperature(0.7));
        assert_eq!(analyzer.params.system.as_deref(), Some(prompts::SYSTEM_PROMPT));
        assert_eq!(analyzer.params.temperature, 0.7);
    }
}
