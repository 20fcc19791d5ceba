//! Configuration loading
//!
//! Resolution order: `--config <path>`, then `<config_dir>/simone/settings.yaml`
//! when it exists, then built-in defaults. The API key is taken from
//! `SIMONE_API_KEY` or `OPENAI_API_KEY` when set, overriding the file.

use crate::analysis::{AnalysisError, Chunker, DepthLevels, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::llm::{CompletionParams, RetryPolicy, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Environment variables checked for the API key, in priority order
pub const API_KEY_VARS: [&str; 2] = ["SIMONE_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub paths: PathConfig,
    pub analysis: AnalysisSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub models: ModelConfig,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            models: ModelConfig::default(),
            timeout_secs: 120,
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

/// Model names per use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Per-chunk extraction and cross-episode insights
    pub analysis: String,
    /// Question answering
    pub qa: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            analysis: "gpt-4o-mini".to_string(),
            qa: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Raw `*.txt` transcripts
    pub transcripts: PathBuf,
    /// One JSON record per analyzed episode
    pub episodes: PathBuf,
    pub cache: PathBuf,
    pub exports: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let root = default_data_dir();
        Self {
            transcripts: root.join("transcripts"),
            episodes: root.join("episodes"),
            cache: root.join("cache"),
            exports: root.join("exports"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Tokens (whitespace-separated words) per chunk
    pub chunk_size: usize,
    pub overlap: usize,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Episodes analyzed concurrently in batch runs
    pub workers: usize,
    pub cache_enabled: bool,
    pub depth_levels: DepthLevels,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            workers: 4,
            cache_enabled: true,
            depth_levels: DepthLevels::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Base directory for default paths (~/.local/share/simone on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"))
        .join("simone")
}

/// Per-user config file location, whether or not it exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("simone").join("settings.yaml"))
}

impl Config {
    /// Load, apply environment overrides and validate.
    ///
    /// An explicit `path` must exist; the per-user default is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not a mapping
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Override the API key from the environment.
    pub fn apply_env(&mut self) {
        self.apply_api_key_from(|name| std::env::var(name).ok());
    }

    fn apply_api_key_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|v| !v.trim().is_empty())
        {
            self.api.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analysis;
        if a.chunk_size == 0 {
            return Err(ConfigError::Invalid("analysis.chunk_size must be positive".into()));
        }
        if a.overlap >= a.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "analysis.overlap ({}) must be smaller than analysis.chunk_size ({})",
                a.overlap, a.chunk_size
            )));
        }
        if a.workers == 0 {
            return Err(ConfigError::Invalid("analysis.workers must be positive".into()));
        }
        if a.max_backoff_ms < a.initial_backoff_ms {
            return Err(ConfigError::Invalid(
                "analysis.max_backoff_ms must not be below analysis.initial_backoff_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn chunker(&self) -> Result<Chunker, AnalysisError> {
        Chunker::new(self.analysis.chunk_size, self.analysis.overlap)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.analysis.max_retries,
            initial_backoff: Duration::from_millis(self.analysis.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.analysis.max_backoff_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn completion_params(&self) -> CompletionParams {
        CompletionParams::default()
            .with_temperature(self.api.temperature)
            .with_max_tokens(self.api.max_tokens)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}
