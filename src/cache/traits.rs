//! Cache trait definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing or maintaining the cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A cached raw model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    /// Raw reply text exactly as returned by the model
    pub response: String,
    pub model: String,
    /// Template identifier of the analysis pass that produced the prompt
    pub pass: String,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(
        key: impl Into<String>,
        response: impl Into<String>,
        model: impl Into<String>,
        pass: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            response: response.into(),
            model: model.into(),
            pass: pass.into(),
            created_at: Utc::now(),
        }
    }
}

/// Summary of what the cache holds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub location: Option<PathBuf>,
}

/// Compute the cache key for a request.
///
/// The formatted prompt embeds both the chunk text and the template, and
/// the template id carries its version, so a change to any of transcript,
/// template or model yields a different key.
pub fn cache_key(model: &str, template_id: &str, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0x1f]);
    hasher.update(template_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Trait for reply cache backends
///
/// `get` never fails: an unreadable or corrupt entry is reported as absent
/// so the caller re-fetches. Implementations must be thread-safe.
pub trait ResponseCache: Send + Sync {
    /// Look up an entry by key
    fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Insert or overwrite an entry
    fn set(&self, entry: &CacheEntry) -> CacheResult<()>;

    /// Remove an entry, returning whether it existed
    fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remove every entry, returning how many were removed
    fn clear(&self) -> CacheResult<usize>;

    fn stats(&self) -> CacheResult<CacheStats>;
}

/// Cache that stores nothing. Used when caching is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl ResponseCache for NullCache {
    fn get(&self, _key: &str) -> Option<CacheEntry> {
        None
    }

    fn set(&self, _entry: &CacheEntry) -> CacheResult<()> {
        Ok(())
    }

    fn delete(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    fn clear(&self) -> CacheResult<usize> {
        Ok(0)
    }

    fn stats(&self) -> CacheResult<CacheStats> {
        Ok(CacheStats::default())
    }
}
