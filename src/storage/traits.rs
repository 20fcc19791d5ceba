//! Storage trait definitions

use crate::data::Episode;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid episode id: {0:?}")]
    InvalidId(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Episode ids double as file stems: ASCII alphanumerics, `-`, `_` and
/// `.`, not starting with `.`.
pub fn validate_id(id: &str) -> StorageResult<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

/// Trait for episode storage backends
///
/// Implementations must be thread-safe (Send + Sync) to support
/// concurrent access from batch workers.
pub trait EpisodeStore: Send + Sync {
    /// Create or overwrite an episode
    fn save(&self, episode: &Episode) -> StorageResult<()>;

    /// Load an episode by id
    fn load(&self, id: &str) -> StorageResult<Option<Episode>>;

    /// Delete an episode, returning whether it existed
    fn delete(&self, id: &str) -> StorageResult<bool>;

    /// List stored episode ids, sorted
    fn list_ids(&self) -> StorageResult<Vec<String>>;

    /// Load every readable episode, sorted by id.
    ///
    /// Records that fail to load are skipped and logged.
    fn load_all(&self) -> StorageResult<Vec<Episode>> {
        let mut episodes = Vec::new();
        for id in self.list_ids()? {
            match self.load(&id) {
                Ok(Some(episode)) => episodes.push(episode),
                Ok(None) => {}
                Err(e) => tracing::warn!(id = %id, error = %e, "skipping unreadable episode"),
            }
        }
        Ok(episodes)
    }
}

/// Extension trait for opening stores from paths
pub trait OpenStore: EpisodeStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;
}
