//! JSON-file storage: one document per episode

use super::traits::{validate_id, EpisodeStore, OpenStore, StorageResult};
use crate::data::Episode;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bookkeeping files that may share the directory with episode records
const RESERVED_STEMS: &[&str] = &["episode_index", "processing_checkpoint"];

/// Store keeping each episode at `<dir>/<id>.json`.
///
/// Writes overwrite the whole file; there is no cross-file transaction.
#[derive(Debug, Clone)]
pub struct JsonEpisodeStore {
    dir: PathBuf,
}

impl JsonEpisodeStore {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> StorageResult<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

impl OpenStore for JsonEpisodeStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = path.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "episode store opened");
        Ok(Self { dir })
    }
}

impl EpisodeStore for JsonEpisodeStore {
    fn save(&self, episode: &Episode) -> StorageResult<()> {
        let path = self.path_for(&episode.id)?;
        let json = serde_json::to_vec_pretty(episode)?;
        fs::write(&path, json)?;
        debug!(id = %episode.id, "saved episode");
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Option<Episode>> {
        let path = self.path_for(id)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn delete(&self, id: &str) -> StorageResult<bool> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_ids(&self) -> StorageResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if RESERVED_STEMS.contains(&stem) || validate_id(stem).is_err() {
                continue;
            }
            ids.push(stem.to_string());
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use crate::test_support::sample_episode;
    use tempfile::tempdir;

    #[test]
    fn save_load_delete() {
        let dir = tempdir().unwrap();
        let store = JsonEpisodeStore::open(dir.path()).unwrap();
        let episode = sample_episode("ep1", "On Virtue", &["Virtue", "Courage"]);

        store.save(&episode).unwrap();
        assert!(dir.path().join("ep1.json").exists());
        assert_eq!(store.load("ep1").unwrap(), Some(episode));

        assert!(store.delete("ep1").unwrap());
        assert!(!store.delete("ep1").unwrap());
        assert_eq!(store.load("ep1").unwrap(), None);
    }

    #[test]
    fn save_overwrites() {
        let dir = tempdir().unwrap();
        let store = JsonEpisodeStore::open(dir.path()).unwrap();
        store.save(&sample_episode("ep1", "Old", &["A"])).unwrap();
        store.save(&sample_episode("ep1", "New", &["B"])).unwrap();
        assert_eq!(store.load("ep1").unwrap().unwrap().title, "New");
        assert_eq!(store.list_ids().unwrap(), vec!["ep1"]);
    }

    #[test]
    fn listing_skips_bookkeeping_and_foreign_files() {
        let dir = tempdir().unwrap();
        let store = JsonEpisodeStore::open(dir.path()).unwrap();
        store.save(&sample_episode("b", "B", &[])).unwrap();
        store.save(&sample_episode("a", "A", &[])).unwrap();
        fs::write(dir.path().join("episode_index.json"), "{}").unwrap();
        fs::write(dir.path().join("processing_checkpoint.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(store.list_ids().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn load_all_skips_corrupt_records() {
        let dir = tempdir().unwrap();
        let store = JsonEpisodeStore::open(dir.path()).unwrap();
        store.save(&sample_episode("good", "Good", &["X"])).unwrap();
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();

        assert!(matches!(
            store.load("broken"),
            Err(StorageError::Serialization(_))
        ));
        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "good");
    }

    #[test]
    fn rejects_unsafe_ids() {
        let dir = tempdir().unwrap();
        let store = JsonEpisodeStore::open(dir.path()).unwrap();
        let episode = sample_episode("../escape", "X", &[]);
        assert!(matches!(
            store.save(&episode),
            Err(StorageError::InvalidId(_))
        ));
    }
}
