//! File-backed reply cache: one JSON document per entry

use super::traits::{CacheEntry, CacheError, CacheResult, CacheStats, ResponseCache};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Cache storing each entry as `<dir>/<key>.json`.
///
/// Grows without bound; entries go away only through `delete`/`clear`.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> CacheResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "reply cache opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> CacheResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn entry_files(&self) -> CacheResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl ResponseCache for FileCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.entry_path(key).ok()?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key, error = %e, "unreadable cache entry, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&text) {
            Ok(entry) if entry.key == key => {
                debug!(key, "cache hit");
                Some(entry)
            }
            Ok(_) => {
                warn!(key, "cache entry key mismatch, treating as miss");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    fn set(&self, entry: &CacheEntry) -> CacheResult<()> {
        let path = self.entry_path(&entry.key)?;
        let json = serde_json::to_vec_pretty(entry)?;
        fs::write(&path, json)?;
        debug!(key = %entry.key, "cached reply");
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> CacheResult<usize> {
        let files = self.entry_files()?;
        let count = files.len();
        for path in files {
            fs::remove_file(path)?;
        }
        info!(count, "cleared reply cache");
        Ok(count)
    }

    fn stats(&self) -> CacheResult<CacheStats> {
        let files = self.entry_files()?;
        let mut total_bytes = 0;
        for path in &files {
            total_bytes += fs::metadata(path)?.len();
        }
        Ok(CacheStats {
            entries: files.len(),
            total_bytes,
            location: Some(self.dir.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::cache_key;
    use tempfile::tempdir;

    fn entry(key: &str, response: &str) -> CacheEntry {
        CacheEntry::new(key, response, "gpt-4o-mini", "concepts@v1")
    }

    #[test]
    fn set_then_get() {
        let dir = tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        let key = cache_key("m", "t", "p");

        assert!(cache.get(&key).is_none());
        cache.set(&entry(&key, "reply")).unwrap();

        let hit = cache.get(&key).expect("entry should be cached");
        assert_eq!(hit.response, "reply");
        assert_eq!(hit.model, "gpt-4o-mini");
    }

    #[test]
    fn overwrite_replaces_whole_entry() {
        let dir = tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        cache.set(&entry("abc", "first")).unwrap();
        cache.set(&entry("abc", "second")).unwrap();
        assert_eq!(cache.get("abc").unwrap().response, "second");
        assert_eq!(cache.stats().unwrap().entries, 1);
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        fs::write(dir.path().join("deadbeef.json"), "{ not json").unwrap();
        assert!(cache.get("deadbeef").is_none());

        // A fresh write repairs it
        cache.set(&entry("deadbeef", "ok")).unwrap();
        assert_eq!(cache.get("deadbeef").unwrap().response, "ok");
    }

    #[test]
    fn entry_under_wrong_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        let json = serde_json::to_string(&entry("other", "x")).unwrap();
        fs::write(dir.path().join("mine.json"), json).unwrap();
        assert!(cache.get("mine").is_none());
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        assert!(cache.get("../escape").is_none());
        assert!(matches!(
            cache.set(&entry("../escape", "x")),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn delete_clear_and_stats() {
        let dir = tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        for key in ["a1", "b2", "c3"] {
            cache.set(&entry(key, "payload")).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "not an entry").unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.entries, 3);
        assert!(stats.total_bytes > 0);
        assert_eq!(stats.location.as_deref(), Some(dir.path()));

        assert!(cache.delete("a1").unwrap());
        assert!(!cache.delete("a1").unwrap());

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.stats().unwrap().entries, 0);
        assert!(dir.path().join("notes.txt").exists());
    }
}
