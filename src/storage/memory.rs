//! In-memory episode store

use super::traits::{validate_id, EpisodeStore, StorageResult};
use crate::data::Episode;
use dashmap::DashMap;

/// Store that keeps episodes in a concurrent map. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryEpisodeStore {
    episodes: DashMap<String, Episode>,
}

impl MemoryEpisodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}

impl EpisodeStore for MemoryEpisodeStore {
    fn save(&self, episode: &Episode) -> StorageResult<()> {
        validate_id(&episode.id)?;
        self.episodes.insert(episode.id.clone(), episode.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Option<Episode>> {
        Ok(self.episodes.get(id).map(|e| e.value().clone()))
    }

    fn delete(&self, id: &str) -> StorageResult<bool> {
        Ok(self.episodes.remove(id).is_some())
    }

    fn list_ids(&self) -> StorageResult<Vec<String>> {
        let mut ids: Vec<String> = self.episodes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_episode;

    #[test]
    fn behaves_like_a_store() {
        let store = MemoryEpisodeStore::new();
        store.save(&sample_episode("z", "Z", &[])).unwrap();
        store.save(&sample_episode("a", "A", &[])).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.list_ids().unwrap(), vec!["a", "z"]);
        assert_eq!(store.load_all().unwrap()[0].id, "a");
        assert!(store.delete("z").unwrap());
        assert!(store.load("z").unwrap().is_none());
    }
}
