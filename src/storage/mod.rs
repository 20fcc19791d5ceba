//! Storage backends for episode records
//!
//! Episodes are stored through the `EpisodeStore` trait.
//! The primary implementation is `JsonEpisodeStore` (one JSON file per
//! episode); `MemoryEpisodeStore` serves tests and dry runs.

mod json;
mod memory;
mod traits;

pub use json::JsonEpisodeStore;
pub use memory::MemoryEpisodeStore;
pub use traits::{validate_id, EpisodeStore, OpenStore, StorageError, StorageResult};
