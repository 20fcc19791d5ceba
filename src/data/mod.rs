//! Episode records and read queries over them

mod episode;
mod export;
mod manager;

pub use episode::{slugify, Episode, EpisodeSource, TranscriptInput};
pub use export::write_csv;
pub use manager::{DataManager, Frequency, SearchField, Statistics};
