//! Reply cache
//!
//! Model replies are cached by a hash of (model, pass template, prompt) so
//! re-running an analysis over unchanged transcripts costs no API calls.
//! The primary implementation is `FileCache`; `NullCache` disables caching.

mod file;
mod traits;

pub use file::FileCache;
pub use traits::{
    cache_key, CacheEntry, CacheError, CacheResult, CacheStats, NullCache, ResponseCache,
};
