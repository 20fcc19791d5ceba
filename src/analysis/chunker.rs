//! Overlapping transcript windows

use super::types::AnalysisError;

pub const DEFAULT_CHUNK_SIZE: usize = 4000;
pub const DEFAULT_OVERLAP: usize = 200;

/// A window of the transcript sent to the model in one call
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    /// Words of the window joined by single spaces
    pub text: String,
    pub start_token: usize,
    pub end_token: usize,
}

/// Splits text into windows of `size` tokens, each sharing `overlap`
/// tokens with the previous one.
///
/// Tokens are whitespace-separated words. Whitespace is normalised, so two
/// transcripts differing only in spacing produce identical chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, AnalysisError> {
        if size == 0 {
            return Err(AnalysisError::InvalidChunking(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= size {
            return Err(AnalysisError::InvalidChunking(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let step = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.size).min(words.len());
            chunks.push(Chunk {
                index: chunks.len(),
                text: words[start..end].join(" "),
                start_token: start,
                end_token: end,
            });
            if end == words.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(10, 10).is_err());
        assert!(Chunker::new(10, 11).is_err());
        assert!(Chunker::new(10, 9).is_ok());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = Chunker::new(10, 2).unwrap().split("a  b\n\tc");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a b c");
        assert_eq!((chunks[0].start_token, chunks[0].end_token), (0, 3));
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(Chunker::default().split("  \n ").is_empty());
    }

    #[test]
    fn windows_overlap() {
        let chunks = Chunker::new(10, 3).unwrap().split(&words(24));
        let spans: Vec<_> = chunks.iter().map(|c| (c.start_token, c.end_token)).collect();
        assert_eq!(spans, vec![(0, 10), (7, 17), (14, 24)]);
        assert!(chunks[1].text.starts_with("w7 w8 w9"));
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn exact_fit_does_not_emit_tail_chunk() {
        let chunks = Chunker::new(10, 2).unwrap().split(&words(10));
        assert_eq!(chunks.len(), 1);
    }
}
