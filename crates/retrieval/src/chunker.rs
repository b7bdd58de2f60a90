//! Sliding-window text chunking.
//!
//! Windows are measured in characters (Unicode scalar values), so a window
//! never splits a code point. Each window is trimmed and empty windows are
//! dropped; offsets refer to the untrimmed window start.

use {serde::Serialize, tracing::warn, uuid::Uuid};

use crate::error::RetrievalError;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Hard cap on windows per document. Also bounds a window that never advances.
pub const MAX_WINDOWS: usize = 1000;

/// A bounded, trimmed slice of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Unique across documents: `chunk_{window}_{random}`.
    pub id: String,
    pub text: String,
    /// Character offset of the window in the source text.
    pub start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    /// Rejects windows that would not advance (`chunk_overlap >= chunk_size`).
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RetrievalError> {
        if chunk_size == 0 {
            return Err(RetrievalError::validation("chunk size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(RetrievalError::validation(format!(
                "chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Distance between consecutive window starts.
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    pub fn split(&self, text: &str) -> Vec<Chunk> {
        split_windows(text, self.chunk_size, self.chunk_overlap)
    }

    /// Whether [`MAX_WINDOWS`] stops `split` before the end of `text`.
    pub fn truncates(&self, text: &str) -> bool {
        text.chars().count() > MAX_WINDOWS.saturating_mul(self.step())
    }
}

/// Unchecked sliding window; [`MAX_WINDOWS`] is the only termination guard
/// when `overlap >= size`.
pub(crate) fn split_windows(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = bounds.len() - 1;
    let step = size.saturating_sub(overlap);

    let mut chunks = Vec::new();
    let mut start = 0;
    for window in 0..MAX_WINDOWS {
        if start >= char_len {
            break;
        }
        let end = start.saturating_add(size).min(char_len);
        let trimmed = text[bounds[start]..bounds[end]].trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk {
                id: chunk_id(window),
                text: trimmed.to_string(),
                start,
            });
        }
        start += step;
    }
    if start < char_len {
        warn!(
            chars = char_len,
            covered = start,
            max_windows = MAX_WINDOWS,
            "window cap reached, rest of the document is not chunked"
        );
    }
    chunks
}

fn chunk_id(window: usize) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("chunk_{window}_{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use {super::*, std::collections::HashSet};

    fn alphabet(len: usize) -> String {
        (b'a'..=b'z').cycle().take(len).map(char::from).collect()
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(Chunker::default().split("").is_empty());
    }

    #[test]
    fn whitespace_only_text_yields_nothing() {
        assert!(Chunker::default().split("   \n\t  ").is_empty());
    }

    #[test]
    fn thousand_a_splits_at_expected_offsets() {
        let text = "a".repeat(1000);
        let chunks = Chunker::new(500, 50).unwrap().split(&text);

        let starts: Vec<usize> = chunks.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0, 450, 900]);
        let lens: Vec<usize> = chunks.iter().map(|c| c.text.chars().count()).collect();
        assert_eq!(lens, vec![500, 500, 100]);
    }

    #[test]
    fn short_text_is_single_trimmed_chunk() {
        let chunks = Chunker::default().split("  hello world  ");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].start, 0);
    }

    #[test]
    fn windows_cover_text_with_exact_overlap() {
        for (len, size, overlap) in [(1000, 100, 10), (997, 64, 63), (50, 7, 3), (10, 3, 1)] {
            let text = alphabet(len);
            let chunker = Chunker::new(size, overlap).unwrap();
            let chunks = chunker.split(&text);
            let step = chunker.step();

            let mut covered = vec![false; len];
            for (i, chunk) in chunks.iter().enumerate() {
                let n = chunk.text.chars().count();
                assert!(n <= size);
                assert_eq!(chunk.start, i * step);
                let expected: String = text.chars().skip(chunk.start).take(size).collect();
                assert_eq!(chunk.text, expected);
                covered[chunk.start..chunk.start + n]
                    .iter_mut()
                    .for_each(|c| *c = true);
            }
            assert!(covered.iter().all(|c| *c), "len={len} size={size}");

            for pair in chunks.windows(2) {
                let tail: String = pair[0].text.chars().skip(step).collect();
                let head: String = pair[1].text.chars().take(size - step).collect();
                assert_eq!(tail, head);
            }
        }
    }

    #[test]
    fn never_splits_a_code_point() {
        let text = "héllo wörld ✓ ".repeat(40);
        let chunks = Chunker::new(7, 2).unwrap().split(&text);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 7));
    }

    #[test]
    fn ids_are_unique() {
        let text = alphabet(5000);
        let a = Chunker::new(100, 20).unwrap().split(&text);
        let b = Chunker::new(100, 20).unwrap().split(&text);
        let ids: HashSet<&str> = a.iter().chain(b.iter()).map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), a.len() + b.len());
        assert!(a[3].id.starts_with("chunk_3_"));
    }

    #[test]
    fn truncation_is_reported_only_past_the_cap() {
        let chunker = Chunker::new(10, 0).unwrap();
        assert!(!chunker.truncates(&"a".repeat(10 * MAX_WINDOWS)));
        assert!(chunker.truncates(&"a".repeat(10 * MAX_WINDOWS + 1)));

        let text = "é".repeat(10 * MAX_WINDOWS + 5);
        let chunks = chunker.split(&text);
        assert_eq!(chunks.len(), MAX_WINDOWS);
        assert!(chunker.truncates(&text));
        assert!(!Chunker::default().truncates(&"a".repeat(1000)));
    }

    #[test]
    fn output_is_capped() {
        let text = "x".repeat(5000);
        let chunks = Chunker::new(2, 0).unwrap().split(&text);
        assert_eq!(chunks.len(), MAX_WINDOWS);
        assert_eq!(chunks.last().unwrap().start, 2 * (MAX_WINDOWS - 1));
    }

    #[test]
    fn non_advancing_window_terminates() {
        let chunks = split_windows("abc", 5, 5);
        assert_eq!(chunks.len(), MAX_WINDOWS);
        assert!(chunks.iter().all(|c| c.start == 0 && c.text == "abc"));

        let chunks = split_windows("abc", 5, 9);
        assert_eq!(chunks.len(), MAX_WINDOWS);
    }

    #[test]
    fn rejects_non_advancing_config() {
        assert!(Chunker::new(500, 500).unwrap_err().is_validation());
        assert!(Chunker::new(500, 501).is_err());
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(1, 0).is_ok());
    }

    #[test]
    fn drops_blank_windows() {
        let text = format!("{}{}", "a".repeat(10), " ".repeat(30));
        let chunks = Chunker::new(10, 0).unwrap().split(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a".repeat(10));
    }
}
