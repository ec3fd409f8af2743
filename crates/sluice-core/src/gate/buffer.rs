//! Bounded buffer for output withheld under an open hold.

/// Buffers text chunks under a hard character budget while a hold is open.
///
/// The cap is all-or-nothing: a chunk that would push the running total past
/// `max_chars` is refused entirely, not truncated, and nothing is evicted.
/// When [`append`](Self::append) returns `false` the caller must stop
/// buffering and force gate resolution. The buffer lives for the duration of
/// one hold and is discarded on flush or hold resolution.
#[derive(Debug)]
pub struct BufferedStreamer {
    chunks: Vec<String>,
    char_count: usize,
    max_chars: usize,
}

impl BufferedStreamer {
    /// Creates a buffer with the given character budget.
    #[must_use]
    pub fn new(max_chars: usize) -> Self {
        Self { chunks: Vec::new(), char_count: 0, max_chars }
    }

    /// Appends a chunk if the running total stays within the budget.
    ///
    /// Returns `true` if the chunk was buffered, `false` if it was refused.
    pub fn append(&mut self, chunk: &str) -> bool {
        let chunk_chars = chunk.chars().count();
        if self.char_count + chunk_chars > self.max_chars {
            return false;
        }
        self.char_count += chunk_chars;
        self.chunks.push(chunk.to_string());
        true
    }

    /// Returns and clears all buffered chunks.
    pub fn flush(&mut self) -> Vec<String> {
        self.char_count = 0;
        std::mem::take(&mut self.chunks)
    }

    /// Current buffered character count.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.char_count
    }

    /// True if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
