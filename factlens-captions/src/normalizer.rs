use crate::TranscriptError;

/// Shortest transcript worth forwarding; shorter output is almost always a
/// placeholder or empty track.
pub const DEFAULT_MIN_CHARS: usize = 50;

/// Collapses whitespace and enforces the minimum useful length.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptNormalizer {
    min_chars: usize,
}

impl Default for TranscriptNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CHARS)
    }
}

impl TranscriptNormalizer {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// ```
    /// use factlens_captions::{TranscriptError, TranscriptNormalizer};
    ///
    /// let n = TranscriptNormalizer::new(5);
    /// assert_eq!(n.clean("  hello \n\t world ").unwrap(), "hello world");
    /// assert_eq!(
    ///     n.clean("abcd"),
    ///     Err(TranscriptError::EmptyOrTooShort { chars: 4, min: 5 })
    /// );
    /// ```
    pub fn clean(&self, text: &str) -> Result<String, TranscriptError> {
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let chars = cleaned.chars().count();
        if chars < self.min_chars {
            return Err(TranscriptError::EmptyOrTooShort {
                chars,
                min: self.min_chars,
            });
        }
        Ok(cleaned)
    }
}
