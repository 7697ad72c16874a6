use thiserror::Error;

/// Terminal outcome of a failed resolution.
///
/// Per-attempt failures never surface as this type directly; the cascade only
/// reports the most informative failure once every candidate is exhausted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("no caption track found: {0}")]
    NoTrackFound(String),

    #[error("all {attempts} caption requests failed")]
    FetchFailed {
        attempts: usize,
        /// Whether the page advertised a caption track before the cascade ran.
        track_located: bool,
    },

    #[error("caption payload could not be parsed: {0}")]
    ParseError(String),

    #[error("transcript too short ({chars} chars, need {min})")]
    EmptyOrTooShort { chars: usize, min: usize },

    #[error("transcript resolution cancelled")]
    Cancelled,
}

/// What the UI should tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// The video has no captions we could discover.
    NoCaptions,
    /// Captions exist but could not be retrieved or parsed.
    Unretrievable,
    Cancelled,
}

impl TranscriptError {
    pub fn availability(&self) -> Availability {
        match self {
            TranscriptError::NoTrackFound(_) => Availability::NoCaptions,
            TranscriptError::FetchFailed {
                track_located: false,
                ..
            } => Availability::NoCaptions,
            TranscriptError::FetchFailed { .. }
            | TranscriptError::ParseError(_)
            | TranscriptError::EmptyOrTooShort { .. } => Availability::Unretrievable,
            TranscriptError::Cancelled => Availability::Cancelled,
        }
    }

    /// Single human-readable line for the calling UI.
    pub fn user_message(&self) -> &'static str {
        match self.availability() {
            Availability::NoCaptions => "No captions are available for this video.",
            Availability::Unretrievable => {
                "This video has captions, but they could not be retrieved or read."
            }
            Availability::Cancelled => "Transcript lookup was cancelled.",
        }
    }

    /// Ranking used to keep the most informative failure across a cascade.
    pub(crate) fn specificity(&self) -> u8 {
        match self {
            TranscriptError::Cancelled => 4,
            TranscriptError::EmptyOrTooShort { .. } => 3,
            TranscriptError::ParseError(_) => 2,
            TranscriptError::FetchFailed { .. } => 1,
            TranscriptError::NoTrackFound(_) => 0,
        }
    }
}
