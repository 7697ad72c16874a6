//! Value types that flow through one resolution call.
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use url::Url;

/// Authorship of a caption track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionKind {
    /// Human-authored captions.
    Manual,
    /// Speech-recognition captions (`kind=asr` on YouTube).
    AutoGenerated,
}

impl CaptionKind {
    /// Value of the `kind` query param understood by the timed-text endpoint.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            CaptionKind::Manual => None,
            CaptionKind::AutoGenerated => Some("asr"),
        }
    }
}

/// One caption track advertised by the player snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrackDescriptor {
    pub language_code: String,
    pub kind: CaptionKind,
    pub source_url: Url,
}

/// Wire format a candidate is requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionFormat {
    /// `fmt=json3`: `{"events":[{"segs":[{"utf8":"..."}]}]}`
    SegmentJson,
    /// `fmt=srv1`: `<transcript><text start=".." dur="..">..</text></transcript>`
    TimedXml,
}

impl CaptionFormat {
    pub fn fmt_param(self) -> &'static str {
        match self {
            CaptionFormat::SegmentJson => "json3",
            CaptionFormat::TimedXml => "srv1",
        }
    }
}

impl fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fmt_param())
    }
}

/// A single network attempt in the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCandidate {
    pub url: Url,
    pub format: CaptionFormat,
    /// Language the candidate is expected to return, for reporting.
    pub language: String,
}

/// Raw bytes returned by a candidate, tagged with the format they were requested in.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub format: CaptionFormat,
    pub body: Bytes,
}

/// How the final text was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptSource {
    Captions {
        format: CaptionFormat,
        language: String,
    },
    /// Title/description/tags from the YouTube Data API.
    Metadata,
}

/// Successful outcome of [`TranscriptResolver::resolve`](crate::TranscriptResolver::resolve).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    pub video_id: String,
    pub text: String,
    pub source: TranscriptSource,
}
