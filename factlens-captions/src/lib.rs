//! Caption resolution and transcript normalisation for YouTube videos.
//!
//! [`TranscriptResolver::resolve`] extracts the video id, reads an optional player
//! snapshot to find advertised caption tracks, then walks an ordered cascade of
//! caption URLs until one yields usable text:
//!
//! 1. the preferred track as segment JSON (`fmt=json3`),
//! 2. the same track as timed XML (`fmt=srv1`),
//! 3. the public timed-text endpoint for each [`ProbeMatrix`] row.
//!
//! Individual attempt failures are logged and skipped. Only exhaustion is reported,
//! as a [`TranscriptError`] whose [`availability`](TranscriptError::availability)
//! separates "no captions" from "captions we could not read".

pub mod error;
pub mod fetcher;
pub mod locator;
pub mod metadata;
pub mod normalizer;
pub mod parser;
pub mod resolver;
pub mod snapshot;
pub mod types;
pub mod video_id;

pub use error::{Availability, TranscriptError};
pub use fetcher::{
    CaptionFetcher, CaptionTransport, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_TIMEDTEXT_ENDPOINT,
    FetchPlan, ProbeEntry, ProbeMatrix,
};
pub use metadata::{DEFAULT_DATA_API_ENDPOINT, MetadataError, MetadataFallback};
pub use normalizer::{DEFAULT_MIN_CHARS, TranscriptNormalizer};
pub use resolver::TranscriptResolver;
pub use snapshot::{NoSnapshot, PlayerSnapshotSource, StaticSnapshot, WatchPageSnapshot};
pub use types::{
    CaptionFormat, CaptionKind, CaptionTrackDescriptor, FetchCandidate, RawPayload, Transcript,
    TranscriptSource,
};
pub use video_id::VideoId;
