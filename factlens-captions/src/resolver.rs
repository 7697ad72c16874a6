use crate::fetcher::CaptionFetcher;
use crate::locator::{select_preferred, tracks_from_player_response};
use crate::metadata::MetadataFallback;
use crate::parser;
use crate::snapshot::PlayerSnapshotSource;
use crate::types::{Transcript, TranscriptSource};
use crate::{TranscriptError, TranscriptNormalizer, VideoId};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Turns a video URL into transcript text or one classified failure.
///
/// Holds no per-call state, so one resolver can serve any number of calls.
pub struct TranscriptResolver {
    fetcher: CaptionFetcher,
    snapshot: Arc<dyn PlayerSnapshotSource>,
    metadata: Option<MetadataFallback>,
    normalizer: TranscriptNormalizer,
    snapshot_timeout: Duration,
}

impl TranscriptResolver {
    pub fn new(fetcher: CaptionFetcher, snapshot: Arc<dyn PlayerSnapshotSource>) -> Self {
        let snapshot_timeout = fetcher.attempt_timeout();
        Self {
            fetcher,
            snapshot,
            metadata: None,
            normalizer: TranscriptNormalizer::default(),
            snapshot_timeout,
        }
    }

    pub fn with_normalizer(mut self, normalizer: TranscriptNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataFallback) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub async fn resolve(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Transcript, TranscriptError> {
        let Some(video_id) = VideoId::from_url(url) else {
            tracing::warn!(target: "captions.resolve", url, "captions.resolve.bad_url");
            return Err(TranscriptError::NoTrackFound(format!(
                "not a recognised video url: {url}"
            )));
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TranscriptError::Cancelled),
            r = tokio::time::timeout(self.snapshot_timeout, self.snapshot.player_response(&video_id)) => {
                r.ok().flatten()
            }
        };
        let tracks = response
            .as_ref()
            .map(tracks_from_player_response)
            .unwrap_or_default();
        let preferred = select_preferred(&tracks);
        tracing::info!(
            target: "captions.resolve",
            video_id = %video_id,
            snapshot = response.is_some(),
            tracks = tracks.len(),
            preferred_language = preferred.map(|t| t.language_code.as_str()),
            "captions.resolve.located"
        );

        let plan = self.fetcher.plan(preferred, &video_id);
        let normalizer = self.normalizer;
        let outcome = self
            .fetcher
            .try_in_order(&plan, cancel, |payload| {
                let text = parser::decode(payload)
                    .map_err(|e| TranscriptError::ParseError(e.to_string()))?;
                normalizer.clean(&text)
            })
            .await;

        match outcome {
            Ok((text, candidate)) => Ok(Transcript {
                video_id: video_id.to_string(),
                text,
                source: TranscriptSource::Captions {
                    format: candidate.format,
                    language: candidate.language,
                },
            }),
            Err(TranscriptError::Cancelled) => Err(TranscriptError::Cancelled),
            Err(err) => self.fall_back_to_metadata(video_id, err, cancel).await,
        }
    }

    async fn fall_back_to_metadata(
        &self,
        video_id: VideoId,
        caption_err: TranscriptError,
        cancel: &CancellationToken,
    ) -> Result<Transcript, TranscriptError> {
        let Some(metadata) = &self.metadata else {
            return Err(caption_err);
        };

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TranscriptError::Cancelled),
            r = metadata.text(&video_id, self.normalizer.min_chars()) => r,
        };
        match fetched {
            Ok(text) => {
                tracing::info!(
                    target: "captions.resolve",
                    video_id = %video_id,
                    caption_error = %caption_err,
                    chars = text.chars().count(),
                    "captions.resolve.metadata_fallback"
                );
                Ok(Transcript {
                    video_id: video_id.to_string(),
                    text,
                    source: TranscriptSource::Metadata,
                })
            }
            Err(e) => {
                tracing::warn!(
                    target: "captions.resolve",
                    video_id = %video_id,
                    error = %e,
                    "captions.resolve.metadata_failed"
                );
                Err(caption_err)
            }
        }
    }
}
