//! The ordered fallback cascade over caption URLs.
//!
//! Every candidate is tried at most once, strictly in order. A transport error, a
//! non-success status, an empty body, a timeout, a parse failure or a too-short
//! result all mean "try the next one"; only exhaustion is reported, as the most
//! informative failure seen along the way.
use crate::types::{
    CaptionFormat, CaptionKind, CaptionTrackDescriptor, FetchCandidate, RawPayload,
};
use crate::{TranscriptError, VideoId};
use async_trait::async_trait;
use bytes::Bytes;
use factlens_http::{HttpClient, HttpError, RequestOpts};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

pub const DEFAULT_TIMEDTEXT_ENDPOINT: &str = "https://www.youtube.com/api/timedtext";
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(8);

/// Network seam for the cascade. Any `Err` simply advances to the next candidate.
#[async_trait]
pub trait CaptionTransport: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<Bytes, HttpError>;
}

#[async_trait]
impl CaptionTransport for HttpClient {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<Bytes, HttpError> {
        self.get_bytes(
            url.as_str(),
            RequestOpts {
                allow_absolute: true,
                retries: Some(0),
                timeout: Some(timeout),
                ..Default::default()
            },
        )
        .await
    }
}

/// One row of the public-endpoint probe table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEntry {
    pub language: String,
    pub kind: CaptionKind,
}

impl ProbeEntry {
    pub fn new(language: impl Into<String>, kind: CaptionKind) -> Self {
        Self {
            language: language.into(),
            kind,
        }
    }
}

/// Ordered (language, kind) combinations probed against the public endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMatrix(Vec<ProbeEntry>);

impl Default for ProbeMatrix {
    /// `en` manual, `en` auto, `en-GB` manual, `en-GB` auto.
    fn default() -> Self {
        Self(vec![
            ProbeEntry::new("en", CaptionKind::Manual),
            ProbeEntry::new("en", CaptionKind::AutoGenerated),
            ProbeEntry::new("en-GB", CaptionKind::Manual),
            ProbeEntry::new("en-GB", CaptionKind::AutoGenerated),
        ])
    }
}

impl ProbeMatrix {
    pub fn new(entries: Vec<ProbeEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[ProbeEntry] {
        &self.0
    }
}

/// The ordered candidates for one resolution.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub candidates: Vec<FetchCandidate>,
    /// The page advertised a track, so captions are known to exist.
    pub track_located: bool,
}

enum Attempt {
    Payload(RawPayload),
    Unavailable(String),
    Cancelled,
}

pub struct CaptionFetcher {
    transport: Arc<dyn CaptionTransport>,
    timedtext_endpoint: Url,
    probe_matrix: ProbeMatrix,
    attempt_timeout: Duration,
}

impl CaptionFetcher {
    pub fn new(
        transport: Arc<dyn CaptionTransport>,
        timedtext_endpoint: Url,
        probe_matrix: ProbeMatrix,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            timedtext_endpoint,
            probe_matrix,
            attempt_timeout,
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Track URL as segment JSON, then as timed XML, then the probe table.
    pub fn plan(&self, preferred: Option<&CaptionTrackDescriptor>, video_id: &VideoId) -> FetchPlan {
        let mut candidates = Vec::with_capacity(2 + self.probe_matrix.entries().len());

        if let Some(track) = preferred {
            for format in [CaptionFormat::SegmentJson, CaptionFormat::TimedXml] {
                candidates.push(FetchCandidate {
                    url: with_format(&track.source_url, format),
                    format,
                    language: track.language_code.clone(),
                });
            }
        }

        for entry in self.probe_matrix.entries() {
            candidates.push(FetchCandidate {
                url: self.probe_url(video_id, entry),
                format: CaptionFormat::SegmentJson,
                language: entry.language.clone(),
            });
        }

        FetchPlan {
            candidates,
            track_located: preferred.is_some(),
        }
    }

    fn probe_url(&self, video_id: &VideoId, entry: &ProbeEntry) -> Url {
        let mut url = self.timedtext_endpoint.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("v", video_id.as_str());
            q.append_pair("lang", &entry.language);
            if let Some(kind) = entry.kind.query_value() {
                q.append_pair("kind", kind);
            }
            q.append_pair("fmt", CaptionFormat::SegmentJson.fmt_param());
        }
        url
    }

    /// Walk the plan until `accept` turns a payload into usable text.
    ///
    /// `accept` is the decode + normalize step; its errors are treated like any
    /// other failed attempt. Returns the text and the candidate that produced it.
    pub async fn try_in_order<F>(
        &self,
        plan: &FetchPlan,
        cancel: &CancellationToken,
        mut accept: F,
    ) -> Result<(String, FetchCandidate), TranscriptError>
    where
        F: FnMut(&RawPayload) -> Result<String, TranscriptError>,
    {
        let total = plan.candidates.len();
        let mut best: Option<TranscriptError> = None;

        for (idx, candidate) in plan.candidates.iter().enumerate() {
            let started = Instant::now();
            let payload = match self.attempt(candidate, cancel).await {
                Attempt::Cancelled => {
                    tracing::info!(
                        target: "captions.fetch",
                        attempt = idx + 1,
                        total,
                        "captions.cascade.cancelled"
                    );
                    return Err(TranscriptError::Cancelled);
                }
                Attempt::Unavailable(reason) => {
                    tracing::debug!(
                        target: "captions.fetch",
                        attempt = idx + 1,
                        total,
                        format = %candidate.format,
                        language = %candidate.language,
                        path = candidate.url.path(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        reason = %reason,
                        "captions.attempt.unavailable"
                    );
                    continue;
                }
                Attempt::Payload(payload) => payload,
            };

            match accept(&payload) {
                Ok(text) => {
                    tracing::info!(
                        target: "captions.fetch",
                        attempt = idx + 1,
                        total,
                        format = %candidate.format,
                        language = %candidate.language,
                        chars = text.chars().count(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "captions.attempt.accepted"
                    );
                    return Ok((text, candidate.clone()));
                }
                Err(err) => {
                    tracing::debug!(
                        target: "captions.fetch",
                        attempt = idx + 1,
                        total,
                        format = %candidate.format,
                        language = %candidate.language,
                        error = %err,
                        "captions.attempt.rejected"
                    );
                    if best
                        .as_ref()
                        .is_none_or(|b| err.specificity() > b.specificity())
                    {
                        best = Some(err);
                    }
                }
            }
        }

        let err = best.unwrap_or(TranscriptError::FetchFailed {
            attempts: total,
            track_located: plan.track_located,
        });
        tracing::warn!(
            target: "captions.fetch",
            total,
            track_located = plan.track_located,
            error = %err,
            "captions.cascade.exhausted"
        );
        Err(err)
    }

    async fn attempt(&self, candidate: &FetchCandidate, cancel: &CancellationToken) -> Attempt {
        if cancel.is_cancelled() {
            return Attempt::Cancelled;
        }
        let request = tokio::time::timeout(
            self.attempt_timeout,
            self.transport.fetch(&candidate.url, self.attempt_timeout),
        );
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Attempt::Cancelled,
            outcome = request => outcome,
        };
        match outcome {
            Err(_) => Attempt::Unavailable(format!("timed out after {:?}", self.attempt_timeout)),
            Ok(Err(e)) => Attempt::Unavailable(e.to_string()),
            Ok(Ok(body)) if body.iter().all(u8::is_ascii_whitespace) => {
                Attempt::Unavailable("empty body".to_string())
            }
            Ok(Ok(body)) => Attempt::Payload(RawPayload {
                format: candidate.format,
                body,
            }),
        }
    }
}

/// Replace any `fmt` selector on `url` with the one for `format`.
pub fn with_format(url: &Url, format: CaptionFormat) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut out = url.clone();
    {
        let mut q = out.query_pairs_mut();
        q.clear();
        q.extend_pairs(kept);
        q.append_pair("fmt", format.fmt_param());
    }
    out
}
