//! Last-resort text from the YouTube Data API `videos` snippet.
use crate::VideoId;
use factlens_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATA_API_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("no video found for id={0}")]
    NotFound(String),
    #[error("metadata too short ({chars} chars, need {min})")]
    TooShort { chars: usize, min: usize },
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct CaptionListResponse {
    #[serde(default)]
    items: Vec<CaptionListItem>,
}

#[derive(Debug, Deserialize)]
struct CaptionListItem {
    #[serde(default)]
    snippet: CaptionListSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionListSnippet {
    #[serde(default)]
    language: String,
    #[serde(default)]
    track_kind: String,
}

impl CaptionListSnippet {
    /// `en (asr)`; missing fields print as `?`.
    fn label(&self) -> String {
        let or_unknown = |s: &str| if s.is_empty() { "?".to_string() } else { s.to_string() };
        format!("{} ({})", or_unknown(&self.language), or_unknown(&self.track_kind))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Snippet {
    /// Paragraph-separated summary; empty channel, description and tags are omitted.
    pub fn render(&self) -> String {
        let mut parts = vec![format!("Video title: {}", self.title.trim())];
        if !self.channel_title.trim().is_empty() {
            parts.push(format!("Channel: {}", self.channel_title.trim()));
        }
        if !self.description.trim().is_empty() {
            parts.push(format!("Description: {}", self.description.trim()));
        }
        if !self.tags.is_empty() {
            parts.push(format!("Tags: {}", self.tags.join(", ")));
        }
        parts.join("\n\n")
    }
}

pub struct MetadataFallback {
    http: HttpClient,
    api_key: String,
    timeout: Duration,
}

impl MetadataFallback {
    /// `http` must be rooted at the Data API base (`.../youtube/v3/`).
    pub fn new(http: HttpClient, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            timeout,
        }
    }

    fn opts<'a>(&'a self, query: Vec<(&'a str, Cow<'a, str>)>) -> RequestOpts<'a> {
        RequestOpts {
            timeout: Some(self.timeout),
            auth: Some(Auth::Query {
                name: "key",
                value: Cow::Borrowed(&self.api_key),
            }),
            query: Some(query),
            ..Default::default()
        }
    }

    /// Labels of the caption tracks the Data API lists for the video.
    ///
    /// The API only lists tracks; downloading them needs OAuth. A 403 means
    /// captions are disabled or private and yields an empty list.
    pub async fn caption_tracks(&self, video_id: &VideoId) -> Result<Vec<String>, MetadataError> {
        let query = vec![
            ("videoId", Cow::Borrowed(video_id.as_str())),
            ("part", Cow::Borrowed("snippet")),
        ];
        let resp: CaptionListResponse = match self.http.get_json("captions", self.opts(query)).await {
            Ok(resp) => resp,
            Err(e) if e.status().map(|s| s.as_u16()) == Some(403) => {
                tracing::warn!(
                    target: "captions.metadata",
                    video_id = %video_id,
                    "captions.metadata.tracks_forbidden"
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(resp.items.iter().map(|item| item.snippet.label()).collect())
    }

    pub async fn snippet(&self, video_id: &VideoId) -> Result<Snippet, MetadataError> {
        let query = vec![
            ("id", Cow::Borrowed(video_id.as_str())),
            ("part", Cow::Borrowed("snippet")),
        ];
        let resp: VideoListResponse = self.http.get_json("videos", self.opts(query)).await?;
        resp.items
            .into_iter()
            .next()
            .map(|item| item.snippet)
            .ok_or_else(|| MetadataError::NotFound(video_id.to_string()))
    }

    /// Rendered snippet text, held to the same minimum length as captions.
    pub async fn text(&self, video_id: &VideoId, min_chars: usize) -> Result<String, MetadataError> {
        match self.caption_tracks(video_id).await {
            Ok(tracks) => tracing::debug!(
                target: "captions.metadata",
                video_id = %video_id,
                count = tracks.len(),
                tracks = ?tracks,
                "captions.metadata.tracks"
            ),
            Err(e) => tracing::warn!(
                target: "captions.metadata",
                video_id = %video_id,
                error = %e,
                "captions.metadata.tracks_failed"
            ),
        }

        let snippet = self.snippet(video_id).await?;
        let text = snippet.render();
        let chars = text.chars().count();
        tracing::info!(
            target: "captions.metadata",
            video_id = %video_id,
            description_len = snippet.description.len(),
            tags = snippet.tags.len(),
            chars,
            "captions.metadata.snippet"
        );
        if chars < min_chars {
            return Err(MetadataError::TooShort {
                chars,
                min: min_chars,
            });
        }
        Ok(text)
    }
}
