//! Sources of the player-response snapshot that advertises caption tracks.
//!
//! A snapshot is read-only and may be absent; every source swallows its own
//! failures and reports "absent" so the cascade can fall back to endpoint probing.
use crate::VideoId;
use async_trait::async_trait;
use factlens_http::{HttpClient, RequestOpts};
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;
use url::Url;

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

#[async_trait]
pub trait PlayerSnapshotSource: Send + Sync {
    /// The player response for `video_id`, or `None` when unavailable.
    async fn player_response(&self, video_id: &VideoId) -> Option<Value>;
}

/// A source that never has a snapshot.
pub struct NoSnapshot;

#[async_trait]
impl PlayerSnapshotSource for NoSnapshot {
    async fn player_response(&self, _video_id: &VideoId) -> Option<Value> {
        None
    }
}

/// A player response captured elsewhere (a dumped page, a test fixture).
pub struct StaticSnapshot {
    response: Value,
}

impl StaticSnapshot {
    pub fn new(response: Value) -> Self {
        Self { response }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }
}

#[async_trait]
impl PlayerSnapshotSource for StaticSnapshot {
    async fn player_response(&self, video_id: &VideoId) -> Option<Value> {
        for_video(self.response.clone(), video_id)
    }
}

/// Drop a snapshot whose `videoDetails.videoId` names a different video.
fn for_video(response: Value, video_id: &VideoId) -> Option<Value> {
    // Pages navigated in place can keep a stale snapshot from the previous video.
    let snapshot_id = response
        .pointer("/videoDetails/videoId")
        .and_then(Value::as_str);
    if let Some(other) = snapshot_id {
        if other != video_id.as_str() {
            tracing::warn!(
                target: "captions.snapshot",
                video_id = %video_id,
                snapshot_video_id = other,
                "captions.snapshot.mismatch"
            );
            return None;
        }
    }
    Some(response)
}

/// Fetches the public watch page and lifts `ytInitialPlayerResponse` out of it.
pub struct WatchPageSnapshot {
    http: HttpClient,
    watch_url: Url,
    timeout: Duration,
}

impl WatchPageSnapshot {
    pub fn new(http: HttpClient, watch_url: Url, timeout: Duration) -> Self {
        Self {
            http,
            watch_url,
            timeout,
        }
    }
}

#[async_trait]
impl PlayerSnapshotSource for WatchPageSnapshot {
    async fn player_response(&self, video_id: &VideoId) -> Option<Value> {
        let html = match self
            .http
            .get_text(
                self.watch_url.as_str(),
                RequestOpts {
                    allow_absolute: true,
                    retries: Some(0),
                    timeout: Some(self.timeout),
                    query: Some(vec![
                        ("v", Cow::Borrowed(video_id.as_str())),
                        ("hl", Cow::Borrowed("en")),
                    ]),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(
                    target: "captions.snapshot",
                    video_id = %video_id,
                    error = %e,
                    "captions.snapshot.watch_page_failed"
                );
                return None;
            }
        };

        let found = extract_player_response(&html);
        tracing::debug!(
            target: "captions.snapshot",
            video_id = %video_id,
            html_len = html.len(),
            found = found.is_some(),
            "captions.snapshot.watch_page"
        );
        found.and_then(|v| for_video(v, video_id))
    }
}

/// Find the first `ytInitialPlayerResponse = {...}` assignment that parses as JSON.
pub fn extract_player_response(html: &str) -> Option<Value> {
    let mut rest = html;
    while let Some(pos) = rest.find(PLAYER_RESPONSE_MARKER) {
        let after = &rest[pos + PLAYER_RESPONSE_MARKER.len()..];
        if let Some(value) = parse_assigned_object(after) {
            return Some(value);
        }
        rest = after;
    }
    None
}

/// Accepts `marker = {` and `marker"] = {` (bracket access); anything else
/// between the marker and `=` means this occurrence is not the assignment.
fn parse_assigned_object(after_marker: &str) -> Option<Value> {
    let rest = after_marker.trim_start();
    let rest = rest
        .strip_prefix("\"]")
        .or_else(|| rest.strip_prefix("']"))
        .unwrap_or(rest);
    let candidate = rest.trim_start().strip_prefix('=')?.trim_start();
    if !candidate.starts_with('{') {
        return None;
    }
    // The deserializer stops after the first complete value, ignoring the trailing script.
    serde_json::Deserializer::from_str(candidate)
        .into_iter::<Value>()
        .next()?
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vid() -> VideoId {
        VideoId::from_url("https://youtu.be/dQw4w9WgXcQ").unwrap()
    }

    #[test]
    fn extracts_player_response_from_script() {
        let html = r#"<html><script>var ytInitialPlayerResponse = {"videoDetails":{"videoId":"dQw4w9WgXcQ"},"captions":{}};var meta = document.querySelector('meta');</script></html>"#;
        let v = extract_player_response(html).unwrap();
        assert_eq!(v["videoDetails"]["videoId"], "dQw4w9WgXcQ");
    }

    #[test]
    fn skips_non_object_assignments() {
        let html = r#"window["ytInitialPlayerResponse"] = null; ytInitialPlayerResponse = {"ok":true};"#;
        let v = extract_player_response(html).unwrap();
        assert_eq!(v["ok"], true);
    }

    #[test]
    fn mentions_before_the_assignment_do_not_capture_other_objects() {
        let html = r#"<script>if (window.ytInitialPlayerResponse) { ytcsi.tick("pr"); } var ytInitialData = {"contents":{"twoColumnWatchNextResults":{}}};</script><script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{}}};</script>"#;
        let v = extract_player_response(html).unwrap();
        assert!(v.get("captions").is_some());
        assert!(v.get("contents").is_none());

        let bracketed = r#"window['ytInitialPlayerResponse'] = {"ok":1};"#;
        assert_eq!(extract_player_response(bracketed).unwrap()["ok"], 1);

        let compared = r#"if (ytInitialPlayerResponse == null) {} var other = {"x":1};"#;
        assert!(extract_player_response(compared).is_none());
    }

    #[test]
    fn malformed_page_has_no_snapshot() {
        assert!(extract_player_response("<html>nothing here</html>").is_none());
        assert!(extract_player_response("ytInitialPlayerResponse = {broken").is_none());
    }

    #[tokio::test]
    async fn static_snapshot_rejects_other_videos() {
        let snap = StaticSnapshot::new(json!({"videoDetails": {"videoId": "aaaaaaaaaaa"}}));
        assert!(snap.player_response(&vid()).await.is_none());

        let snap = StaticSnapshot::new(json!({"captions": {}}));
        assert!(snap.player_response(&vid()).await.is_some());
    }

    #[tokio::test]
    async fn no_snapshot_is_always_absent() {
        assert!(NoSnapshot.player_response(&vid()).await.is_none());
    }
}
