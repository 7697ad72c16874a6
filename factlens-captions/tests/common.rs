#![allow(dead_code)]

use std::sync::OnceLock;

use factlens_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "factlens-tests",
            log_dir: Some(std::env::temp_dir().join("factlens-tests")),
            emit_stderr: true,
            format: if std::env::var("FACTLENS_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
        };

        factlens_common::observability::init_logging(config).unwrap_or_default()
    });
}

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";
pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

pub const LONG_TEXT: &str =
    "never gonna give you up, never gonna let you down, never gonna run around";

pub fn segment_json(text: &str) -> String {
    serde_json::json!({
        "wireMagic": "pb3",
        "events": [
            {"tStartMs": 0, "dDurationMs": 1000, "segs": [{"utf8": text}]},
            {"tStartMs": 1000, "aAppend": 1, "segs": [{"utf8": "\n"}]}
        ]
    })
    .to_string()
}

pub fn timed_xml(text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="2.5">{text}</text></transcript>"#
    )
}

/// Player response advertising the given `(languageCode, kind, baseUrl)` tracks.
pub fn player_response(tracks: &[(&str, Option<&str>, String)]) -> serde_json::Value {
    let tracks: Vec<_> = tracks
        .iter()
        .map(|(lang, kind, url)| {
            let mut t = serde_json::json!({"baseUrl": url, "languageCode": lang});
            if let Some(kind) = kind {
                t["kind"] = serde_json::json!(kind);
            }
            t
        })
        .collect();
    serde_json::json!({
        "videoDetails": {"videoId": VIDEO_ID},
        "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": tracks}}
    })
}
