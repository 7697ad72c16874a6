//! Picks the caption track to try first from the player snapshot.
use crate::types::{CaptionKind, CaptionTrackDescriptor};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

const ENGLISH: &str = "en";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: Option<String>,
    language_code: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

/// Read `captions.playerCaptionsTracklistRenderer.captionTracks` from a player response.
///
/// Absent or malformed structures yield an empty list; individual tracks without a
/// usable URL or language are skipped. Order is preserved.
pub fn tracks_from_player_response(response: &Value) -> Vec<CaptionTrackDescriptor> {
    let Some(raw_tracks) = response
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    raw_tracks
        .iter()
        .filter_map(|raw| serde_json::from_value::<RawCaptionTrack>(raw.clone()).ok())
        .filter_map(|raw| {
            let language_code = raw.language_code.filter(|l| !l.trim().is_empty())?;
            let source_url = Url::parse(raw.base_url.as_deref()?).ok()?;
            let kind = match raw.kind.as_deref() {
                Some("asr") => CaptionKind::AutoGenerated,
                _ => CaptionKind::Manual,
            };
            Some(CaptionTrackDescriptor {
                language_code,
                kind,
                source_url,
            })
        })
        .collect()
}

/// Strict preference order, first match wins:
/// English manual, English of any kind, any `en*` variant, then the first track.
pub fn select_preferred(tracks: &[CaptionTrackDescriptor]) -> Option<&CaptionTrackDescriptor> {
    let is_english = |t: &&CaptionTrackDescriptor| t.language_code.eq_ignore_ascii_case(ENGLISH);

    tracks
        .iter()
        .filter(is_english)
        .find(|t| t.kind == CaptionKind::Manual)
        .or_else(|| tracks.iter().find(is_english))
        .or_else(|| {
            tracks
                .iter()
                .find(|t| t.language_code.to_ascii_lowercase().starts_with(ENGLISH))
        })
        .or_else(|| tracks.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track(lang: &str, kind: CaptionKind) -> CaptionTrackDescriptor {
        CaptionTrackDescriptor {
            language_code: lang.to_string(),
            kind,
            source_url: Url::parse(&format!("https://example.com/tt?lang={lang}")).unwrap(),
        }
    }

    #[test]
    fn manual_english_beats_everything() {
        let tracks = vec![
            track("de", CaptionKind::Manual),
            track("en", CaptionKind::AutoGenerated),
            track("en-GB", CaptionKind::Manual),
            track("en", CaptionKind::Manual),
        ];
        let picked = select_preferred(&tracks).unwrap();
        assert_eq!(picked.language_code, "en");
        assert_eq!(picked.kind, CaptionKind::Manual);
    }

    #[test]
    fn auto_english_beats_regional_variant() {
        let tracks = vec![
            track("en-GB", CaptionKind::Manual),
            track("en", CaptionKind::AutoGenerated),
        ];
        let picked = select_preferred(&tracks).unwrap();
        assert_eq!(picked.language_code, "en");
        assert_eq!(picked.kind, CaptionKind::AutoGenerated);
    }

    #[test]
    fn regional_variant_beats_other_languages() {
        let tracks = vec![
            track("fr", CaptionKind::Manual),
            track("en-US", CaptionKind::AutoGenerated),
        ];
        assert_eq!(select_preferred(&tracks).unwrap().language_code, "en-US");
    }

    #[test]
    fn without_english_the_first_track_wins() {
        let tracks = vec![
            track("ja", CaptionKind::AutoGenerated),
            track("fr", CaptionKind::Manual),
            track("de", CaptionKind::Manual),
        ];
        assert_eq!(select_preferred(&tracks).unwrap().language_code, "ja");
    }

    #[test]
    fn empty_collection_finds_nothing() {
        assert!(select_preferred(&[]).is_none());
    }

    #[test]
    fn reads_tracks_from_player_response() {
        let response = json!({
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {"baseUrl": "https://www.youtube.com/api/timedtext?v=x&lang=en&kind=asr",
                         "languageCode": "en", "kind": "asr"},
                        {"baseUrl": "https://www.youtube.com/api/timedtext?v=x&lang=de",
                         "languageCode": "de"},
                        {"languageCode": "fr"},
                        {"baseUrl": "not a url", "languageCode": "es"},
                        "garbage"
                    ]
                }
            }
        });
        let tracks = tracks_from_player_response(&response);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].kind, CaptionKind::AutoGenerated);
        assert_eq!(tracks[1].language_code, "de");
        assert_eq!(tracks[1].kind, CaptionKind::Manual);
    }

    #[test]
    fn missing_caption_structure_is_empty() {
        assert!(tracks_from_player_response(&json!({})).is_empty());
        assert!(tracks_from_player_response(&json!({"captions": "nope"})).is_empty());
        assert!(tracks_from_player_response(&json!(null)).is_empty());
    }
}
