//! Decoders for the two caption payload shapes.
//!
//! Both produce a single line of text: per-unit whitespace is collapsed, empty
//! units are dropped and the rest are joined with one space.
use crate::types::{CaptionFormat, RawPayload};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid segment json: {0}")]
    SegmentJson(String),
    #[error("invalid timed-text xml: {0}")]
    TimedXml(String),
}

#[derive(Debug, Deserialize)]
struct SegmentDocument {
    events: Vec<SegmentEvent>,
}

#[derive(Debug, Deserialize)]
struct SegmentEvent {
    #[serde(default)]
    segs: Option<Vec<Segment>>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    utf8: String,
}

/// Decode a payload according to the format it was requested in.
pub fn decode(payload: &RawPayload) -> Result<String, ParseError> {
    match payload.format {
        CaptionFormat::SegmentJson => decode_segment_json(&payload.body),
        CaptionFormat::TimedXml => {
            let xml = std::str::from_utf8(&payload.body)
                .map_err(|e| ParseError::TimedXml(e.to_string()))?;
            decode_timed_xml(xml)
        }
    }
}

/// `{"events":[{"segs":[{"utf8":"Hello "}]},{"segs":[{"utf8":"world."}]},{}]}` → `Hello world.`
pub fn decode_segment_json(body: &[u8]) -> Result<String, ParseError> {
    let doc: SegmentDocument =
        serde_json::from_slice(body).map_err(|e| ParseError::SegmentJson(e.to_string()))?;

    let pieces = doc.events.into_iter().filter_map(|event| {
        let segs = event.segs?;
        let joined: String = segs.iter().map(|s| s.utf8.as_str()).collect();
        Some(collapse_whitespace(&joined))
    });
    Ok(join_non_empty(pieces))
}

/// Concatenate `<text>` (srv1) or `<p>` (srv3 / TTML) nodes in document order.
pub fn decode_timed_xml(xml: &str) -> Result<String, ParseError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| ParseError::TimedXml(e.to_string()))?;

    let pieces = doc
        .descendants()
        .filter(|n| n.is_element() && matches!(n.tag_name().name(), "text" | "p"))
        .map(|node| {
            let raw: String = node
                .descendants()
                .filter(|d| d.is_text())
                .filter_map(|d| d.text())
                .collect();
            collapse_whitespace(&decode_html_entities(&raw))
        });
    Ok(join_non_empty(pieces))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_non_empty(pieces: impl Iterator<Item = String>) -> String {
    pieces
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

static ENTITY_RE: OnceLock<Regex> = OnceLock::new();

/// One pass of HTML entity decoding over text the XML parser already unescaped.
///
/// Timed-text XML escapes caption text twice (`&amp;#39;`), so after the XML layer
/// we still see `&#39;`. Unknown names are kept verbatim and the pass is not
/// repeated, so a literal `&amp;amp;` in a caption becomes `&amp;`, not `&`.
pub fn decode_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let re = ENTITY_RE.get_or_init(|| {
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});")
            .expect("static entity pattern")
    });
    re.replace_all(text, |caps: &Captures<'_>| {
        let body = &caps[1];
        let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = body.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            named_entity(body)
        };
        // Control code points other than whitespace never reach the transcript.
        match decoded.filter(|c| !c.is_control() || c.is_whitespace()) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => return None,
    })
}
