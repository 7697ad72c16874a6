use crate::cli::OutputFormat;
use anyhow::Result;
use factlens_captions::{Availability, Transcript, TranscriptError, TranscriptSource};
use serde::Serialize;
use std::process::ExitCode;

#[derive(Serialize)]
struct TranscriptBody<'a> {
    video_id: &'a str,
    transcript: &'a str,
    length: usize,
    source: &'a TranscriptSource,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    availability: &'static str,
    detail: String,
    video_url: &'a str,
}

pub fn render_transcript(t: &Transcript, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => t.text.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(&TranscriptBody {
            video_id: &t.video_id,
            transcript: &t.text,
            length: t.text.chars().count(),
            source: &t.source,
        })?,
    })
}

pub fn render_error(err: &TranscriptError, url: &str, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format!("{} ({err})", err.user_message()),
        OutputFormat::Json => serde_json::to_string_pretty(&ErrorBody {
            error: err.user_message(),
            availability: availability_label(err.availability()),
            detail: err.to_string(),
            video_url: url,
        })?,
    })
}

fn availability_label(a: Availability) -> &'static str {
    match a {
        Availability::NoCaptions => "no_captions",
        Availability::Unretrievable => "unretrievable",
        Availability::Cancelled => "cancelled",
    }
}

pub fn exit_code(err: &TranscriptError) -> ExitCode {
    ExitCode::from(exit_status(err))
}

fn exit_status(err: &TranscriptError) -> u8 {
    match err.availability() {
        Availability::NoCaptions => 2,
        Availability::Unretrievable => 3,
        Availability::Cancelled => 130,
    }
}
