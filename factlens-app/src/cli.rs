use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "factlens", author, version, about = "Fetch a normalised YouTube transcript", long_about = None)]
pub struct Args {
    /// YouTube video URL (watch, youtu.be, shorts, embed or live)
    pub url: String,

    /// YAML config file; defaults to ./factlens.yaml when present
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Player response JSON (or a saved watch page) to locate caption tracks from
    #[arg(long, value_name = "FILE")]
    pub player_json: Option<PathBuf>,

    /// Do not fetch the watch page; go straight to endpoint probing
    #[arg(long)]
    pub no_watch_page: bool,

    /// Output encoding
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Per-request timeout, overrides captions.attempt_timeout_secs
    #[arg(long, value_name = "N")]
    pub attempt_timeout_secs: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
