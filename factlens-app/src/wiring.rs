use crate::cli::Args;
use anyhow::{Context, Result};
use factlens_captions::snapshot::extract_player_response;
use factlens_captions::{
    CaptionFetcher, CaptionKind, MetadataFallback, NoSnapshot, PlayerSnapshotSource, ProbeEntry,
    ProbeMatrix, StaticSnapshot, TranscriptNormalizer, TranscriptResolver, WatchPageSnapshot,
};
use factlens_config::{CaptionsConfig, FactlensConfig, ProbeKind};
use factlens_http::HttpClient;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Assemble a resolver from merged config plus CLI overrides.
pub fn build_from_config(cfg: &FactlensConfig, args: &Args) -> Result<TranscriptResolver> {
    let timeout = attempt_timeout(&cfg.captions, args.attempt_timeout_secs);
    let http = HttpClient::new(&cfg.captions.timedtext_endpoint)
        .context("building caption http client")?
        .with_timeout(timeout);
    let endpoint = Url::parse(&cfg.captions.timedtext_endpoint)
        .with_context(|| format!("invalid timedtext_endpoint {}", cfg.captions.timedtext_endpoint))?;

    let fetcher = CaptionFetcher::new(
        Arc::new(http.clone()),
        endpoint,
        probe_matrix(&cfg.captions),
        timeout,
    );

    let (snapshot, snapshot_kind) = snapshot_source(cfg, args, http, timeout)?;
    let mut resolver = TranscriptResolver::new(fetcher, snapshot)
        .with_normalizer(TranscriptNormalizer::new(cfg.captions.min_transcript_chars));

    let metadata = match cfg.metadata.resolved_api_key() {
        Some(key) => {
            let http = HttpClient::new(&cfg.metadata.endpoint)
                .with_context(|| format!("invalid metadata endpoint {}", cfg.metadata.endpoint))?;
            resolver = resolver.with_metadata(MetadataFallback::new(http, key, timeout));
            true
        }
        None => false,
    };

    tracing::info!(
        target: "factlens.wiring",
        timeout_ms = timeout.as_millis() as u64,
        min_chars = cfg.captions.min_transcript_chars,
        snapshot = snapshot_kind,
        metadata_fallback = metadata,
        "factlens.wiring.resolver"
    );
    Ok(resolver)
}

fn attempt_timeout(captions: &CaptionsConfig, cli_override: Option<u64>) -> Duration {
    Duration::from_secs(cli_override.unwrap_or(captions.attempt_timeout_secs).max(1))
}

fn probe_matrix(captions: &CaptionsConfig) -> ProbeMatrix {
    match &captions.probe_matrix {
        Some(specs) => ProbeMatrix::new(
            specs
                .iter()
                .map(|s| {
                    let kind = match s.kind {
                        ProbeKind::Manual => CaptionKind::Manual,
                        ProbeKind::Auto => CaptionKind::AutoGenerated,
                    };
                    ProbeEntry::new(s.language.trim(), kind)
                })
                .collect(),
        ),
        None => ProbeMatrix::default(),
    }
}

fn snapshot_source(
    cfg: &FactlensConfig,
    args: &Args,
    http: HttpClient,
    timeout: Duration,
) -> Result<(Arc<dyn PlayerSnapshotSource>, &'static str)> {
    if let Some(path) = &args.player_json {
        return Ok((Arc::new(load_static_snapshot(path)?), "file"));
    }
    if cfg.captions.use_watch_page && !args.no_watch_page {
        let watch_url = Url::parse(&cfg.captions.watch_page_url)
            .with_context(|| format!("invalid watch_page_url {}", cfg.captions.watch_page_url))?;
        return Ok((
            Arc::new(WatchPageSnapshot::new(http, watch_url, timeout)),
            "watch_page",
        ));
    }
    Ok((Arc::new(NoSnapshot), "none"))
}

/// Accepts a bare player response or a saved watch page containing one.
fn load_static_snapshot(path: &Path) -> Result<StaticSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading player snapshot {}", path.display()))?;
    if let Ok(snapshot) = StaticSnapshot::from_json_str(&raw) {
        return Ok(snapshot);
    }
    let response = extract_player_response(&raw).with_context(|| {
        format!(
            "{} is neither player response JSON nor a page containing one",
            path.display()
        )
    })?;
    Ok(StaticSnapshot::new(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use factlens_config::FactlensConfigLoader;
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["factlens"];
        argv.extend_from_slice(extra);
        argv.push("https://youtu.be/dQw4w9WgXcQ");
        Args::try_parse_from(argv).unwrap()
    }

    fn config(yaml: &str) -> FactlensConfig {
        FactlensConfigLoader::new().with_yaml_str(yaml).load().unwrap()
    }

    #[test]
    fn configured_probe_matrix_replaces_default() {
        let cfg = config(
            r#"
captions:
  probe_matrix:
    - { language: "de", kind: "asr" }
    - { language: " en ", kind: "manual" }
"#,
        );
        let matrix = probe_matrix(&cfg.captions);
        assert_eq!(
            matrix.entries(),
            &[
                ProbeEntry::new("de", CaptionKind::AutoGenerated),
                ProbeEntry::new("en", CaptionKind::Manual),
            ]
        );
        assert_eq!(probe_matrix(&FactlensConfig::default().captions), ProbeMatrix::default());
    }

    #[test]
    fn cli_timeout_overrides_config_and_is_never_zero() {
        let cfg = FactlensConfig::default();
        assert_eq!(attempt_timeout(&cfg.captions, None), Duration::from_secs(8));
        assert_eq!(attempt_timeout(&cfg.captions, Some(3)), Duration::from_secs(3));
        assert_eq!(attempt_timeout(&cfg.captions, Some(0)), Duration::from_secs(1));
    }

    #[test]
    fn snapshot_source_follows_flags() {
        let http = HttpClient::new("https://www.youtube.com/").unwrap();
        let t = Duration::from_secs(1);

        let cfg = FactlensConfig::default();
        let (_, kind) = snapshot_source(&cfg, &args(&[]), http.clone(), t).unwrap();
        assert_eq!(kind, "watch_page");
        let (_, kind) = snapshot_source(&cfg, &args(&["--no-watch-page"]), http.clone(), t).unwrap();
        assert_eq!(kind, "none");

        let cfg = config("captions:\n  use_watch_page: false\n");
        let (_, kind) = snapshot_source(&cfg, &args(&[]), http, t).unwrap();
        assert_eq!(kind, "none");
    }

    #[test]
    fn player_snapshot_loads_from_json_or_html() {
        let mut json = tempfile::NamedTempFile::new().unwrap();
        write!(json, r#"{{"captions":{{}}}}"#).unwrap();
        assert!(load_static_snapshot(json.path()).is_ok());

        let mut html = tempfile::NamedTempFile::new().unwrap();
        write!(
            html,
            r#"<script>var ytInitialPlayerResponse = {{"captions":{{}}}};</script>"#
        )
        .unwrap();
        assert!(load_static_snapshot(html.path()).is_ok());

        let mut junk = tempfile::NamedTempFile::new().unwrap();
        write!(junk, "<html></html>").unwrap();
        assert!(load_static_snapshot(junk.path()).is_err());
    }

    #[test]
    fn bad_endpoint_is_reported() {
        let cfg = config("captions:\n  timedtext_endpoint: \"not a url\"\n");
        let err = build_from_config(&cfg, &args(&[])).err().unwrap();
        assert!(format!("{err:#}").contains("caption http client"));
    }
}
