use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, OutputFormat};
use factlens_common::observability::{LogConfig, init_logging};
use factlens_config::{FactlensConfig, FactlensConfigLoader};
use factlens_runtime::FactlensRuntime;
use std::process::ExitCode;
use std::time::Duration;

mod cli;
mod output;
mod wiring;

const DEFAULT_CONFIG_FILE: &str = "factlens.yaml";

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("factlens: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    // 1) Load config (env wins)
    let loader = FactlensConfigLoader::new();
    let loader = match &args.config {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let cfg: FactlensConfig = loader.load().context("loading configuration")?;

    // 2) Logging from the `logging` section
    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;
    tracing::info!(
        log_path = %log_path.display(),
        url = %args.url,
        format = ?args.format,
        "factlens.start"
    );

    // 3) Resolve on a single-threaded runtime; Ctrl-C cancels the cascade
    let runtime = FactlensRuntime::build("factlens")?;
    let handle = runtime.handle();
    let cancel = handle.cancellation();
    let outcome = runtime.block_on(async {
        let _ctrl_c = handle.cancel_on_ctrl_c();
        let resolver = wiring::build_from_config(&cfg, &args)?;
        anyhow::Ok(resolver.resolve(&args.url, &cancel).await)
    })?;
    runtime.shutdown(Duration::from_millis(250));

    match outcome {
        Ok(transcript) => {
            tracing::info!(
                video_id = %transcript.video_id,
                chars = transcript.text.chars().count(),
                source = ?transcript.source,
                "factlens.done"
            );
            println!("{}", output::render_transcript(&transcript, args.format)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::warn!(
                url = %args.url,
                error = %err,
                availability = ?err.availability(),
                "factlens.failed"
            );
            let rendered = output::render_error(&err, &args.url, args.format)?;
            match args.format {
                OutputFormat::Json => println!("{rendered}"),
                OutputFormat::Text => eprintln!("{rendered}"),
            }
            Ok(output::exit_code(&err))
        }
    }
}
